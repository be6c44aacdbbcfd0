//! Adjacency normalization.

use candle_core::shape::Dim;
use candle_core::Tensor;

use crate::error::Result;

/// Floor applied to the L1 norm before dividing.
pub const L1_EPS: f64 = 1e-12;

/// L1-normalize `a` along `dim`.
///
/// ```text
/// a / max(sum_dim |a|, eps)
/// ```
///
/// The reduced axis is kept (size 1) and broadcast back, so the output has
/// the shape of `a`. All-zero slices come out as zeros rather than NaN.
///
/// For an adjacency `(batch, N, N)` normalized along `D::Minus2`, every
/// column (the incoming weights of one target node) sums to 1.
pub fn l1norm(a: &Tensor, dim: impl Dim) -> Result<Tensor> {
    let norm = a.abs()?.sum_keepdim(dim)?.maximum(L1_EPS)?;
    Ok(a.broadcast_div(&norm)?)
}
