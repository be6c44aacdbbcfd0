//! Graph convolution layers for graph matching.
//!
//! Two layers, both operating on dense batched graphs:
//! - [`Gconv`]: GCN-style convolution with a self branch (Kipf & Welling, 2017)
//! - [`ChannelIndependentConv`]: channel-independent embedding (Yu et al., 2020)
//!
//! # Tensor Layout
//!
//! | Tensor | Shape |
//! |--------|-------|
//! | adjacency `A` | (batch, N, N) |
//! | node embedding | (batch, N, d) |
//! | edge embedding | (batch, N, N, d_edge) |
//!
//! Entry `A[b, i, j]` is the weight of the ordered pair (i, j); it does not
//! have to be symmetric.

use candle_core::{Tensor, D};
use candle_nn::{linear, Linear, Module, VarBuilder};
use tracing::{debug, trace};

use crate::config::{ChannelIndependentConfig, GconvConfig};
use crate::error::{Error, Result};
use crate::norm::l1norm;

/// (batch, N, N, channel) -> (batch, channel, N, N).
///
/// Applied to the node embedding after inserting a unit axis at 2 it maps
/// (batch, N, 1, channel) -> (batch, channel, N, 1).
const CHANNEL_FIRST: (usize, usize, usize, usize) = (0, 3, 1, 2);

/// (batch, channel, N) -> (batch, N, channel).
const CHANNEL_LAST: (usize, usize, usize) = (0, 2, 1);

/// Graph Convolutional layer with a separate self transform.
///
/// ```text
/// X' = norm(A) · ReLU(X W_a + b_a) + ReLU(X W_u + b_u)
/// ```
///
/// `norm` is column-wise L1 normalization, so the incoming weights of each
/// target node sum to 1.
///
/// # Reference
///
/// Kipf & Welling, "Semi-Supervised Classification with Graph Convolutional
/// Networks", ICLR 2017.
#[derive(Debug, Clone)]
pub struct Gconv {
    a_fc: Linear,
    u_fc: Linear,
    config: GconvConfig,
}

impl Gconv {
    /// Create a new layer.
    ///
    /// # Arguments
    /// - `in_features`: Input node feature width
    /// - `out_features`: Output node feature width
    /// - `vb`: Variable builder, parameters live under `a_fc` and `u_fc`
    pub fn new(in_features: usize, out_features: usize, vb: VarBuilder) -> Result<Self> {
        Self::from_config(GconvConfig::new(in_features, out_features), vb)
    }

    pub fn from_config(config: GconvConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let a_fc = linear(config.in_features, config.out_features, vb.pp("a_fc"))?;
        let u_fc = linear(config.in_features, config.out_features, vb.pp("u_fc"))?;
        debug!(
            in_features = config.in_features,
            out_features = config.out_features,
            "built Gconv"
        );
        Ok(Self { a_fc, u_fc, config })
    }

    pub fn config(&self) -> GconvConfig {
        self.config
    }

    pub fn in_features(&self) -> usize {
        self.config.in_features
    }

    pub fn out_features(&self) -> usize {
        self.config.out_features
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// - `adj`: Connectivity (batch x N x N)
    /// - `x`: Node embedding (batch x N x in_features)
    /// - `norm`: L1-normalize `adj` along its second-to-last axis first
    ///
    /// # Returns
    /// - Node embedding (batch x N x out_features)
    pub fn forward(&self, adj: &Tensor, x: &Tensor, norm: bool) -> Result<Tensor> {
        let (batch, n) = adjacency_dims(adj)?;
        check_node_embedding(x, batch, n, self.config.in_features)?;
        trace!(batch, n, norm, "Gconv forward");

        let adj = if norm {
            l1norm(adj, D::Minus2)?
        } else {
            adj.clone()
        };

        let ax = self.a_fc.forward(x)?.relu()?;
        let ux = self.u_fc.forward(x)?.relu()?;
        Ok((adj.matmul(&ax)? + ux)?)
    }
}

/// Forward mode of [`ChannelIndependentConv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConvMode {
    /// Mode 1: node and edge embeddings.
    #[default]
    Embeddings,
    /// Mode 2: node and edge embeddings plus the pairwise node similarity.
    WithDistance,
}

impl ConvMode {
    pub fn as_u32(self) -> u32 {
        match self {
            ConvMode::Embeddings => 1,
            ConvMode::WithDistance => 2,
        }
    }
}

impl TryFrom<u32> for ConvMode {
    type Error = Error;

    fn try_from(mode: u32) -> Result<Self> {
        match mode {
            1 => Ok(ConvMode::Embeddings),
            2 => Ok(ConvMode::WithDistance),
            other => Err(Error::InvalidMode(other)),
        }
    }
}

/// Result of [`ChannelIndependentConv::forward`].
#[derive(Debug, Clone)]
pub struct ChannelIndependentOutput {
    /// Node embedding (batch x N x out_features).
    pub node: Tensor,
    /// Edge embedding (batch x N x N x out_edges).
    pub edge: Tensor,
    /// Pairwise similarity (batch x N x N), present in mode 2 only.
    pub distance: Option<Tensor>,
}

/// Channel-independent embedding convolution.
///
/// Each output channel `c` aggregates over its own adjacency, weighted by the
/// matching edge channel:
///
/// ```text
/// H_c  = (A ⊙ E'_c) · X'_c          E' = E W_e + b_e,  X' = X W_n + b_n
/// X''  = ReLU(H) + ReLU(X W_s + b_s)
/// E''  = ReLU(E')
/// ```
///
/// With a single edge channel (`out_edges == 1`) every node channel shares
/// `A ⊙ E'_0`.
///
/// Mode 2 additionally returns `exp(-||X'_i - X'_j||²)` for every node pair,
/// computed from the pre-activation node transform. It is a side output and
/// does not enter `X''`.
///
/// # Reference
///
/// Yu et al., "Learning deep graph matching with channel-independent embedding
/// and Hungarian attention", ICLR 2020.
#[derive(Debug, Clone)]
pub struct ChannelIndependentConv {
    node_fc: Linear,
    node_sfc: Linear,
    edge_fc: Linear,
    config: ChannelIndependentConfig,
}

impl ChannelIndependentConv {
    /// Create a new layer.
    ///
    /// `vb` receives parameters under `node_fc`, `node_sfc` and `edge_fc`.
    pub fn new(config: ChannelIndependentConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let out_edges = config.out_edges();
        let node_fc = linear(config.in_features, config.out_features, vb.pp("node_fc"))?;
        let node_sfc = linear(config.in_features, config.out_features, vb.pp("node_sfc"))?;
        let edge_fc = linear(config.in_edges, out_edges, vb.pp("edge_fc"))?;
        debug!(
            in_features = config.in_features,
            out_features = config.out_features,
            in_edges = config.in_edges,
            out_edges,
            "built ChannelIndependentConv"
        );
        Ok(Self {
            node_fc,
            node_sfc,
            edge_fc,
            config,
        })
    }

    pub fn config(&self) -> ChannelIndependentConfig {
        self.config
    }

    pub fn in_features(&self) -> usize {
        self.config.in_features
    }

    pub fn out_features(&self) -> usize {
        self.config.out_features
    }

    pub fn in_edges(&self) -> usize {
        self.config.in_edges
    }

    pub fn out_edges(&self) -> usize {
        self.config.out_edges()
    }

    /// Forward pass selected by an integer mode (1 or 2).
    ///
    /// Any other mode fails with [`Error::InvalidMode`] before touching the
    /// inputs.
    pub fn forward(
        &self,
        adj: &Tensor,
        emb_node: &Tensor,
        emb_edge: &Tensor,
        mode: u32,
    ) -> Result<ChannelIndependentOutput> {
        match ConvMode::try_from(mode)? {
            ConvMode::Embeddings => {
                let (node, edge) = self.forward_embeddings(adj, emb_node, emb_edge)?;
                Ok(ChannelIndependentOutput {
                    node,
                    edge,
                    distance: None,
                })
            }
            ConvMode::WithDistance => {
                let (node, edge, distance) = self.forward_with_distance(adj, emb_node, emb_edge)?;
                Ok(ChannelIndependentOutput {
                    node,
                    edge,
                    distance: Some(distance),
                })
            }
        }
    }

    /// Mode 1.
    ///
    /// # Arguments
    /// - `adj`: Connectivity (batch x N x N)
    /// - `emb_node`: Node embedding (batch x N x in_features)
    /// - `emb_edge`: Edge embedding (batch x N x N x in_edges)
    ///
    /// # Returns
    /// - Node embedding (batch x N x out_features)
    /// - Edge embedding (batch x N x N x out_edges)
    pub fn forward_embeddings(
        &self,
        adj: &Tensor,
        emb_node: &Tensor,
        emb_edge: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        let (node_x, node_sx, edge_x) =
            self.transform(adj, emb_node, emb_edge, ConvMode::Embeddings)?;
        self.aggregate(adj, &node_x, &node_sx, &edge_x)
    }

    /// Mode 2: [`forward_embeddings`](Self::forward_embeddings) plus the
    /// pairwise node similarity (batch x N x N).
    pub fn forward_with_distance(
        &self,
        adj: &Tensor,
        emb_node: &Tensor,
        emb_edge: &Tensor,
    ) -> Result<(Tensor, Tensor, Tensor)> {
        let (node_x, node_sx, edge_x) =
            self.transform(adj, emb_node, emb_edge, ConvMode::WithDistance)?;
        let d_x = pairwise_similarity(&node_x)?;
        let (node, edge) = self.aggregate(adj, &node_x, &node_sx, &edge_x)?;
        Ok((node, edge, d_x))
    }

    /// Validate inputs and apply the three affine maps.
    fn transform(
        &self,
        adj: &Tensor,
        emb_node: &Tensor,
        emb_edge: &Tensor,
        mode: ConvMode,
    ) -> Result<(Tensor, Tensor, Tensor)> {
        let (batch, n) = adjacency_dims(adj)?;
        check_node_embedding(emb_node, batch, n, self.config.in_features)?;
        check_edge_embedding(emb_edge, batch, n, self.config.in_edges)?;
        trace!(batch, n, mode = mode.as_u32(), "ChannelIndependentConv forward");

        let node_x = self.node_fc.forward(emb_node)?;
        let node_sx = self.node_sfc.forward(emb_node)?;
        let edge_x = self.edge_fc.forward(emb_edge)?;
        Ok((node_x, node_sx, edge_x))
    }

    /// Per-channel aggregation shared by both modes.
    fn aggregate(
        &self,
        adj: &Tensor,
        node_x: &Tensor,
        node_sx: &Tensor,
        edge_x: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        // (b, N, N) -> (b, N, N, C): every ordered pair weighted by its edge features
        let weighted = adj.unsqueeze(3)?.broadcast_as(edge_x.dims())?.mul(edge_x)?;
        // (b, N, N, C) -> (b, C, N, N)
        let weighted = weighted.permute(CHANNEL_FIRST)?.contiguous()?;
        // (b, N, F) -> (b, N, 1, F) -> (b, F, N, 1)
        let nodes = node_x.unsqueeze(2)?.permute(CHANNEL_FIRST)?.contiguous()?;

        // (b, C, N, N) x (b, F, N, 1) -> (b, F, N, 1); C is F or 1
        let agg = weighted.broadcast_matmul(&nodes)?;
        // (b, F, N, 1) -> (b, F, N) -> (b, N, F)
        let agg = agg.mean(3)?.permute(CHANNEL_LAST)?;

        let node = (agg.relu()? + node_sx.relu()?)?;
        let edge = edge_x.relu()?;
        Ok((node, edge))
    }
}

/// Pairwise node similarity `exp(-||x_i - x_j||²)`.
///
/// Takes a node embedding (batch x N x d) and returns (batch x N x N). The
/// result is symmetric with ones on the diagonal.
pub fn pairwise_similarity(node_x: &Tensor) -> Result<Tensor> {
    dims::<3>(node_x, "node embedding")?;
    // (b, 1, N, d) - (b, N, 1, d) -> (b, N, N, d)
    let diff = node_x.unsqueeze(1)?.broadcast_sub(&node_x.unsqueeze(2)?)?;
    Ok(diff.sqr()?.sum(3)?.neg()?.exp()?)
}

fn dims<const R: usize>(t: &Tensor, what: &'static str) -> Result<[usize; R]> {
    <[usize; R]>::try_from(t.dims()).map_err(|_| Error::Shape {
        what,
        expected: format!("rank-{} tensor", R),
        got: t.dims().to_vec(),
    })
}

/// Returns (batch, N) of a square batched adjacency.
fn adjacency_dims(adj: &Tensor) -> Result<(usize, usize)> {
    let [batch, n, m] = dims::<3>(adj, "adjacency")?;
    if n != m {
        return Err(Error::Shape {
            what: "adjacency",
            expected: "(batch, N, N)".to_string(),
            got: adj.dims().to_vec(),
        });
    }
    Ok((batch, n))
}

fn check_node_embedding(x: &Tensor, batch: usize, n: usize, width: usize) -> Result<()> {
    let [b, nodes, d] = dims::<3>(x, "node embedding")?;
    if b != batch || nodes != n {
        return Err(Error::Shape {
            what: "node embedding",
            expected: format!("({}, {}, {})", batch, n, width),
            got: x.dims().to_vec(),
        });
    }
    if d != width {
        return Err(Error::DimensionMismatch {
            what: "node embedding",
            expected: width,
            got: d,
        });
    }
    Ok(())
}

fn check_edge_embedding(e: &Tensor, batch: usize, n: usize, width: usize) -> Result<()> {
    let [b, rows, cols, d] = dims::<4>(e, "edge embedding")?;
    if b != batch || rows != n || cols != n {
        return Err(Error::Shape {
            what: "edge embedding",
            expected: format!("({}, {}, {}, {})", batch, n, n, width),
            got: e.dims().to_vec(),
        });
    }
    if d != width {
        return Err(Error::DimensionMismatch {
            what: "edge embedding",
            expected: width,
            got: d,
        });
    }
    Ok(())
}
