//! Error types for gmatch-nn.

use thiserror::Error;

/// gmatch-nn error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Tensor layout incompatible with the call (rank, square adjacency,
    /// batch size or node count disagreeing between inputs).
    #[error("shape mismatch for {what}: expected {expected}, got {got:?}")]
    Shape {
        what: &'static str,
        expected: String,
        got: Vec<usize>,
    },

    /// Feature axis width differs from a transform's declared input width.
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Unsupported forward mode selector.
    #[error("invalid mode {0}: expected 1 or 2")]
    InvalidMode(u32),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A siamese layer was called without any graph.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
}

impl Error {
    /// Whether this error reports incompatible tensor dimensions.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, Error::Shape { .. } | Error::DimensionMismatch { .. })
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
