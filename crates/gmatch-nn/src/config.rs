//! Layer hyperparameters.
//!
//! Both configs are serde-friendly so a model definition can carry the
//! layer widths next to its weights:
//!
//! ```rust,ignore
//! let cfg: ChannelIndependentConfig = serde_json::from_str(
//!     r#"{"in_features": 1024, "out_features": 2048, "in_edges": 1, "out_edges": null}"#,
//! )?;
//! assert_eq!(cfg.out_edges(), 2048);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Widths of a [`Gconv`](crate::conv::Gconv) layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GconvConfig {
    /// Node feature width consumed by `a_fc` and `u_fc`.
    pub in_features: usize,
    /// Node feature width produced.
    pub out_features: usize,
}

impl GconvConfig {
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self {
            in_features,
            out_features,
        }
    }

    /// Reject zero widths.
    pub fn validate(&self) -> Result<()> {
        if self.in_features == 0 || self.out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "Gconv widths must be non-zero (in_features={}, out_features={})",
                self.in_features, self.out_features
            )));
        }
        Ok(())
    }
}

/// Widths of a [`ChannelIndependentConv`](crate::conv::ChannelIndependentConv) layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelIndependentConfig {
    /// Node feature width consumed by `node_fc` and `node_sfc`.
    pub in_features: usize,
    /// Node feature width produced.
    pub out_features: usize,
    /// Edge feature width consumed by `edge_fc`.
    pub in_edges: usize,
    /// Edge feature width produced. `None` means `out_features`.
    #[serde(default)]
    pub out_edges: Option<usize>,
}

impl ChannelIndependentConfig {
    pub fn new(in_features: usize, out_features: usize, in_edges: usize) -> Self {
        Self {
            in_features,
            out_features,
            in_edges,
            out_edges: None,
        }
    }

    pub fn with_out_edges(mut self, out_edges: usize) -> Self {
        self.out_edges = Some(out_edges);
        self
    }

    /// Resolved edge output width.
    pub fn out_edges(&self) -> usize {
        self.out_edges.unwrap_or(self.out_features)
    }

    /// Reject zero widths and edge widths the per-channel aggregation
    /// cannot pair with the node channels.
    ///
    /// Edge channel `c` weights the adjacency used to aggregate node channel
    /// `c`, so `out_edges` has to equal `out_features`. A single edge channel
    /// is also accepted: it broadcasts across every node channel.
    pub fn validate(&self) -> Result<()> {
        let out_edges = self.out_edges();
        if self.in_features == 0 || self.out_features == 0 || self.in_edges == 0 || out_edges == 0
        {
            return Err(Error::InvalidConfig(format!(
                "ChannelIndependentConv widths must be non-zero \
                 (in_features={}, out_features={}, in_edges={}, out_edges={})",
                self.in_features, self.out_features, self.in_edges, out_edges
            )));
        }
        if out_edges != self.out_features && out_edges != 1 {
            return Err(Error::InvalidConfig(format!(
                "out_edges ({}) must equal out_features ({}) or be 1",
                out_edges, self.out_features
            )));
        }
        Ok(())
    }
}
