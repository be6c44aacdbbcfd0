//! Siamese wrappers for matching two (or more) graphs.
//!
//! - [`SiameseGconv`] runs one shared [`Gconv`] over every graph.
//! - [`SiameseChannelIndependentConv`] holds twin [`ChannelIndependentConv`]
//!   layers with independent parameters, one per side of the match.

use candle_core::Tensor;
use candle_nn::VarBuilder;
use tracing::trace;

use crate::config::{ChannelIndependentConfig, GconvConfig};
use crate::conv::{ChannelIndependentConv, Gconv};
use crate::error::{Error, Result};

/// One graph fed to a [`Gconv`].
#[derive(Debug, Clone, Copy)]
pub struct GraphInput<'a> {
    /// Connectivity (batch x N x N).
    pub adj: &'a Tensor,
    /// Node embedding (batch x N x in_features).
    pub x: &'a Tensor,
    /// L1-normalize `adj` before aggregating.
    pub norm: bool,
}

impl<'a> GraphInput<'a> {
    /// Graph with normalization enabled.
    pub fn new(adj: &'a Tensor, x: &'a Tensor) -> Self {
        Self { adj, x, norm: true }
    }

    pub fn with_norm(mut self, norm: bool) -> Self {
        self.norm = norm;
        self
    }
}

/// Shared-weight [`Gconv`] over any number of graphs.
#[derive(Debug, Clone)]
pub struct SiameseGconv {
    gconv: Gconv,
}

impl SiameseGconv {
    /// Parameters live under `gconv`.
    pub fn new(in_features: usize, num_features: usize, vb: VarBuilder) -> Result<Self> {
        Self::from_config(GconvConfig::new(in_features, num_features), vb)
    }

    pub fn from_config(config: GconvConfig, vb: VarBuilder) -> Result<Self> {
        let gconv = Gconv::from_config(config, vb.pp("gconv"))?;
        Ok(Self { gconv })
    }

    pub fn gconv(&self) -> &Gconv {
        &self.gconv
    }

    /// Embed a single graph.
    pub fn forward_single(&self, graph: &GraphInput<'_>) -> Result<Tensor> {
        self.gconv.forward(graph.adj, graph.x, graph.norm)
    }

    /// Embed every graph with the same parameters.
    ///
    /// Outputs are in input order, each (batch x N x num_features).
    pub fn forward(&self, graphs: &[GraphInput<'_>]) -> Result<Vec<Tensor>> {
        if graphs.is_empty() {
            return Err(Error::EmptyInput("SiameseGconv needs at least one graph"));
        }
        trace!(graphs = graphs.len(), "SiameseGconv forward");
        graphs.iter().map(|g| self.forward_single(g)).collect()
    }
}

/// One graph fed to a [`ChannelIndependentConv`].
#[derive(Debug, Clone, Copy)]
pub struct EdgeGraphInput<'a> {
    /// Connectivity (batch x N x N).
    pub adj: &'a Tensor,
    /// Node embedding (batch x N x in_features).
    pub emb_node: &'a Tensor,
    /// Edge embedding (batch x N x N x in_edges).
    pub emb_edge: &'a Tensor,
}

impl<'a> EdgeGraphInput<'a> {
    pub fn new(adj: &'a Tensor, emb_node: &'a Tensor, emb_edge: &'a Tensor) -> Self {
        Self {
            adj,
            emb_node,
            emb_edge,
        }
    }
}

/// Output of [`SiameseChannelIndependentConv::forward`].
#[derive(Debug, Clone)]
pub enum SiameseEmbeddings {
    /// Only the first graph was given.
    Single { node: Tensor, edge: Tensor },
    /// Both graphs.
    Pair {
        node1: Tensor,
        node2: Tensor,
        edge1: Tensor,
        edge2: Tensor,
    },
}

impl SiameseEmbeddings {
    /// Number of tensors carried: 2 or 4.
    pub fn tensor_count(&self) -> usize {
        match self {
            SiameseEmbeddings::Single { .. } => 2,
            SiameseEmbeddings::Pair { .. } => 4,
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, SiameseEmbeddings::Pair { .. })
    }

    /// Node embeddings in graph order.
    pub fn nodes(&self) -> Vec<&Tensor> {
        match self {
            SiameseEmbeddings::Single { node, .. } => vec![node],
            SiameseEmbeddings::Pair { node1, node2, .. } => vec![node1, node2],
        }
    }

    /// Edge embeddings in graph order.
    pub fn edges(&self) -> Vec<&Tensor> {
        match self {
            SiameseEmbeddings::Single { edge, .. } => vec![edge],
            SiameseEmbeddings::Pair { edge1, edge2, .. } => vec![edge1, edge2],
        }
    }
}

/// Twin [`ChannelIndependentConv`] layers with independent parameters.
///
/// `gconv1` always embeds the first graph, `gconv2` the second. Both run in
/// mode 1.
#[derive(Debug, Clone)]
pub struct SiameseChannelIndependentConv {
    gconv1: ChannelIndependentConv,
    gconv2: ChannelIndependentConv,
}

impl SiameseChannelIndependentConv {
    /// Parameters live under `gconv1` and `gconv2`.
    pub fn new(config: ChannelIndependentConfig, vb: VarBuilder) -> Result<Self> {
        let gconv1 = ChannelIndependentConv::new(config, vb.pp("gconv1"))?;
        let gconv2 = ChannelIndependentConv::new(config, vb.pp("gconv2"))?;
        Ok(Self { gconv1, gconv2 })
    }

    pub fn gconv1(&self) -> &ChannelIndependentConv {
        &self.gconv1
    }

    pub fn gconv2(&self) -> &ChannelIndependentConv {
        &self.gconv2
    }

    pub fn forward(
        &self,
        g1: &EdgeGraphInput<'_>,
        g2: Option<&EdgeGraphInput<'_>>,
    ) -> Result<SiameseEmbeddings> {
        trace!(pair = g2.is_some(), "SiameseChannelIndependentConv forward");
        let (node1, edge1) = self
            .gconv1
            .forward_embeddings(g1.adj, g1.emb_node, g1.emb_edge)?;

        let Some(g2) = g2 else {
            return Ok(SiameseEmbeddings::Single {
                node: node1,
                edge: edge1,
            });
        };

        let (node2, edge2) = self
            .gconv2
            .forward_embeddings(g2.adj, g2.emb_node, g2.emb_edge)?;
        Ok(SiameseEmbeddings::Pair {
            node1,
            node2,
            edge1,
            edge2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_siamese_gconv_empty_input() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let siamese = SiameseGconv::new(4, 4, vb).unwrap();

        assert!(matches!(siamese.forward(&[]), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_siamese_gconv_preserves_order() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let siamese = SiameseGconv::new(4, 6, vb).unwrap();

        let adj1 = Tensor::ones((1, 3, 3), DType::F32, &device).unwrap();
        let x1 = Tensor::randn(0f32, 1f32, (1, 3, 4), &device).unwrap();
        let adj2 = Tensor::ones((1, 5, 5), DType::F32, &device).unwrap();
        let x2 = Tensor::randn(0f32, 1f32, (1, 5, 4), &device).unwrap();

        let outs = siamese
            .forward(&[GraphInput::new(&adj1, &x1), GraphInput::new(&adj2, &x2)])
            .unwrap();
        assert_eq!(outs.len(), 2);
        assert_eq!(outs[0].dims(), &[1, 3, 6]);
        assert_eq!(outs[1].dims(), &[1, 5, 6]);
    }

    #[test]
    fn test_siamese_cie_twins_have_separate_parameters() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let _siamese =
            SiameseChannelIndependentConv::new(ChannelIndependentConfig::new(4, 4, 2), vb).unwrap();

        let data = varmap.data().lock().unwrap();
        assert!(data.contains_key("gconv1.node_fc.weight"));
        assert!(data.contains_key("gconv2.node_fc.weight"));
        assert!(data.contains_key("gconv2.edge_fc.bias"));
    }
}
