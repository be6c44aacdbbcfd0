//! Graph convolution layers for deep graph matching.
//!
//! `gmatch-nn` provides the embedding layers of a graph-matching network:
//! dense batched graph convolutions that turn an adjacency plus node (and
//! edge) features into new embeddings, and siamese wrappers that apply them
//! to both graphs of a matching problem. Everything runs on `candle` tensors,
//! so the device is whatever the inputs live on.
//!
//! # Modules
//!
//! - [`norm`]: L1 adjacency normalization
//! - [`conv`]: [`Gconv`] and [`ChannelIndependentConv`]
//! - [`siamese`]: shared and twin wrappers over two or more graphs
//! - [`config`]: serde-friendly layer widths
//!
//! # Example: Channel-Independent Embedding
//!
//! ```rust,ignore
//! use gmatch_nn::{ChannelIndependentConfig, ChannelIndependentConv};
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//!
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
//! let conv = ChannelIndependentConv::new(ChannelIndependentConfig::new(64, 32, 8), vb)?;
//!
//! let adj = Tensor::ones((4, 10, 10), DType::F32, &Device::Cpu)?;        // 4 graphs, 10 nodes
//! let nodes = Tensor::randn(0f32, 1., (4, 10, 64), &Device::Cpu)?;
//! let edges = Tensor::randn(0f32, 1., (4, 10, 10, 8), &Device::Cpu)?;
//!
//! let out = conv.forward(&adj, &nodes, &edges, 2)?;
//! // out.node: (4, 10, 32), out.edge: (4, 10, 10, 32), out.distance: Some((4, 10, 10))
//! ```
//!
//! # Example: Shared Weights Across Two Graphs
//!
//! ```rust,ignore
//! use gmatch_nn::{GraphInput, SiameseGconv};
//!
//! let siamese = SiameseGconv::new(64, 32, vb)?;
//! let embs = siamese.forward(&[GraphInput::new(&adj1, &x1), GraphInput::new(&adj2, &x2)])?;
//! ```

pub mod config;
pub mod conv;
pub mod error;
pub mod norm;
pub mod siamese;

pub use config::{ChannelIndependentConfig, GconvConfig};
pub use conv::{
    pairwise_similarity, ChannelIndependentConv, ChannelIndependentOutput, ConvMode, Gconv,
};
pub use error::{Error, Result};
pub use norm::l1norm;
pub use siamese::{
    EdgeGraphInput, GraphInput, SiameseChannelIndependentConv, SiameseEmbeddings, SiameseGconv,
};
