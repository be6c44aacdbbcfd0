//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;

/// A linear layer with pinned values: weight is (out, in), row-major.
pub struct Pinned<'a> {
    pub name: &'a str,
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
    pub in_dim: usize,
}

impl<'a> Pinned<'a> {
    pub fn new(name: &'a str, weight: Vec<f32>, bias: Vec<f32>, in_dim: usize) -> Self {
        Self {
            name,
            weight,
            bias,
            in_dim,
        }
    }

    /// Weights all 1, biases all 0.
    pub fn ones(name: &'a str, in_dim: usize, out_dim: usize) -> Self {
        Self::new(name, vec![1.0; in_dim * out_dim], vec![0.0; out_dim], in_dim)
    }
}

/// VarBuilder serving exactly the given linear layers.
pub fn pinned_vb(layers: &[Pinned<'_>], device: &Device) -> VarBuilder<'static> {
    let mut ts = HashMap::new();
    for layer in layers {
        let out_dim = layer.bias.len();
        let weight = Tensor::from_vec(layer.weight.clone(), (out_dim, layer.in_dim), device).unwrap();
        let bias = Tensor::from_vec(layer.bias.clone(), out_dim, device).unwrap();
        ts.insert(format!("{}.weight", layer.name), weight);
        ts.insert(format!("{}.bias", layer.name), bias);
    }
    VarBuilder::from_tensors(ts, DType::F32, device)
}

pub fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() < 1e-5,
            "index {}: got {}, expected {}",
            i,
            a,
            e
        );
    }
}

pub fn flat(t: &Tensor) -> Vec<f32> {
    t.flatten_all().unwrap().to_vec1::<f32>().unwrap()
}
