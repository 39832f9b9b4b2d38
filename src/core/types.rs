//! Common types used across lexfed modules.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp wrapper for consistent serialization.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Get current UTC timestamp.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}

/// A named, shaped parameter tensor stored as a flat buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    /// Dimensions (row-major)
    pub shape: Vec<usize>,
    /// Flat parameter values
    pub data: Vec<f32>,
}

impl Tensor {
    /// Create a tensor filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        let len = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![0.0; len],
        }
    }

    /// Create a tensor with scaled uniform random initialization.
    pub fn randn(shape: &[usize]) -> Self {
        use rand::Rng;
        let len: usize = shape.iter().product();
        let mut rng = rand::thread_rng();
        let scale = (2.0 / len.max(1) as f32).sqrt();

        let data: Vec<f32> = (0..len)
            .map(|_| rng.gen::<f32>() * scale - scale / 2.0)
            .collect();

        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// Create from existing values, checking the shape.
    pub fn from_data(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::InvalidParameter(format!(
                "tensor data length {} does not match shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether another tensor has the same shape.
    pub fn same_shape(&self, other: &Tensor) -> bool {
        self.shape == other.shape
    }
}

/// Named parameter tensors with deterministic iteration order.
pub type ParameterMap = BTreeMap<String, Tensor>;

/// Check that two parameter maps share the same names and shapes.
pub fn schemas_match(a: &ParameterMap, b: &ParameterMap) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|((an, at), (bn, bt))| {
            an == bn && at.same_shape(bt)
        })
}
