//! Trained module handle.
//!
//! Opaque parameterized function from encoded text to class logits.

use crate::core::{now, schemas_match, ParameterMap, Timestamp};
use serde::{Deserialize, Serialize};

/// Dimensions of a trained module's parameterization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDims {
    /// Width of the fixed-size input encoding
    pub encoding_width: usize,
    /// Width of the pooled hidden-feature vector
    pub hidden_width: usize,
    /// Number of output classes
    pub class_count: usize,
}

/// A trained module: named parameter tensors plus dimensions.
///
/// Produced by the training backend and owned by the trainer registry.
/// Aggregation produces new values; privacy injection consumes its input
/// and returns the same handle mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainedModule {
    /// Module name
    pub name: String,
    /// Named parameter tensors
    pub parameters: ParameterMap,
    /// Parameterization dimensions
    pub dims: ModuleDims,
    /// Version, bumped on each retraining or update
    pub version: u32,
    /// When training completed
    pub trained_at: Timestamp,
}

impl TrainedModule {
    /// Create a new trained module at version 1.
    pub fn new(name: &str, parameters: ParameterMap, dims: ModuleDims) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            dims,
            version: 1,
            trained_at: now(),
        }
    }

    /// Whether another module shares this module's parameter schema.
    ///
    /// Same tensor names, same shapes, same dimensions.
    pub fn schema_matches(&self, other: &TrainedModule) -> bool {
        self.dims == other.dims && schemas_match(&self.parameters, &other.parameters)
    }

    /// Total parameter count across all tensors.
    pub fn param_count(&self) -> usize {
        self.parameters.values().map(|t| t.len()).sum()
    }
}
