//! Pipeline collaborator seams.
//!
//! Performance evaluation and retraining-target selection policies.

use crate::core::Result;
use async_trait::async_trait;

/// Computes a scalar performance score for the current system.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate and return a scalar score (higher is better).
    async fn evaluate(&self) -> Result<f32>;
}

/// Chooses which module names to retrain given the latest score.
///
/// The contract is only that the result is a subset of the known names,
/// possibly empty.
pub trait RetrainPolicy: Send + Sync {
    /// Select retraining targets.
    fn select(&self, latest_score: f32, known_names: &[String]) -> Vec<String>;
}

/// Default policy: retrain everything when the score falls below a
/// threshold, nothing otherwise.
#[derive(Clone, Debug)]
pub struct ThresholdPolicy {
    /// Score below which every module is retrained
    pub threshold: f32,
}

impl ThresholdPolicy {
    /// Create a policy with the given threshold.
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl RetrainPolicy for ThresholdPolicy {
    fn select(&self, latest_score: f32, known_names: &[String]) -> Vec<String> {
        if latest_score < self.threshold {
            known_names.to_vec()
        } else {
            Vec::new()
        }
    }
}
