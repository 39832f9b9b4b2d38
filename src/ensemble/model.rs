//! Ensemble inference model.
//!
//! Combines several trained modules' pooled features into one
//! prediction surface.

use crate::core::{Error, Result, Tensor};
use crate::module::TrainedModule;
use crate::training::backend::TrainingBackend;
use std::sync::Arc;

/// An ensemble over trained modules.
///
/// Members are kept in insertion order so the feature concatenation in
/// `infer` is reproducible across runs. The integration transform maps
/// the concatenated `members x H` vector back to `H`; adding or removing
/// a member requires recomposing the ensemble, the transform is never
/// resized in place.
pub struct EnsembleModel {
    members: Vec<(String, Arc<TrainedModule>)>,
    /// Integration transform, shape `[H, members * H]`
    pub integration_weight: Tensor,
    /// Integration bias, shape `[H]`
    pub integration_bias: Tensor,
    /// Final classifier, shape `[C, H]`
    pub classifier_weight: Tensor,
    /// Classifier bias, shape `[C]`
    pub classifier_bias: Tensor,
    backend: Arc<dyn TrainingBackend>,
    hidden_width: usize,
    class_count: usize,
}

impl EnsembleModel {
    pub(crate) fn new(
        members: Vec<(String, Arc<TrainedModule>)>,
        backend: Arc<dyn TrainingBackend>,
        hidden_width: usize,
        class_count: usize,
    ) -> Self {
        let combined_width = members.len() * hidden_width;
        Self {
            members,
            integration_weight: Tensor::randn(&[hidden_width, combined_width]),
            integration_bias: Tensor::zeros(&[hidden_width]),
            classifier_weight: Tensor::randn(&[class_count, hidden_width]),
            classifier_bias: Tensor::zeros(&[class_count]),
            backend,
            hidden_width,
            class_count,
        }
    }

    /// Member names in iteration order.
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Member count.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the ensemble has no members (never true once composed).
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Run the ensemble forward pass.
    ///
    /// Deterministic given identical parameters and input: pooled member
    /// features in insertion order, concatenation, integration transform,
    /// relu, classifier.
    pub fn infer(&self, encoding: &[f32]) -> Result<Vec<f32>> {
        let mut combined = Vec::with_capacity(self.members.len() * self.hidden_width);
        for (name, module) in &self.members {
            let inference = self.backend.infer(module, encoding)?;
            if inference.pooled.len() != self.hidden_width {
                return Err(Error::SchemaMismatch(format!(
                    "member {} produced {} pooled features, expected {}",
                    name,
                    inference.pooled.len(),
                    self.hidden_width
                )));
            }
            combined.extend(inference.pooled);
        }

        let combined_width = combined.len();
        let mut integrated = vec![0.0; self.hidden_width];
        for h in 0..self.hidden_width {
            let row = &self.integration_weight.data[h * combined_width..(h + 1) * combined_width];
            let sum: f32 = row
                .iter()
                .zip(combined.iter())
                .map(|(w, x)| w * x)
                .sum::<f32>()
                + self.integration_bias.data[h];
            integrated[h] = sum.max(0.0);
        }

        let mut logits = vec![0.0; self.class_count];
        for c in 0..self.class_count {
            let row = &self.classifier_weight.data[c * self.hidden_width..(c + 1) * self.hidden_width];
            logits[c] = row
                .iter()
                .zip(integrated.iter())
                .map(|(w, x)| w * x)
                .sum::<f32>()
                + self.classifier_bias.data[c];
        }

        Ok(logits)
    }
}
