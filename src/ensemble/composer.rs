//! Ensemble composition.
//!
//! Builds an ensemble model from trained modules.

use crate::core::{Error, Result};
use crate::ensemble::model::EnsembleModel;
use crate::module::TrainedModule;
use crate::training::backend::TrainingBackend;
use std::sync::Arc;
use tracing::info;

/// Composes trained modules into an ensemble.
pub struct EnsembleComposer {
    backend: Arc<dyn TrainingBackend>,
}

impl EnsembleComposer {
    /// Create a composer over a training backend.
    pub fn new(backend: Arc<dyn TrainingBackend>) -> Self {
        Self { backend }
    }

    /// Compose an ensemble from ordered members.
    ///
    /// The integration and classifier layers come out freshly
    /// initialized and untrained; fine-tuning them is a separate step
    /// the caller drives through the backend. All members must agree on
    /// hidden width and class count.
    pub fn compose(
        &self,
        members: Vec<(String, Arc<TrainedModule>)>,
    ) -> Result<EnsembleModel> {
        let (_, first) = members
            .first()
            .ok_or_else(|| Error::EmptyInput("no modules to compose".to_string()))?;

        let hidden_width = first.dims.hidden_width;
        let class_count = first.dims.class_count;

        for (name, module) in &members[1..] {
            if module.dims.hidden_width != hidden_width
                || module.dims.class_count != class_count
            {
                return Err(Error::SchemaMismatch(format!(
                    "member {} dims {:?} disagree with first member",
                    name, module.dims
                )));
            }
        }

        info!(members = members.len(), hidden_width, "ensemble composed");
        Ok(EnsembleModel::new(
            members,
            Arc::clone(&self.backend),
            hidden_width,
            class_count,
        ))
    }
}
