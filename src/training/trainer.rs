//! Modular training orchestrator.
//!
//! Owns the module config set and the trained-module registry, and
//! drives the backend per module with concurrent fan-out.

use crate::core::{now, Error, Result, Timestamp};
use crate::data::{DatasetProvider, Encoder};
use crate::federated::FederatedAggregator;
use crate::module::{ModuleConfig, TrainedModule};
use crate::training::backend::{EncodedRecord, TrainingBackend};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{error, info};
use uuid::Uuid;

/// An isolated per-module training failure.
#[derive(Clone, Debug)]
pub struct TrainingFailure {
    /// Module name that failed
    pub name: String,
    /// Run identifier
    pub run_id: Uuid,
    /// Failure description
    pub reason: String,
    /// When the failure was recorded
    pub timestamp: Timestamp,
}

/// Outcome of a training fan-out: successes plus isolated failures.
#[derive(Clone, Debug, Default)]
pub struct TrainingReport {
    /// Successfully trained modules by name
    pub trained: HashMap<String, Arc<TrainedModule>>,
    /// Per-module failures, in completion order
    pub failures: Vec<TrainingFailure>,
}

impl TrainingReport {
    /// Whether every requested module trained successfully.
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Multi-module training orchestrator.
///
/// The registry holds one slot per module name, replaced atomically on
/// each completed training. Trainings for distinct names may run
/// concurrently; callers must not launch two in-flight trainings for the
/// same name.
pub struct ModularTrainer {
    configs: RwLock<HashMap<String, ModuleConfig>>,
    registry: RwLock<HashMap<String, Arc<TrainedModule>>>,
    datasets: Arc<dyn DatasetProvider>,
    encoder: Arc<dyn Encoder>,
    backend: Arc<dyn TrainingBackend>,
}

impl ModularTrainer {
    /// Create a trainer over the given collaborators.
    pub fn new(
        datasets: Arc<dyn DatasetProvider>,
        encoder: Arc<dyn Encoder>,
        backend: Arc<dyn TrainingBackend>,
    ) -> Self {
        Self {
            configs: RwLock::new(HashMap::new()),
            registry: RwLock::new(HashMap::new()),
            datasets,
            encoder,
            backend,
        }
    }

    /// Register a module config.
    ///
    /// Fails with `DuplicateName` if the name is already registered.
    pub fn register(&self, config: ModuleConfig) -> Result<()> {
        config.validate()?;
        let mut configs = self
            .configs
            .write()
            .map_err(|_| Error::Internal("config lock poisoned".to_string()))?;
        if configs.contains_key(&config.name) {
            return Err(Error::DuplicateName(config.name));
        }
        configs.insert(config.name.clone(), config);
        Ok(())
    }

    /// Look up a registered config by name.
    pub fn config(&self, name: &str) -> Option<ModuleConfig> {
        self.configs.read().ok()?.get(name).cloned()
    }

    /// Names of all registered configs.
    pub fn registered_names(&self) -> Vec<String> {
        self.configs
            .read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Look up a trained module by name.
    pub fn module(&self, name: &str) -> Option<Arc<TrainedModule>> {
        self.registry.read().ok()?.get(name).cloned()
    }

    /// Snapshot of all trained modules.
    pub fn trained_modules(&self) -> HashMap<String, Arc<TrainedModule>> {
        self.registry
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Train one module: load corpus, encode, delegate to the backend,
    /// then atomically replace the registry slot for the name.
    pub async fn train(&self, config: &ModuleConfig) -> Result<Arc<TrainedModule>> {
        config.validate()?;
        let run_id = Uuid::new_v4();
        info!(module = %config.name, run = %run_id, "training module");

        let corpus = self.datasets.load(&config.dataset_refs).await?;
        let encoded: Vec<EncodedRecord> = corpus
            .records
            .iter()
            .map(|record| EncodedRecord {
                encoding: self
                    .encoder
                    .encode(&record.text, config.max_sequence_length),
                label: record.label,
            })
            .collect();

        let mut module = self.backend.fit(config, &encoded).await?;

        let handle = {
            let mut registry = self
                .registry
                .write()
                .map_err(|_| Error::Internal("registry lock poisoned".to_string()))?;
            if let Some(prior) = registry.get(&config.name) {
                module.version = prior.version + 1;
            }
            let handle = Arc::new(module);
            registry.insert(config.name.clone(), Arc::clone(&handle));
            handle
        };

        info!(
            module = %config.name,
            run = %run_id,
            version = handle.version,
            params = handle.param_count(),
            "training complete"
        );
        Ok(handle)
    }

    /// Fan out training over the given configs concurrently.
    ///
    /// A failure in one module is recorded and isolated; siblings keep
    /// running. The report maps successfully trained names to modules and
    /// lists the failures.
    pub async fn train_all(&self, configs: &[ModuleConfig]) -> TrainingReport {
        let tasks = configs.iter().map(|config| async move {
            let outcome = self.train(config).await;
            (config.name.clone(), outcome)
        });

        let mut report = TrainingReport::default();
        for (name, outcome) in futures::future::join_all(tasks).await {
            match outcome {
                Ok(module) => {
                    report.trained.insert(name, module);
                }
                Err(err) => {
                    error!(module = %name, error = %err, "module training failed");
                    report.failures.push(TrainingFailure {
                        name,
                        run_id: Uuid::new_v4(),
                        reason: err.to_string(),
                        timestamp: now(),
                    });
                }
            }
        }
        report
    }

    /// One federated round: train every config, average the survivors,
    /// then inject privacy noise calibrated by `epsilon`.
    pub async fn federated_round(
        &self,
        configs: &[ModuleConfig],
        epsilon: f32,
    ) -> Result<TrainedModule> {
        let report = self.train_all(configs).await;
        let modules: Vec<Arc<TrainedModule>> = configs
            .iter()
            .filter_map(|c| report.trained.get(&c.name).cloned())
            .collect();

        let aggregator = FederatedAggregator::new();
        let global = aggregator.average(&modules)?;
        aggregator.apply_privacy(global, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Corpus, HashingEncoder, InMemoryDatasetProvider, TextRecord};
    use crate::training::backend::LinearBackend;

    fn seeded_provider() -> InMemoryDatasetProvider {
        let mut provider = InMemoryDatasetProvider::new();
        let records = (0..8)
            .map(|i| TextRecord::new(&format!("document number {}", i), i % 2))
            .collect();
        provider.insert("good_ds", Corpus::from_records(records));
        provider
    }

    fn test_trainer() -> ModularTrainer {
        ModularTrainer::new(
            Arc::new(seeded_provider()),
            Arc::new(HashingEncoder::new()),
            Arc::new(LinearBackend::new(4, 2)),
        )
    }

    fn config(name: &str, dataset: &str) -> ModuleConfig {
        ModuleConfig::new(name, "base", vec![dataset.to_string()])
            .with_max_sequence_length(16)
            .with_epochs(2)
            .with_batch_size(4)
            .with_learning_rate(0.01)
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let trainer = test_trainer();
        trainer.register(config("a", "good_ds")).unwrap();
        let result = trainer.register(config("a", "good_ds"));
        assert!(matches!(result, Err(Error::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_train_stores_in_registry() {
        let trainer = test_trainer();
        let module = trainer.train(&config("a", "good_ds")).await.unwrap();
        assert_eq!(module.version, 1);

        let stored = trainer.module("a").unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_retrain_bumps_version() {
        let trainer = test_trainer();
        let cfg = config("a", "good_ds");
        trainer.train(&cfg).await.unwrap();
        let retrained = trainer.train(&cfg).await.unwrap();
        assert_eq!(retrained.version, 2);
    }

    #[tokio::test]
    async fn test_train_fails_on_unresolvable_datasets() {
        let trainer = test_trainer();
        let result = trainer.train(&config("a", "missing_ds")).await;
        assert!(matches!(result, Err(Error::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn test_train_all_isolates_failures() {
        let trainer = test_trainer();
        let configs = vec![config("a", "good_ds"), config("b", "missing_ds")];

        let report = trainer.train_all(&configs).await;

        assert_eq!(report.trained.len(), 1);
        assert!(report.trained.contains_key("a"));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "b");
        assert!(!report.all_succeeded());

        // The survivor is retrievable from the registry.
        assert!(trainer.module("a").is_some());
        assert!(trainer.module("b").is_none());
    }

    #[tokio::test]
    async fn test_federated_round_produces_global_module() {
        let trainer = test_trainer();
        let configs = vec![config("a", "good_ds"), config("b", "good_ds")];

        let global = trainer.federated_round(&configs, 10.0).await.unwrap();
        assert_eq!(global.dims.encoding_width, 16);
        assert!(global.param_count() > 0);
    }
}
