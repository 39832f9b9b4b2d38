//! Continuous learning pipeline.
//!
//! Long-lived supervisory loop: evaluate, select retraining targets,
//! retrain, validate, deploy on strict improvement.

use crate::core::{now, Error, Result, Timestamp};
use crate::module::ModuleConfig;
use crate::persistence::ModelStore;
use crate::pipeline::policy::{Evaluator, RetrainPolicy};
use crate::training::ModularTrainer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Pipeline states, in cycle order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// Gathering fresh data (the data collaborator's concern)
    Collecting,
    /// Computing the current performance score
    Evaluating,
    /// Choosing retraining targets
    Selecting,
    /// Retraining selected modules
    Retraining,
    /// Recomputing the score after retraining
    Validating,
    /// Handing improved modules to the persistence collaborator
    Deploying,
}

/// One appended performance measurement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Scalar score, higher is better
    pub score: f32,
    /// Cycle the score was measured in
    pub cycle: u64,
    /// When the score was measured
    pub timestamp: Timestamp,
}

/// Pipeline timing configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Wait between successful cycles
    pub cycle_interval: Duration,
    /// Wait after a failed cycle, strictly shorter than the interval
    pub error_cooldown: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(86_400),
            error_cooldown: Duration::from_secs(3_600),
        }
    }
}

impl PipelineConfig {
    /// Validate the timing invariant.
    pub fn validate(&self) -> Result<()> {
        if self.error_cooldown >= self.cycle_interval {
            return Err(Error::InvalidParameter(format!(
                "error cooldown {:?} must be strictly shorter than cycle interval {:?}",
                self.error_cooldown, self.cycle_interval
            )));
        }
        Ok(())
    }
}

/// Outcome of one completed pipeline cycle.
#[derive(Clone, Debug)]
pub struct CycleOutcome {
    /// Score before retraining
    pub pre_score: f32,
    /// Score after retraining
    pub post_score: f32,
    /// Names selected for retraining
    pub selected: Vec<String>,
    /// Names that actually retrained successfully
    pub retrained: Vec<String>,
    /// Whether the cycle reached Deploying
    pub deployed: bool,
}

/// Supervisory loop for continuous retraining.
///
/// Runs indefinitely under normal operation; any cycle error is logged,
/// followed by a cooldown, and the loop re-enters Collecting. The only
/// clean exit is the external cancellation signal, checked cooperatively
/// at cycle boundaries.
pub struct ContinuousLearningPipeline {
    trainer: Arc<ModularTrainer>,
    evaluator: Arc<dyn Evaluator>,
    policy: Arc<dyn RetrainPolicy>,
    store: Arc<dyn ModelStore>,
    config: PipelineConfig,
    state: PipelineState,
    history: Vec<PerformanceRecord>,
    cycle: u64,
}

impl ContinuousLearningPipeline {
    /// Create a pipeline with default timing.
    pub fn new(
        trainer: Arc<ModularTrainer>,
        evaluator: Arc<dyn Evaluator>,
        policy: Arc<dyn RetrainPolicy>,
        store: Arc<dyn ModelStore>,
    ) -> Self {
        Self {
            trainer,
            evaluator,
            policy,
            store,
            config: PipelineConfig::default(),
            state: PipelineState::Collecting,
            history: Vec::new(),
            cycle: 0,
        }
    }

    /// Replace the timing configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Append-only performance history.
    pub fn history(&self) -> &[PerformanceRecord] {
        &self.history
    }

    /// Completed cycle count.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    fn record_score(&mut self, score: f32) {
        self.history.push(PerformanceRecord {
            score,
            cycle: self.cycle,
            timestamp: now(),
        });
    }

    /// Run one full cycle and return to Collecting.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.cycle += 1;
        self.state = PipelineState::Collecting;

        self.state = PipelineState::Evaluating;
        let pre_score = self.evaluator.evaluate().await?;
        self.record_score(pre_score);

        self.state = PipelineState::Selecting;
        let known = self.trainer.registered_names();
        let selected = self.policy.select(pre_score, &known);

        self.state = PipelineState::Retraining;
        let configs: Vec<ModuleConfig> = selected
            .iter()
            .filter_map(|name| {
                let config = self.trainer.config(name);
                if config.is_none() {
                    warn!(module = %name, "selected name has no registered config, skipping");
                }
                config
            })
            .collect();
        let report = self.trainer.train_all(&configs).await;
        for failure in &report.failures {
            warn!(
                module = %failure.name,
                reason = %failure.reason,
                "retraining failure isolated"
            );
        }
        let retrained: Vec<String> = configs
            .iter()
            .filter(|c| report.trained.contains_key(&c.name))
            .map(|c| c.name.clone())
            .collect();

        self.state = PipelineState::Validating;
        let post_score = self.evaluator.evaluate().await?;
        self.record_score(post_score);

        // Strict improvement gate: ties and regressions never deploy.
        let deployed = post_score > pre_score;
        if deployed {
            self.state = PipelineState::Deploying;
            for name in &retrained {
                if let Some(module) = report.trained.get(name) {
                    self.store.save(name, module).await?;
                }
            }
            info!(
                cycle = self.cycle,
                pre = pre_score,
                post = post_score,
                deployed = retrained.len(),
                "performance improved, updates deployed"
            );
        } else {
            info!(
                cycle = self.cycle,
                pre = pre_score,
                post = post_score,
                "no strict improvement, skipping deployment"
            );
        }

        self.state = PipelineState::Collecting;
        Ok(CycleOutcome {
            pre_score,
            post_score,
            selected,
            retrained,
            deployed,
        })
    }

    /// Run the supervisory loop until cancelled.
    ///
    /// Cycle errors never terminate the loop: they are logged at ERROR
    /// with the cycle number, followed by the shorter cooldown wait.
    /// Cancellation is cooperative, checked between cycles and during
    /// waits, never mid-training.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                info!(cycle = self.cycle, "pipeline cancelled, exiting");
                return;
            }

            let wait = match self.run_cycle().await {
                Ok(outcome) => {
                    info!(
                        cycle = self.cycle,
                        deployed = outcome.deployed,
                        "cycle complete"
                    );
                    self.config.cycle_interval
                }
                Err(err) => {
                    error!(cycle = self.cycle, error = %err, "cycle failed, cooling down");
                    self.state = PipelineState::Collecting;
                    self.config.error_cooldown
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Corpus, HashingEncoder, InMemoryDatasetProvider, TextRecord};
    use crate::persistence::InMemoryStore;
    use crate::pipeline::policy::ThresholdPolicy;
    use crate::training::backend::LinearBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Evaluator replaying a fixed score sequence, repeating the last.
    struct ScriptedEvaluator {
        scores: Mutex<Vec<f32>>,
        next: AtomicUsize,
    }

    impl ScriptedEvaluator {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores: Mutex::new(scores),
                next: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Evaluator for ScriptedEvaluator {
        async fn evaluate(&self) -> Result<f32> {
            let scores = self.scores.lock().unwrap();
            let idx = self.next.fetch_add(1, Ordering::SeqCst).min(scores.len() - 1);
            Ok(scores[idx])
        }
    }

    /// Evaluator that always fails.
    struct FailingEvaluator;

    #[async_trait]
    impl Evaluator for FailingEvaluator {
        async fn evaluate(&self) -> Result<f32> {
            Err(Error::Internal("benchmark backend offline".to_string()))
        }
    }

    fn test_trainer() -> Arc<ModularTrainer> {
        let mut provider = InMemoryDatasetProvider::new();
        let records = (0..8)
            .map(|i| TextRecord::new(&format!("record {}", i), i % 2))
            .collect();
        provider.insert("ds", Corpus::from_records(records));

        let trainer = ModularTrainer::new(
            Arc::new(provider),
            Arc::new(HashingEncoder::new()),
            Arc::new(LinearBackend::new(4, 2)),
        );
        trainer
            .register(
                ModuleConfig::new("mod_a", "base", vec!["ds".to_string()])
                    .with_max_sequence_length(8)
                    .with_epochs(1)
                    .with_batch_size(4)
                    .with_learning_rate(0.01),
            )
            .unwrap();
        Arc::new(trainer)
    }

    fn pipeline_with(scores: Vec<f32>) -> (ContinuousLearningPipeline, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = ContinuousLearningPipeline::new(
            test_trainer(),
            Arc::new(ScriptedEvaluator::new(scores)),
            Arc::new(ThresholdPolicy::new(0.9)),
            Arc::clone(&store) as Arc<dyn ModelStore>,
        );
        (pipeline, store)
    }

    #[test]
    fn test_config_cooldown_must_be_shorter() {
        let bad = PipelineConfig {
            cycle_interval: Duration::from_secs(60),
            error_cooldown: Duration::from_secs(60),
        };
        assert!(bad.validate().is_err());
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_regression_does_not_deploy() {
        let (mut pipeline, store) = pipeline_with(vec![0.80, 0.79]);
        let outcome = pipeline.run_cycle().await.unwrap();

        assert!(!outcome.deployed);
        assert_eq!(outcome.retrained, vec!["mod_a".to_string()]);
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(pipeline.state(), PipelineState::Collecting);
    }

    #[tokio::test]
    async fn test_tie_does_not_deploy() {
        let (mut pipeline, store) = pipeline_with(vec![0.80, 0.80]);
        let outcome = pipeline.run_cycle().await.unwrap();

        assert!(!outcome.deployed);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_strict_improvement_deploys() {
        let (mut pipeline, store) = pipeline_with(vec![0.80, 0.81]);
        let outcome = pipeline.run_cycle().await.unwrap();

        assert!(outcome.deployed);
        assert_eq!(store.list().await.unwrap(), vec!["mod_a".to_string()]);
    }

    #[tokio::test]
    async fn test_history_is_append_only_per_cycle() {
        let (mut pipeline, _) = pipeline_with(vec![0.5, 0.6, 0.7, 0.8]);
        pipeline.run_cycle().await.unwrap();
        pipeline.run_cycle().await.unwrap();

        let history = pipeline.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].cycle, 1);
        assert_eq!(history[2].cycle, 2);
    }

    #[tokio::test]
    async fn test_high_score_selects_nothing() {
        let (mut pipeline, store) = pipeline_with(vec![0.95, 0.95]);
        let outcome = pipeline.run_cycle().await.unwrap();

        assert!(outcome.selected.is_empty());
        assert!(outcome.retrained.is_empty());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_survives_cycle_errors_until_cancelled() {
        let store = Arc::new(InMemoryStore::new());
        let mut pipeline = ContinuousLearningPipeline::new(
            test_trainer(),
            Arc::new(FailingEvaluator),
            Arc::new(ThresholdPolicy::new(0.9)),
            store as Arc<dyn ModelStore>,
        )
        .with_config(PipelineConfig {
            cycle_interval: Duration::from_millis(20),
            error_cooldown: Duration::from_millis(5),
        })
        .unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            pipeline.run(rx).await;
            pipeline
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let pipeline = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("pipeline did not stop on cancellation")
            .unwrap();

        // Several failed cycles ran before cancellation; none crashed the loop.
        assert!(pipeline.cycle() >= 2);
    }

    #[tokio::test]
    async fn test_cancellation_before_first_cycle() {
        let (mut pipeline, _) = pipeline_with(vec![0.5]);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        // Returns immediately without running a cycle.
        pipeline.run(rx).await;
        assert_eq!(pipeline.cycle(), 0);
    }
}
