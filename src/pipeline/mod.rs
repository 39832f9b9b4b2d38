//! Continuous learning pipeline.
//!
//! Supervisory retraining loop and its policy seams:
//! - Evaluate, select, retrain, validate, deploy state machine
//! - Strict-improvement deployment gate
//! - Catch-and-continue error policy with cooldown

pub mod continuous;
pub mod policy;

pub use continuous::{
    ContinuousLearningPipeline, CycleOutcome, PerformanceRecord, PipelineConfig, PipelineState,
};
pub use policy::{Evaluator, RetrainPolicy, ThresholdPolicy};
