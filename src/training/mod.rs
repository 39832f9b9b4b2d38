//! Training orchestration.
//!
//! The backend seam that owns optimization internals, and the modular
//! trainer that fans training out across module configs.

pub mod backend;
pub mod trainer;

pub use backend::{softmax, EncodedRecord, Inference, LinearBackend, TrainingBackend};
pub use trainer::{ModularTrainer, TrainingFailure, TrainingReport};
