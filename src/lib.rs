//! # lexfed - Modular Multi-Jurisdiction Training Orchestrator
//!
//! Trains independent modules per jurisdiction or domain, then combines
//! them:
//! - **Modular training**: concurrent per-module training fan-out
//! - **Federated averaging**: unweighted FedAvg with differential privacy
//! - **Distillation**: teacher-to-student knowledge transfer
//! - **Ensemble**: deterministic multi-module inference
//! - **Continuous learning**: evaluate, retrain, validate, deploy loop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lexfed::data::{HashingEncoder, InMemoryDatasetProvider};
//! use lexfed::module::jurisdiction_presets;
//! use lexfed::training::{LinearBackend, ModularTrainer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let trainer = ModularTrainer::new(
//!         Arc::new(InMemoryDatasetProvider::with_catalog()),
//!         Arc::new(HashingEncoder::new()),
//!         Arc::new(LinearBackend::default()),
//!     );
//!     let report = trainer.train_all(&jurisdiction_presets()).await;
//!     println!("trained {} modules", report.trained.len());
//! }
//! ```

pub mod core;
pub mod data;
pub mod distill;
pub mod ensemble;
pub mod federated;
pub mod module;
pub mod persistence;
pub mod pipeline;
pub mod training;

pub use crate::core::error::{Error, Result};
