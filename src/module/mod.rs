//! Trainable module definitions.
//!
//! Configuration value objects and trained-module handles:
//! - Per-jurisdiction and per-domain module configs
//! - Opaque trained parameter bundles with schema checks

pub mod config;
pub mod model;

pub use config::{domain_presets, jurisdiction_presets, ModuleConfig};
pub use model::{ModuleDims, TrainedModule};
