//! Ensemble composition and inference.
//!
//! Deterministic combination of trained modules:
//! - Insertion-ordered member features, concatenated
//! - Freshly initialized integration and classifier layers

pub mod composer;
pub mod model;

pub use composer::EnsembleComposer;
pub use model::EnsembleModel;
