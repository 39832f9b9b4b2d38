//! Trained-module persistence.
//!
//! Pluggable storage backends for module parameters.

pub mod store;

pub use store::{FileStore, InMemoryStore, ModelStore};
