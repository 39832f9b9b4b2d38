//! Data acquisition and encoding seams.
//!
//! External collaborators for the orchestrator:
//! - Logical-name dataset resolution into labeled corpora
//! - Fixed-width text encoding (truncate/pad contract)

pub mod corpus;
pub mod encoder;

pub use corpus::{Corpus, DatasetProvider, InMemoryDatasetProvider, TextRecord, AVAILABLE_DATASETS};
pub use encoder::{Encoder, HashingEncoder};
