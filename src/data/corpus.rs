//! Labeled text corpora and the dataset provider seam.
//!
//! Dataset acquisition is an external collaborator: given logical names,
//! return one unified corpus of labeled records.

use crate::core::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Logical dataset names known to the default provider.
pub const AVAILABLE_DATASETS: &[&str] = &[
    "lex_glue",
    "multi_eurlex",
    "casehold",
    "cuad",
    "eurlex",
    "us_federal_register",
    "financial_phrasebank",
    "sec_filings",
    "pubmed",
    "clinical_trials",
];

/// One labeled text record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    /// Raw text
    pub text: String,
    /// Class label
    pub label: usize,
}

impl TextRecord {
    /// Create a new record.
    pub fn new(text: &str, label: usize) -> Self {
        Self {
            text: text.to_string(),
            label,
        }
    }
}

/// An ordered collection of labeled records.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Corpus {
    /// Records in load order
    pub records: Vec<TextRecord>,
}

impl Corpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from existing records.
    pub fn from_records(records: Vec<TextRecord>) -> Self {
        Self { records }
    }

    /// Append all records from another corpus.
    pub fn extend(&mut self, other: Corpus) {
        self.records.extend(other.records);
    }

    /// Record count.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Dataset acquisition seam.
///
/// Resolves logical dataset names into one combined corpus. Names that
/// fail to resolve are skipped; the call fails only when nothing loads.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// Load and combine the corpora behind the given logical names.
    async fn load(&self, logical_names: &[String]) -> Result<Corpus>;
}

/// In-memory dataset provider backed by a logical-name registry.
#[derive(Default)]
pub struct InMemoryDatasetProvider {
    corpora: HashMap<String, Corpus>,
}

impl InMemoryDatasetProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider seeded with a small synthetic corpus for every
    /// known logical dataset name.
    pub fn with_catalog() -> Self {
        let mut provider = Self::new();
        for name in AVAILABLE_DATASETS {
            let records = (0..8)
                .map(|i| TextRecord::new(&format!("{} sample document {}", name, i), i % 2))
                .collect();
            provider.insert(name, Corpus::from_records(records));
        }
        provider
    }

    /// Register a corpus under a logical name.
    pub fn insert(&mut self, name: &str, corpus: Corpus) {
        self.corpora.insert(name.to_string(), corpus);
    }
}

#[async_trait]
impl DatasetProvider for InMemoryDatasetProvider {
    async fn load(&self, logical_names: &[String]) -> Result<Corpus> {
        let mut combined = Corpus::new();
        let mut resolved = 0usize;

        for name in logical_names {
            match self.corpora.get(name) {
                Some(corpus) => {
                    combined.extend(corpus.clone());
                    resolved += 1;
                }
                None => {
                    warn!(dataset = %name, "logical dataset did not resolve, skipping");
                }
            }
        }

        if resolved == 0 {
            return Err(Error::DataUnavailable(logical_names.join(", ")));
        }

        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_combines_in_order() {
        let mut provider = InMemoryDatasetProvider::new();
        provider.insert(
            "first",
            Corpus::from_records(vec![TextRecord::new("alpha", 0)]),
        );
        provider.insert(
            "second",
            Corpus::from_records(vec![TextRecord::new("beta", 1)]),
        );

        let corpus = provider
            .load(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.records[0].text, "alpha");
        assert_eq!(corpus.records[1].text, "beta");
    }

    #[tokio::test]
    async fn test_load_skips_unresolved_names() {
        let mut provider = InMemoryDatasetProvider::new();
        provider.insert(
            "known",
            Corpus::from_records(vec![TextRecord::new("alpha", 0)]),
        );

        let corpus = provider
            .load(&["known".to_string(), "missing".to_string()])
            .await
            .unwrap();

        assert_eq!(corpus.len(), 1);
    }

    #[tokio::test]
    async fn test_load_fails_when_nothing_resolves() {
        let provider = InMemoryDatasetProvider::new();
        let result = provider.load(&["missing".to_string()]).await;
        assert!(matches!(result, Err(Error::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn test_catalog_covers_known_names() {
        let provider = InMemoryDatasetProvider::with_catalog();
        for name in AVAILABLE_DATASETS {
            let corpus = provider.load(&[name.to_string()]).await.unwrap();
            assert!(!corpus.is_empty());
        }
    }
}
