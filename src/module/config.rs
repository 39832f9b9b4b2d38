//! Module configuration.
//!
//! Immutable description of one trainable unit, scoped to a
//! jurisdiction or a domain.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for one trainable module.
///
/// Constructed once at orchestration setup and never mutated. Reusing a
/// config for retraining starts a new logical run with the same value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Unique module name
    pub name: String,
    /// Opaque handle to a pretrained base architecture
    pub base_model_ref: String,
    /// Logical dataset names, in load order (non-empty)
    pub dataset_refs: Vec<String>,
    /// Learning rate (positive)
    pub learning_rate: f32,
    /// Batch size (positive)
    pub batch_size: usize,
    /// Training epochs (positive)
    pub epochs: usize,
    /// Maximum encoded sequence length (positive)
    pub max_sequence_length: usize,
    /// Jurisdiction this module covers, if any
    pub jurisdiction: Option<String>,
    /// Industry domain this module covers, if any
    pub domain: Option<String>,
}

impl ModuleConfig {
    /// Create a config with default hyperparameters.
    pub fn new(name: &str, base_model_ref: &str, dataset_refs: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            base_model_ref: base_model_ref.to_string(),
            dataset_refs,
            learning_rate: 5e-5,
            batch_size: 32,
            epochs: 10,
            max_sequence_length: 512,
            jurisdiction: None,
            domain: None,
        }
    }

    /// Set the learning rate.
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the epoch count.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the maximum encoded sequence length.
    pub fn with_max_sequence_length(mut self, max_sequence_length: usize) -> Self {
        self.max_sequence_length = max_sequence_length;
        self
    }

    /// Set the jurisdiction.
    pub fn with_jurisdiction(mut self, jurisdiction: &str) -> Self {
        self.jurisdiction = Some(jurisdiction.to_string());
        self
    }

    /// Set the domain.
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    /// Validate the config against its invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidParameter("module name is empty".to_string()));
        }
        if self.dataset_refs.is_empty() {
            return Err(Error::InvalidParameter(format!(
                "module {} has no dataset refs",
                self.name
            )));
        }
        if self.learning_rate <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidParameter(
                "batch size must be positive".to_string(),
            ));
        }
        if self.epochs == 0 {
            return Err(Error::InvalidParameter(
                "epoch count must be positive".to_string(),
            ));
        }
        if self.max_sequence_length == 0 {
            return Err(Error::InvalidParameter(
                "max sequence length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Preset jurisdiction modules (US, EU, UK legal corpora).
pub fn jurisdiction_presets() -> Vec<ModuleConfig> {
    vec![
        ModuleConfig::new(
            "US_Legal_Module",
            "nlpaueb/legal-bert-base-uncased",
            vec!["casehold".to_string(), "us_federal_register".to_string()],
        )
        .with_jurisdiction("United States"),
        ModuleConfig::new(
            "EU_Legal_Module",
            "nlpaueb/legal-bert-base-uncased",
            vec!["multi_eurlex".to_string(), "eurlex".to_string()],
        )
        .with_jurisdiction("European Union"),
        ModuleConfig::new(
            "UK_Legal_Module",
            "nlpaueb/legal-bert-base-uncased",
            vec!["lex_glue".to_string()],
        )
        .with_jurisdiction("United Kingdom"),
    ]
}

/// Preset domain modules (financial, healthcare, contract law).
pub fn domain_presets() -> Vec<ModuleConfig> {
    vec![
        ModuleConfig::new(
            "Financial_Compliance_Module",
            "yiyanghkust/finbert-tone",
            vec![
                "financial_phrasebank".to_string(),
                "sec_filings".to_string(),
            ],
        )
        .with_domain("Financial Services"),
        ModuleConfig::new(
            "Healthcare_Compliance_Module",
            "dmis-lab/biobert-v1.1",
            vec!["pubmed".to_string(), "clinical_trials".to_string()],
        )
        .with_domain("Healthcare"),
        ModuleConfig::new(
            "Contract_Analysis_Module",
            "nlpaueb/legal-bert-base-uncased",
            vec!["cuad".to_string()],
        )
        .with_domain("Contract Law"),
    ]
}
