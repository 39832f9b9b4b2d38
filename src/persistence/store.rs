//! Trained-module persistence seam.
//!
//! Stores module parameters under a name and loads them back.

use crate::core::{Error, Result, Timestamp};
use crate::module::TrainedModule;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::info;

/// Persistence seam for trained modules.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Save a module's state under its name, replacing any prior state.
    async fn save(&self, name: &str, module: &TrainedModule) -> Result<()>;

    /// Load a module's state by name.
    async fn load(&self, name: &str) -> Result<TrainedModule>;

    /// Names of all stored modules.
    async fn list(&self) -> Result<Vec<String>>;
}

/// In-memory store, for tests and single-process runs.
#[derive(Default)]
pub struct InMemoryStore {
    modules: RwLock<HashMap<String, TrainedModule>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelStore for InMemoryStore {
    async fn save(&self, name: &str, module: &TrainedModule) -> Result<()> {
        let mut modules = self
            .modules
            .write()
            .map_err(|_| Error::Internal("store lock poisoned".to_string()))?;
        modules.insert(name.to_string(), module.clone());
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<TrainedModule> {
        let modules = self
            .modules
            .read()
            .map_err(|_| Error::Internal("store lock poisoned".to_string()))?;
        modules
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ModuleNotFound(name.to_string()))
    }

    async fn list(&self) -> Result<Vec<String>> {
        let modules = self
            .modules
            .read()
            .map_err(|_| Error::Internal("store lock poisoned".to_string()))?;
        let mut names: Vec<String> = modules.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Manifest written beside each stored module payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredManifest {
    name: String,
    version: u32,
    trained_at: Timestamp,
    param_count: usize,
}

/// Filesystem store: bincode payload plus a JSON manifest per module.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn payload_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.module", name))
    }

    fn manifest_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }
}

#[async_trait]
impl ModelStore for FileStore {
    async fn save(&self, name: &str, module: &TrainedModule) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let payload = bincode::serialize(module)?;
        tokio::fs::write(self.payload_path(name), payload).await?;

        let manifest = StoredManifest {
            name: name.to_string(),
            version: module.version,
            trained_at: module.trained_at,
            param_count: module.param_count(),
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest)?;
        tokio::fs::write(self.manifest_path(name), manifest_json).await?;

        info!(module = %name, version = module.version, "module saved");
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<TrainedModule> {
        let path = self.payload_path(name);
        if !path.exists() {
            return Err(Error::ModuleNotFound(name.to_string()));
        }
        let payload = tokio::fs::read(path).await?;
        let module = bincode::deserialize(&payload)
            .map_err(|e| Error::DeserializationError(e.to_string()))?;
        Ok(module)
    }

    async fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "module").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
