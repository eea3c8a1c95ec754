//! Pipeline store backed by a TOML manifest file.
//!
//! The file is re-read on every query, so editing it drives the next pass:
//!
//! ```toml
//! [gate]
//! name = "scheduler"
//! paused = false
//!
//! [[pipelines]]
//! id = 1
//! name = "pipeline"
//!
//! [[pipelines]]
//! id = 2
//! name = "other-pipeline"
//! paused = true
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipesync_core::{Error, GateState, Pipeline, Result};
use serde::{Deserialize, Serialize};

use crate::source::{PauseGate, PipelineSource};

/// Parsed manifest contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub gate: Option<GateState>,
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
}

impl Manifest {
    /// Parse a manifest document.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigParseFailed` for malformed TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::config_parse_failed(format!("Failed to parse manifest: {e}")))
    }
}

/// Pipeline source and pause gate reading a manifest file.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    /// Create a store for the manifest at `path`. The file is not read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the manifest.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the manifest.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` when the file cannot be read or
    /// parsed; the syncer treats that as a skipped pass.
    pub async fn load(&self) -> Result<Manifest> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::store_unavailable(format!("reading '{}': {e}", self.path.display()))
        })?;
        Manifest::from_toml_str(&content).map_err(|e| Error::store_unavailable(e.to_string()))
    }
}

#[async_trait]
impl PipelineSource for ManifestStore {
    async fn list_all(&self) -> Result<Vec<Pipeline>> {
        Ok(self.load().await?.pipelines)
    }
}

#[async_trait]
impl PauseGate for ManifestStore {
    async fn lookup(&self, name: &str) -> Result<Option<GateState>> {
        Ok(self.load().await?.gate.filter(|gate| gate.name == name))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MANIFEST: &str = r#"
[gate]
name = "scheduler"

[[pipelines]]
id = 1
name = "pipeline"

[[pipelines]]
id = 2
name = "other-pipeline"
paused = true
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::from_toml_str(MANIFEST).ok();
        assert_eq!(
            manifest.as_ref().and_then(|m| m.gate.clone()),
            Some(GateState::open("scheduler"))
        );
        assert_eq!(
            manifest.map(|m| m.pipelines),
            Some(vec![
                Pipeline::new(1, "pipeline"),
                Pipeline::new(2, "other-pipeline").paused(true),
            ])
        );
    }

    #[test]
    fn test_empty_manifest_has_no_gate() {
        assert_eq!(Manifest::from_toml_str("").ok(), Some(Manifest::default()));
    }

    #[tokio::test]
    async fn test_store_reads_file_on_each_query() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(MANIFEST.as_bytes())?;
        let store = ManifestStore::new(file.path());

        assert_eq!(store.list_all().await?.len(), 2);
        assert_eq!(store.lookup("scheduler").await?, Some(GateState::open("scheduler")));
        assert_eq!(store.lookup("other").await?, None);

        std::fs::write(file.path(), "[[pipelines]]\nid = 3\nname = \"deploy\"\n")?;
        assert_eq!(store.list_all().await?, vec![Pipeline::new(3, "deploy")]);
        assert_eq!(store.lookup("scheduler").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_store_unavailable() {
        let store = ManifestStore::new("/nonexistent/pipelines.toml");
        assert!(matches!(
            store.list_all().await,
            Err(Error::StoreUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_file_is_store_unavailable() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"[[pipelines]\nid = ")?;
        let store = ManifestStore::new(file.path());
        assert!(matches!(
            store.lookup("scheduler").await,
            Err(Error::StoreUnavailable { .. })
        ));
        Ok(())
    }
}
