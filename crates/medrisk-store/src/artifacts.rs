//! The trained artifact pair on disk.
//!
//! A trained model is two addressable blobs that only make sense together:
//! the classifier ensemble and the ordered feature-column list it was fitted
//! against. They live as sibling JSON files under one directory, plus a small
//! manifest recording when and on how much data the pair was produced.
//!
//! Individual files are written via a temp file and an atomic rename, so a
//! crashed trainer never leaves a torn file behind. Pair consistency is
//! enforced at load time: readers take both files or neither.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use medrisk_core::FeatureSchema;

use crate::StoreError;

const SCHEMA_FILE: &str = "feature_columns.json";
const ENSEMBLE_FILE: &str = "risk_ensemble.json";
const MANIFEST_FILE: &str = "manifest.json";

/// Path addressing for one trained artifact pair.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    dir: PathBuf,
}

/// Provenance for a trained pair, written alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// RFC 3339 timestamp string.
    pub trained_at: String,
    pub rows: usize,
    pub feature_count: usize,
    pub validation_score: f64,
}

impl ArtifactManifest {
    pub fn new(rows: usize, feature_count: usize, validation_score: f64) -> Self {
        Self {
            trained_at: Utc::now().to_rfc3339(),
            rows,
            feature_count,
            validation_score,
        }
    }
}

impl ArtifactSet {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn schema_path(&self) -> PathBuf {
        self.dir.join(SCHEMA_FILE)
    }

    pub fn ensemble_path(&self) -> PathBuf {
        self.dir.join(ENSEMBLE_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Whether both halves of the pair are present on disk.
    ///
    /// The manifest is informational and not required.
    pub fn is_complete(&self) -> bool {
        self.schema_path().exists() && self.ensemble_path().exists()
    }

    pub fn write_schema(&self, schema: &FeatureSchema) -> Result<(), StoreError> {
        self.write_json(&self.schema_path(), schema)
    }

    pub fn read_schema(&self) -> Result<FeatureSchema, StoreError> {
        self.read_json(&self.schema_path())
    }

    /// Persist the trained ensemble. Generic over the concrete model type so
    /// the storage layer stays agnostic of the learning layer.
    pub fn write_ensemble<T: Serialize>(&self, ensemble: &T) -> Result<(), StoreError> {
        self.write_json(&self.ensemble_path(), ensemble)
    }

    pub fn read_ensemble<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        self.read_json(&self.ensemble_path())
    }

    pub fn write_manifest(&self, manifest: &ArtifactManifest) -> Result<(), StoreError> {
        self.write_json(&self.manifest_path(), manifest)
    }

    pub fn read_manifest(&self) -> Result<ArtifactManifest, StoreError> {
        self.read_json(&self.manifest_path())
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, value)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

        info!(path = %path.display(), "wrote artifact");
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StoreError> {
        if !path.exists() {
            return Err(StoreError::ArtifactNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
