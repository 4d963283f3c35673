
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::FlatIndex;
use crate::config::ProviderConfig;
use crate::corpus::FaqRecord;
use crate::{FaqError, Result};

pub const INDEX_FILE: &str = "faq_index.bin";
pub const METADATA_FILE: &str = "metadata.json";
pub const MANIFEST_FILE: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;

/// Describes how a set of artifacts was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_deployment: String,
    pub api_version: String,
    pub dimension: usize,
    pub record_count: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    #[inline]
    pub fn new(provider: &ProviderConfig, dimension: usize, record_count: usize) -> Self {
        Self {
            format_version: MANIFEST_VERSION,
            embedding_deployment: provider.embedding_deployment.clone(),
            api_version: provider.api_version.clone(),
            dimension,
            record_count,
            built_at: Utc::now(),
        }
    }

    /// Same form as [`ProviderConfig::embedding_fingerprint`]
    #[inline]
    pub fn embedding_fingerprint(&self) -> String {
        format!("{}@{}", self.embedding_deployment, self.api_version)
    }
}

/// The index, its parallel metadata and their manifest.
///
/// The three files are written and read as one unit. Position `i` in the
/// index is record `i` in the metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexArtifacts {
    pub index: FlatIndex,
    pub records: Vec<FaqRecord>,
    pub manifest: IndexManifest,
}

impl IndexArtifacts {
    /// Bundle freshly built parts, checking that they line up
    #[inline]
    pub fn new(index: FlatIndex, records: Vec<FaqRecord>, manifest: IndexManifest) -> Result<Self> {
        let artifacts = Self {
            index,
            records,
            manifest,
        };
        artifacts.validate()?;
        Ok(artifacts)
    }

    #[inline]
    pub fn index_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    #[inline]
    pub fn metadata_path(dir: &Path) -> PathBuf {
        dir.join(METADATA_FILE)
    }

    #[inline]
    pub fn manifest_path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    /// Whether all three artifact files are present in `dir`
    #[inline]
    pub fn exist_in(dir: &Path) -> bool {
        Self::index_path(dir).is_file()
            && Self::metadata_path(dir).is_file()
            && Self::manifest_path(dir).is_file()
    }

    #[inline]
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.validate()?;
        fs::create_dir_all(dir)?;

        let staged = [
            (staging_path(dir, INDEX_FILE), Self::index_path(dir)),
            (staging_path(dir, METADATA_FILE), Self::metadata_path(dir)),
            (staging_path(dir, MANIFEST_FILE), Self::manifest_path(dir)),
        ];

        if let Err(e) = self.write_staged(&staged[0].0, &staged[1].0, &staged[2].0) {
            warn!("Failed to stage index artifacts in {}: {}", dir.display(), e);
            discard(&staged);
            return Err(e);
        }

        // The manifest marks a complete set: drop it before swapping files
        // and put the new one in place last.
        match fs::remove_file(Self::manifest_path(dir)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                discard(&staged);
                return Err(e.into());
            }
        }
        for (staging, live) in &staged {
            if let Err(e) = fs::rename(staging, live) {
                warn!(
                    "Failed to move {} into place; index in {} is incomplete",
                    live.display(),
                    dir.display()
                );
                discard(&staged);
                return Err(e.into());
            }
        }

        info!(
            "Saved index of {} vectors ({} dimensions) to {}",
            self.index.len(),
            self.index.dimension(),
            dir.display()
        );
        Ok(())
    }

    fn write_staged(&self, index: &Path, metadata: &Path, manifest: &Path) -> Result<()> {
        self.index.write_to(index)?;

        let records = serde_json::to_string_pretty(&self.records)
            .map_err(|e| FaqError::Other(anyhow::anyhow!("Failed to serialize metadata: {}", e)))?;
        fs::write(metadata, records)?;

        let description = serde_json::to_string_pretty(&self.manifest)
            .map_err(|e| FaqError::Other(anyhow::anyhow!("Failed to serialize manifest: {}", e)))?;
        fs::write(manifest, description)?;
        Ok(())
    }

    /// Load and cross-check the three artifacts in `dir`.
    ///
    /// A missing file is an I/O error; files that disagree on vector count
    /// or dimension are an [`FaqError::ArtifactMismatch`].
    #[inline]
    pub fn load(dir: &Path) -> Result<Self> {
        debug!("Loading index artifacts from {}", dir.display());

        let index = FlatIndex::read_from(&Self::index_path(dir))?;

        let metadata = fs::read_to_string(Self::metadata_path(dir))?;
        let records: Vec<FaqRecord> = serde_json::from_str(&metadata).map_err(|e| {
            FaqError::ArtifactMismatch(format!("Metadata file is not a record list: {}", e))
        })?;

        let manifest = fs::read_to_string(Self::manifest_path(dir))?;
        let manifest: IndexManifest = serde_json::from_str(&manifest).map_err(|e| {
            FaqError::ArtifactMismatch(format!("Manifest file is invalid: {}", e))
        })?;

        let artifacts = Self {
            index,
            records,
            manifest,
        };
        artifacts.validate()?;

        info!(
            "Loaded index of {} vectors built {}",
            artifacts.index.len(),
            artifacts.manifest.built_at
        );
        Ok(artifacts)
    }

    /// Check the parallel-array invariant and the manifest's description
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.index.len() != self.records.len() {
            return Err(FaqError::ArtifactMismatch(format!(
                "index has {} vectors but metadata has {} records",
                self.index.len(),
                self.records.len()
            )));
        }
        if self.manifest.format_version != MANIFEST_VERSION {
            return Err(FaqError::ArtifactMismatch(format!(
                "unsupported manifest version {}",
                self.manifest.format_version
            )));
        }
        if self.manifest.record_count != self.index.len() {
            return Err(FaqError::ArtifactMismatch(format!(
                "manifest lists {} records but index has {} vectors",
                self.manifest.record_count,
                self.index.len()
            )));
        }
        if self.manifest.dimension != self.index.dimension() {
            return Err(FaqError::ArtifactMismatch(format!(
                "manifest dimension {} differs from index dimension {}",
                self.manifest.dimension,
                self.index.dimension()
            )));
        }
        Ok(())
    }

    /// Reject artifacts built with a different embedding deployment or API version
    #[inline]
    pub fn ensure_provider(&self, provider: &ProviderConfig) -> Result<()> {
        let built_with = self.manifest.embedding_fingerprint();
        let configured = provider.embedding_fingerprint();
        if built_with == configured {
            Ok(())
        } else {
            Err(FaqError::ProviderMismatch {
                built_with,
                configured,
            })
        }
    }
}

fn staging_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.tmp", name))
}

/// Remove whatever staging files were written
fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (staging, _) in staged.iter().filter(|(staging, _)| staging.is_file()) {
        if let Err(e) = fs::remove_file(staging) {
            debug!("Could not remove {}: {}", staging.display(), e);
        }
    }
}
