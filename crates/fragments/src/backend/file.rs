//! FileBackend: fragments on the local filesystem.
//!
//! Layout:
//! ```text
//! {base_path}/
//! └── owners/
//!     └── 3f9a.../            # OwnerId::storage_key()
//!         ├── metadata/
//!         │   └── {id}.json   # FragmentMetadata
//!         └── data/
//!             └── {id}        # raw payload
//! ```
//!
//! Writes go to a hidden temp file in the same directory and are renamed into
//! place, so readers never see a half-written file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use super::FragmentBackend;
use crate::config::StoreConfig;
use crate::id::{FragmentId, OwnerId};
use crate::metadata::{FragmentListing, FragmentMetadata};

/// Filesystem-based fragment backend.
#[derive(Debug, Clone)]
pub struct FileBackend {
    config: StoreConfig,
}

impl FileBackend {
    /// Create a new FileBackend with the given configuration.
    ///
    /// Creates the owners directory if it doesn't exist (unless in read-only
    /// mode).
    pub fn new(config: StoreConfig) -> Result<Self> {
        if !config.read_only {
            std::fs::create_dir_all(config.owners_dir())
                .context("failed to create fragment owners directory")?;
        }

        Ok(Self { config })
    }

    /// Create a FileBackend at a specific path.
    pub fn at_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(StoreConfig::with_base_path(path))
    }

    /// Create a read-only FileBackend at a specific path.
    pub fn read_only_at(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(StoreConfig::read_only(path))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn owner_dir(&self, owner: &OwnerId) -> PathBuf {
        self.config.owners_dir().join(owner.storage_key())
    }

    fn metadata_dir(&self, owner: &OwnerId) -> PathBuf {
        self.owner_dir(owner).join("metadata")
    }

    fn metadata_path(&self, owner: &OwnerId, id: &FragmentId) -> PathBuf {
        self.metadata_dir(owner).join(format!("{}.json", id))
    }

    fn data_path(&self, owner: &OwnerId, id: &FragmentId) -> PathBuf {
        self.owner_dir(owner).join("data").join(id.as_str())
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.config.read_only {
            anyhow::bail!("fragment store is in read-only mode");
        }
        Ok(())
    }

    async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    async fn remove_if_exists(path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }

    /// Write `bytes` to a temp file next to `path`, then rename over it.
    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = path
            .parent()
            .context("fragment path has no parent directory")?;
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("fragment path has no file name")?;
        let staging = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        fs::write(&staging, bytes)
            .await
            .context("failed to write staging file")?;

        if let Err(e) = fs::rename(&staging, path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e).context("failed to move staging file into place");
        }
        Ok(())
    }

    async fn list_ids(&self, owner: &OwnerId) -> Result<Vec<FragmentId>> {
        let dir = self.metadata_dir(owner);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to list {}", dir.display()))
            }
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .context("failed to read metadata directory entry")?
        {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            // Staging files start with '.', which never parses as an id
            if let Ok(id) = FragmentId::from_str_checked(stem) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl FragmentBackend for FileBackend {
    async fn read_metadata(
        &self,
        owner: &OwnerId,
        id: &FragmentId,
    ) -> Result<Option<FragmentMetadata>> {
        let path = self.metadata_path(owner, id);
        let Some(json) = Self::read_if_exists(&path).await? else {
            return Ok(None);
        };

        let metadata: FragmentMetadata = serde_json::from_slice(&json)
            .with_context(|| format!("failed to parse metadata {}", path.display()))?;
        Ok(Some(metadata))
    }

    async fn write_metadata(&self, metadata: &FragmentMetadata) -> Result<()> {
        self.ensure_writable()?;

        let path = self.metadata_path(&metadata.owner_id, &metadata.id);
        let json = serde_json::to_vec_pretty(metadata).context("failed to serialize metadata")?;
        Self::write_atomic(&path, &json).await?;

        debug!(id = %metadata.id, path = %path.display(), "wrote metadata");
        Ok(())
    }

    async fn read_data(&self, owner: &OwnerId, id: &FragmentId) -> Result<Option<Vec<u8>>> {
        Self::read_if_exists(&self.data_path(owner, id)).await
    }

    async fn write_data(&self, owner: &OwnerId, id: &FragmentId, data: &[u8]) -> Result<()> {
        self.ensure_writable()?;

        let path = self.data_path(owner, id);
        Self::write_atomic(&path, data).await?;

        debug!(%id, bytes = data.len(), "wrote data");
        Ok(())
    }

    async fn list(&self, owner: &OwnerId, expand: bool) -> Result<FragmentListing> {
        let ids = self.list_ids(owner).await?;
        if !expand {
            return Ok(FragmentListing::Ids(ids));
        }

        let mut records = Vec::with_capacity(ids.len());
        for id in &ids {
            // A concurrent delete may remove a record between listing and reading
            if let Some(record) = self.read_metadata(owner, id).await? {
                records.push(record);
            }
        }
        Ok(FragmentListing::Expanded(records))
    }

    async fn delete(&self, owner: &OwnerId, id: &FragmentId) -> Result<()> {
        self.ensure_writable()?;

        let removed_meta = Self::remove_if_exists(&self.metadata_path(owner, id)).await?;
        let removed_data = Self::remove_if_exists(&self.data_path(owner, id)).await?;

        if !removed_meta && !removed_data {
            debug!(%id, "delete of absent fragment");
        }
        Ok(())
    }
}
