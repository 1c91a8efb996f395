//! Store configuration with environment variable and file-based loading.
//!
//! Environment variables:
//! - `FRAGMENTS_STORE_BACKEND`: `memory` or `file`
//! - `FRAGMENTS_STORE_PATH`: Base path for the file backend
//! - `FRAGMENTS_STORE_READONLY`: Set to "true" for read-only mode
//!
//! Default path: `~/.fragments/store`

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::backend::{FileBackend, FragmentBackend, MemoryBackend};

/// Which backend implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local maps; nothing survives a restart.
    Memory,
    /// JSON metadata and raw payload files under `base_path`.
    #[default]
    File,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "file" => Ok(BackendKind::File),
            other => bail!("unknown store backend: {other} (expected memory or file)"),
        }
    }
}

/// Configuration for the fragment store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Base path for the file backend.
    /// Fragments live under `{base_path}/owners/`.
    #[serde(default = "default_store_path")]
    pub base_path: PathBuf,

    /// Read-only mode - the file backend rejects every write.
    #[serde(default)]
    pub read_only: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            base_path: default_store_path(),
            read_only: false,
        }
    }
}

/// Get the default store path (~/.fragments/store).
fn default_store_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".fragments").join("store"))
        .unwrap_or_else(|| PathBuf::from(".fragments/store"))
}

impl StoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let backend = match env::var("FRAGMENTS_STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => BackendKind::default(),
        };

        let base_path = env::var("FRAGMENTS_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_store_path());

        let read_only = env::var("FRAGMENTS_STORE_READONLY")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            backend,
            base_path,
            read_only,
        })
    }

    /// Load configuration from a TOML file, falling back to environment.
    ///
    /// The file should contain a `[store]` section:
    /// ```toml
    /// [store]
    /// backend = "file"
    /// base_path = "/srv/fragments"
    /// read_only = false
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let table: toml::Table = contents
            .parse()
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;

        if let Some(section) = table.get("store") {
            let config: StoreConfig = section
                .clone()
                .try_into()
                .context("failed to parse [store] section")?;
            Ok(config)
        } else {
            Self::from_env()
        }
    }

    /// A file-backed config rooted at `path`.
    pub fn with_base_path(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::File,
            base_path: path.into(),
            read_only: false,
        }
    }

    /// A read-only file-backed config rooted at `path`.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::File,
            base_path: path.into(),
            read_only: true,
        }
    }

    /// An in-memory config.
    pub fn in_memory() -> Self {
        Self {
            backend: BackendKind::Memory,
            ..Self::default()
        }
    }

    /// Directory holding one subdirectory per owner.
    pub fn owners_dir(&self) -> PathBuf {
        self.base_path.join("owners")
    }

    /// Open the configured backend.
    pub fn open(&self) -> Result<Arc<dyn FragmentBackend>> {
        let backend: Arc<dyn FragmentBackend> = match self.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::File => Arc::new(FileBackend::new(self.clone())?),
        };
        tracing::debug!(backend = ?self.backend, path = %self.base_path.display(), "opened fragment store");
        Ok(backend)
    }
}
