//! Storage backends for fragment metadata and payload bytes.
//!
//! Everything is keyed by `(owner, id)`; a backend never returns another
//! owner's records. Backends are last-writer-wins and do no retrying of
//! their own beyond what the underlying medium does.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use anyhow::Result;
use async_trait::async_trait;

use crate::id::{FragmentId, OwnerId};
use crate::metadata::{FragmentListing, FragmentMetadata};

/// Trait for fragment storage backends.
///
/// This allows for alternative implementations (in-memory for tests, files
/// on disk, remote object stores).
#[async_trait]
pub trait FragmentBackend: Send + Sync {
    /// Read a metadata record.
    ///
    /// Returns `Ok(None)` if the owner has no such fragment.
    async fn read_metadata(
        &self,
        owner: &OwnerId,
        id: &FragmentId,
    ) -> Result<Option<FragmentMetadata>>;

    /// Insert or replace a metadata record, keyed by its own owner and id.
    async fn write_metadata(&self, metadata: &FragmentMetadata) -> Result<()>;

    /// Read payload bytes.
    ///
    /// Returns `Ok(None)` if no payload has been written.
    async fn read_data(&self, owner: &OwnerId, id: &FragmentId) -> Result<Option<Vec<u8>>>;

    /// Insert or replace payload bytes.
    async fn write_data(&self, owner: &OwnerId, id: &FragmentId, data: &[u8]) -> Result<()>;

    /// List an owner's fragments, as ids or as full records when `expand` is set.
    async fn list(&self, owner: &OwnerId, expand: bool) -> Result<FragmentListing>;

    /// Remove metadata and payload. Removing an absent fragment succeeds.
    async fn delete(&self, owner: &OwnerId, id: &FragmentId) -> Result<()>;
}
