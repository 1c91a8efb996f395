//! In-memory backend (map-backed, nothing persisted).

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::FragmentBackend;
use crate::id::{FragmentId, OwnerId};
use crate::metadata::{FragmentListing, FragmentMetadata};

type OwnerMap<T> = HashMap<OwnerId, BTreeMap<FragmentId, T>>;

/// Metadata and payloads held in two owner-scoped maps.
///
/// Listing order is id order.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    metadata: RwLock<OwnerMap<FragmentMetadata>>,
    data: RwLock<OwnerMap<Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of metadata records held for `owner`.
    #[cfg(test)]
    async fn count(&self, owner: &OwnerId) -> usize {
        self.metadata
            .read()
            .await
            .get(owner)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl FragmentBackend for MemoryBackend {
    async fn read_metadata(
        &self,
        owner: &OwnerId,
        id: &FragmentId,
    ) -> Result<Option<FragmentMetadata>> {
        let metadata = self.metadata.read().await;
        Ok(metadata.get(owner).and_then(|m| m.get(id)).cloned())
    }

    async fn write_metadata(&self, record: &FragmentMetadata) -> Result<()> {
        let mut metadata = self.metadata.write().await;
        metadata
            .entry(record.owner_id.clone())
            .or_default()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn read_data(&self, owner: &OwnerId, id: &FragmentId) -> Result<Option<Vec<u8>>> {
        let data = self.data.read().await;
        Ok(data.get(owner).and_then(|m| m.get(id)).cloned())
    }

    async fn write_data(&self, owner: &OwnerId, id: &FragmentId, bytes: &[u8]) -> Result<()> {
        let mut data = self.data.write().await;
        data.entry(owner.clone())
            .or_default()
            .insert(id.clone(), bytes.to_vec());
        Ok(())
    }

    async fn list(&self, owner: &OwnerId, expand: bool) -> Result<FragmentListing> {
        let metadata = self.metadata.read().await;
        let records = metadata.get(owner);

        let listing = if expand {
            FragmentListing::Expanded(
                records
                    .map(|m| m.values().cloned().collect())
                    .unwrap_or_default(),
            )
        } else {
            FragmentListing::Ids(
                records
                    .map(|m| m.keys().cloned().collect())
                    .unwrap_or_default(),
            )
        };
        Ok(listing)
    }

    async fn delete(&self, owner: &OwnerId, id: &FragmentId) -> Result<()> {
        let removed_meta = self
            .metadata
            .write()
            .await
            .get_mut(owner)
            .and_then(|m| m.remove(id))
            .is_some();
        let removed_data = self
            .data
            .write()
            .await
            .get_mut(owner)
            .and_then(|m| m.remove(id))
            .is_some();

        if !removed_meta && !removed_data {
            debug!(%id, "delete of absent fragment");
        }
        Ok(())
    }
}
