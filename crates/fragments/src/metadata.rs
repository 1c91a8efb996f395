//! Metadata records as persisted by a backend.
//!
//! The record is what the backend stores next to the payload bytes. Field
//! names follow the JSON shape clients already see (`ownerId`, `type`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{FragmentId, OwnerId};

/// Persisted metadata for one fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FragmentMetadata {
    pub id: FragmentId,

    pub owner_id: OwnerId,

    pub created: DateTime<Utc>,

    pub updated: DateTime<Utc>,

    /// Full Content-Type value, parameters included.
    #[serde(rename = "type")]
    pub content_type: String,

    /// Payload size in bytes.
    pub size: u64,
}

/// Result of listing an owner's fragments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FragmentListing {
    /// Just the ids.
    Ids(Vec<FragmentId>),

    /// Full metadata records.
    Expanded(Vec<FragmentMetadata>),
}

impl FragmentListing {
    pub fn len(&self) -> usize {
        match self {
            FragmentListing::Ids(ids) => ids.len(),
            FragmentListing::Expanded(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in listing order, whichever form this is.
    pub fn ids(&self) -> Vec<&FragmentId> {
        match self {
            FragmentListing::Ids(ids) => ids.iter().collect(),
            FragmentListing::Expanded(records) => records.iter().map(|r| &r.id).collect(),
        }
    }
}
