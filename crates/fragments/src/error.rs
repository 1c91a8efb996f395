//! Error types for fragment operations.

use thiserror::Error;

use crate::convert::ConversionError;
use crate::id::IdError;

/// Invalid or missing input when creating or updating a fragment.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("type is required")]
    MissingType,

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("ownerId is required")]
    MissingOwner,

    #[error("invalid fragment id: {0}")]
    InvalidId(#[source] IdError),

    #[error("fragment type can not be changed from {current} to {requested}")]
    TypeChanged { current: String, requested: String },
}

/// Everything a fragment operation can fail with.
///
/// Backend failures are carried through untouched so callers see the
/// storage layer's own context chain.
#[derive(Debug, Error)]
pub enum FragmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("fragment {id} not found")]
    NotFound { id: String },

    #[error(transparent)]
    UnsupportedConversion(#[from] ConversionError),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl FragmentError {
    pub(crate) fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_unsupported_conversion(&self) -> bool {
        matches!(self, Self::UnsupportedConversion(_))
    }
}

pub type Result<T, E = FragmentError> = std::result::Result<T, E>;
