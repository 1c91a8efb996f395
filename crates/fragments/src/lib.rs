//! Owner-scoped typed content store.
//!
//! Clients hand in typed payloads ("fragments"); the store keeps the bytes
//! plus a small metadata record, and hands them back verbatim or converted
//! within the type's conversion family (Markdown to HTML, JPEG to PNG, ...).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fragments::{Fragment, StoreConfig};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! // Reads FRAGMENTS_STORE_BACKEND / FRAGMENTS_STORE_PATH
//! let backend = StoreConfig::from_env()?.open()?;
//!
//! let mut fragment = Fragment::new("owner-hash", "text/markdown")?;
//! fragment.set_data(backend.as_ref(), b"# Hello").await?;
//!
//! let loaded = Fragment::by_id(backend.as_ref(), "owner-hash", fragment.id().as_str()).await?;
//! let data = loaded.get_data(backend.as_ref()).await?;
//! let html = loaded.convert_to(&data, ".html")?;
//! assert_eq!(html, b"<h1>Hello</h1>\n");
//! # Ok(())
//! # }
//! ```
//!
//! # Layers
//!
//! - [`media`]: supported types and conversion families
//! - [`convert`]: the text and image converters
//! - [`fragment`]: the entity and its operations
//! - [`backend`]: the storage contract plus memory and file implementations

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod fragment;
pub mod id;
pub mod media;
pub mod metadata;

// Re-exports for convenience
pub use backend::{FileBackend, FragmentBackend, MemoryBackend};
pub use config::{BackendKind, StoreConfig};
pub use convert::ConversionError;
pub use error::{FragmentError, Result, ValidationError};
pub use fragment::{Fragment, FragmentBuilder};
pub use id::{FragmentId, IdError, OwnerId};
pub use media::{ContentType, MediaType, SUPPORTED_TYPES};
pub use metadata::{FragmentListing, FragmentMetadata};
