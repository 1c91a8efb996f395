//! The fragment entity: validated metadata plus the operations on it.
//!
//! A `Fragment` holds no payload bytes. Data goes straight through to the
//! backend on every call, so reads always reflect the backend's current state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::backend::FragmentBackend;
use crate::convert::{self, ConversionError};
use crate::error::{FragmentError, Result, ValidationError};
use crate::id::{FragmentId, OwnerId};
use crate::media::{self, ContentType, MediaType};
use crate::metadata::{FragmentListing, FragmentMetadata};

/// One owner-scoped stored item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    id: FragmentId,
    owner_id: OwnerId,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    #[serde(rename = "type")]
    content_type: ContentType,
    size: u64,
}

/// Builder for fragments with optional id, timestamps and size.
#[derive(Debug, Clone)]
pub struct FragmentBuilder {
    owner_id: String,
    content_type: String,
    id: Option<String>,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    size: u64,
}

impl FragmentBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Validate and build. Nothing is written to any backend.
    pub fn build(self) -> Result<Fragment> {
        let content_type = ContentType::parse(&self.content_type)?;
        let owner_id = OwnerId::new(self.owner_id).map_err(|_| ValidationError::MissingOwner)?;
        let id = match self.id {
            Some(id) => FragmentId::from_str_checked(&id).map_err(ValidationError::InvalidId)?,
            None => FragmentId::new(),
        };

        let now = Utc::now();
        let fragment = Fragment {
            id,
            owner_id,
            created: self.created.unwrap_or(now),
            updated: self.updated.unwrap_or(now),
            content_type,
            size: self.size,
        };
        debug!(fragment = ?fragment, "constructed fragment");
        Ok(fragment)
    }
}

impl Fragment {
    /// Start building a fragment for `owner_id` with Content-Type `content_type`.
    pub fn builder(owner_id: impl Into<String>, content_type: impl Into<String>) -> FragmentBuilder {
        FragmentBuilder {
            owner_id: owner_id.into(),
            content_type: content_type.into(),
            id: None,
            created: None,
            updated: None,
            size: 0,
        }
    }

    /// A new fragment with a fresh id, current timestamps and size 0.
    pub fn new(owner_id: impl Into<String>, content_type: impl Into<String>) -> Result<Self> {
        Self::builder(owner_id, content_type).build()
    }

    /// Rebuild a fragment from a stored record, re-validating it.
    pub fn from_metadata(record: FragmentMetadata) -> Result<Self> {
        Self::builder(record.owner_id.as_str(), record.content_type)
            .id(record.id.into_inner())
            .created(record.created)
            .updated(record.updated)
            .size(record.size)
            .build()
    }

    /// All of an owner's fragments: ids, or full records when `expand` is set.
    #[instrument(skip(backend))]
    pub async fn by_owner(
        backend: &dyn FragmentBackend,
        owner_id: &str,
        expand: bool,
    ) -> Result<FragmentListing> {
        let owner = parse_owner(owner_id)?;
        Ok(backend.list(&owner, expand).await?)
    }

    /// Load one fragment.
    ///
    /// Fails with `NotFound` carrying `id` when the owner has no such fragment,
    /// including when `id` could never name a fragment.
    #[instrument(skip(backend))]
    pub async fn by_id(backend: &dyn FragmentBackend, owner_id: &str, id: &str) -> Result<Self> {
        let owner = parse_owner(owner_id)?;
        let fragment_id = FragmentId::from_str_checked(id).map_err(|_| FragmentError::not_found(id))?;

        let record = backend
            .read_metadata(&owner, &fragment_id)
            .await?
            .ok_or_else(|| FragmentError::not_found(id))?;

        Self::from_metadata(record)
    }

    /// Remove a fragment's metadata and data.
    ///
    /// Whether removing an absent fragment is an error is up to the backend.
    #[instrument(skip(backend))]
    pub async fn delete(backend: &dyn FragmentBackend, owner_id: &str, id: &str) -> Result<()> {
        let owner = parse_owner(owner_id)?;
        let fragment_id = FragmentId::from_str_checked(id).map_err(|_| FragmentError::not_found(id))?;

        backend.delete(&owner, &fragment_id).await?;
        info!("fragment deleted");
        Ok(())
    }

    /// Refresh `updated` and persist the metadata record. Payload is untouched.
    #[instrument(skip(self, backend), fields(owner = %self.owner_id, id = %self.id))]
    pub async fn save(&mut self, backend: &dyn FragmentBackend) -> Result<()> {
        // Never move backwards, even if the wall clock does
        self.updated = Utc::now().max(self.updated);
        backend.write_metadata(&self.metadata()).await?;
        Ok(())
    }

    /// The raw payload bytes.
    #[instrument(skip(self, backend), fields(owner = %self.owner_id, id = %self.id))]
    pub async fn get_data(&self, backend: &dyn FragmentBackend) -> Result<Vec<u8>> {
        backend
            .read_data(&self.owner_id, &self.id)
            .await?
            .ok_or_else(|| FragmentError::not_found(self.id.as_str()))
    }

    /// Replace the payload: update size, persist metadata, then persist bytes.
    ///
    /// If the payload write fails, the backend's previous metadata record is
    /// put back (or removed, when there was none) and the payload write's
    /// error is returned.
    #[instrument(skip(self, backend, data), fields(owner = %self.owner_id, id = %self.id, bytes = data.len()))]
    pub async fn set_data(&mut self, backend: &dyn FragmentBackend, data: &[u8]) -> Result<()> {
        let previous = self.metadata();
        let stored = backend.read_metadata(&self.owner_id, &self.id).await?;

        self.size = data.len() as u64;
        if let Err(err) = self.save(backend).await {
            self.size = previous.size;
            self.updated = previous.updated;
            return Err(err);
        }

        if let Err(err) = backend.write_data(&self.owner_id, &self.id, data).await {
            warn!(error = %err, "payload write failed, restoring metadata");
            let rollback = match &stored {
                Some(record) => backend.write_metadata(record).await,
                None => backend.delete(&self.owner_id, &self.id).await,
            };
            if let Err(rollback_err) = rollback {
                warn!(error = %rollback_err, "metadata rollback failed");
            }

            self.size = previous.size;
            self.updated = previous.updated;
            return Err(err.into());
        }

        info!(size = self.size, "fragment data set");
        Ok(())
    }

    /// Replace the payload, requiring `content_type` to match the stored type.
    ///
    /// A fragment's type can't change; a mismatch is a validation error and
    /// leaves the stored data alone.
    pub async fn replace_data(
        &mut self,
        backend: &dyn FragmentBackend,
        content_type: &str,
        data: &[u8],
    ) -> Result<()> {
        if content_type != self.content_type.as_str() {
            return Err(ValidationError::TypeChanged {
                current: self.content_type.to_string(),
                requested: content_type.to_string(),
            }
            .into());
        }
        self.set_data(backend, data).await
    }

    /// Convert `data` (this fragment's payload) to the requested format.
    ///
    /// `target` is an extension (`html`, `.png`) or a media type (`text/html`).
    pub fn convert_to(&self, data: &[u8], target: &str) -> Result<Vec<u8>> {
        let target_type = media::resolve_target(target)
            .ok_or_else(|| ConversionError::UnknownTarget(target.to_string()))?;

        let source = self.media_type();
        if !source.can_convert_to(target_type) {
            return Err(ConversionError::NotEligible {
                from: source,
                to: target_type,
            }
            .into());
        }

        Ok(convert::convert(source, data, target_type)?)
    }

    /// Read the payload, converting it when a target is given.
    ///
    /// Returns the media type of the bytes handed back.
    pub async fn data_as(
        &self,
        backend: &dyn FragmentBackend,
        target: Option<&str>,
    ) -> Result<(MediaType, Vec<u8>)> {
        let data = self.get_data(backend).await?;
        match target {
            None => Ok((self.media_type(), data)),
            Some(target) => {
                let converted = self.convert_to(&data, target)?;
                let media_type = media::resolve_target(target).unwrap_or(self.media_type());
                Ok((media_type, converted))
            }
        }
    }

    /// The metadata record for this fragment.
    pub fn metadata(&self) -> FragmentMetadata {
        FragmentMetadata {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            created: self.created,
            updated: self.updated,
            content_type: self.content_type.to_string(),
            size: self.size,
        }
    }

    pub fn id(&self) -> &FragmentId {
        &self.id
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    /// The full Content-Type value, parameters included.
    pub fn content_type(&self) -> &str {
        self.content_type.as_str()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn media_type(&self) -> MediaType {
        self.content_type.media_type()
    }

    /// The base media type: `"text/html; charset=utf-8"` -> `"text/html"`.
    pub fn mime_type(&self) -> &'static str {
        self.media_type().as_str()
    }

    /// True for `text/*` fragments.
    pub fn is_text(&self) -> bool {
        self.media_type().is_text()
    }

    pub fn is_json(&self) -> bool {
        self.media_type().is_json()
    }

    /// Media types this fragment can be converted into.
    pub fn eligible_formats(&self) -> &'static [MediaType] {
        self.media_type().eligible_targets()
    }
}

fn parse_owner(owner_id: &str) -> Result<OwnerId> {
    OwnerId::new(owner_id).map_err(|_| ValidationError::MissingOwner.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::media::SUPPORTED_TYPES;
    use chrono::Duration;

    const OWNER: &str = "1234567890abcdef";

    #[test]
    fn test_every_supported_type_constructs() {
        for value in SUPPORTED_TYPES {
            let fragment = Fragment::new(OWNER, *value).unwrap();
            assert_eq!(fragment.content_type(), *value);
            assert_eq!(fragment.mime_type(), media::base_media_type(value));
        }
    }

    #[test]
    fn test_mime_type_strips_charset() {
        let fragment = Fragment::new(OWNER, "text/plain; charset=utf-8").unwrap();
        assert_eq!(fragment.mime_type(), "text/plain");
        assert!(fragment.is_text());
        assert!(!fragment.is_json());
    }

    #[test]
    fn test_unsupported_types_fail() {
        for value in ["application/msword", "audio/wav", "text/csv", "text/plain;charset=utf-8"] {
            let err = Fragment::new(OWNER, value).unwrap_err();
            assert!(
                matches!(err, FragmentError::Validation(ValidationError::UnsupportedType(_))),
                "{value} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_missing_type_and_owner() {
        assert!(matches!(
            Fragment::new(OWNER, "").unwrap_err(),
            FragmentError::Validation(ValidationError::MissingType)
        ));
        assert!(matches!(
            Fragment::new("", "text/plain").unwrap_err(),
            FragmentError::Validation(ValidationError::MissingOwner)
        ));
    }

    #[test]
    fn test_invalid_supplied_id() {
        let err = Fragment::builder(OWNER, "text/plain")
            .id("../../etc/passwd")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            FragmentError::Validation(ValidationError::InvalidId(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let fragment = Fragment::new(OWNER, "text/plain").unwrap();
        assert_eq!(fragment.size(), 0);
        assert_eq!(fragment.created(), fragment.updated());
        assert_eq!(fragment.owner_id().as_str(), OWNER);
        assert_ne!(fragment.id(), Fragment::new(OWNER, "text/plain").unwrap().id());
    }

    #[test]
    fn test_builder_keeps_supplied_fields() {
        let created = Utc::now() - Duration::days(1);
        let fragment = Fragment::builder(OWNER, "text/markdown")
            .id("my-id")
            .created(created)
            .updated(created)
            .size(42)
            .build()
            .unwrap();
        assert_eq!(fragment.id().as_str(), "my-id");
        assert_eq!(fragment.created(), created);
        assert_eq!(fragment.size(), 42);
    }

    #[test]
    fn test_eligible_formats() {
        let md = Fragment::new(OWNER, "text/markdown").unwrap();
        assert_eq!(
            md.eligible_formats(),
            &[MediaType::TextMarkdown, MediaType::TextHtml, MediaType::TextPlain]
        );
        let gif = Fragment::new(OWNER, "image/gif").unwrap();
        assert_eq!(gif.eligible_formats().len(), 4);
    }

    #[test]
    fn test_serializes_like_metadata() {
        let fragment = Fragment::new(OWNER, "text/plain; charset=utf-8").unwrap();
        let json = serde_json::to_value(&fragment).unwrap();
        assert_eq!(json, serde_json::to_value(fragment.metadata()).unwrap());
    }

    #[test]
    fn test_convert_to_rejects_ineligible_and_unknown() {
        let plain = Fragment::new(OWNER, "text/plain").unwrap();
        let err = plain.convert_to(b"hi", ".html").unwrap_err();
        assert!(matches!(
            err,
            FragmentError::UnsupportedConversion(ConversionError::NotEligible { .. })
        ));

        let err = plain.convert_to(b"hi", ".exe").unwrap_err();
        assert!(matches!(
            err,
            FragmentError::UnsupportedConversion(ConversionError::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_convert_to_by_extension_and_type() {
        let md = Fragment::new(OWNER, "text/markdown").unwrap();
        assert_eq!(md.convert_to(b"# Title", "html").unwrap(), b"<h1>Title</h1>\n");
        assert_eq!(md.convert_to(b"# Title", "text/html").unwrap(), b"<h1>Title</h1>\n");
        assert_eq!(md.convert_to(b"# Title", ".md").unwrap(), b"# Title");
    }

    #[tokio::test]
    async fn test_save_advances_updated() {
        let backend = MemoryBackend::new();
        let mut fragment = Fragment::new(OWNER, "text/plain").unwrap();
        let before = fragment.updated();

        fragment.save(&backend).await.unwrap();
        assert!(fragment.updated() >= before);
    }

    #[tokio::test]
    async fn test_save_never_moves_updated_backwards() {
        let backend = MemoryBackend::new();
        let future = Utc::now() + Duration::hours(1);
        let mut fragment = Fragment::builder(OWNER, "text/plain")
            .updated(future)
            .build()
            .unwrap();

        fragment.save(&backend).await.unwrap();
        assert_eq!(fragment.updated(), future);
    }

    #[tokio::test]
    async fn test_set_data_updates_size_and_round_trips() {
        let backend = MemoryBackend::new();
        let mut fragment = Fragment::new(OWNER, "text/plain").unwrap();

        fragment.set_data(&backend, b"hello").await.unwrap();
        assert_eq!(fragment.size(), 5);
        assert_eq!(fragment.get_data(&backend).await.unwrap(), b"hello");

        let stored = Fragment::by_id(&backend, OWNER, fragment.id().as_str())
            .await
            .unwrap();
        assert_eq!(stored.size(), 5);
    }

    #[tokio::test]
    async fn test_get_data_without_payload_is_not_found() {
        let backend = MemoryBackend::new();
        let mut fragment = Fragment::new(OWNER, "text/plain").unwrap();
        fragment.save(&backend).await.unwrap();

        let err = fragment.get_data(&backend).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_replace_data_rejects_type_change() {
        let backend = MemoryBackend::new();
        let mut fragment = Fragment::new(OWNER, "text/plain").unwrap();
        fragment.set_data(&backend, b"original").await.unwrap();

        let err = fragment
            .replace_data(&backend, "text/markdown", b"# changed")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FragmentError::Validation(ValidationError::TypeChanged { .. })
        ));
        assert_eq!(fragment.get_data(&backend).await.unwrap(), b"original");

        fragment
            .replace_data(&backend, "text/plain", b"updated")
            .await
            .unwrap();
        assert_eq!(fragment.get_data(&backend).await.unwrap(), b"updated");
        assert_eq!(fragment.size(), 7);
    }

    #[tokio::test]
    async fn test_by_id_invalid_id_is_not_found() {
        let backend = MemoryBackend::new();
        let err = Fragment::by_id(&backend, OWNER, "no/such/id").await.unwrap_err();
        match err {
            FragmentError::NotFound { id } => assert_eq!(id, "no/such/id"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_data_as() {
        let backend = MemoryBackend::new();
        let mut fragment = Fragment::new(OWNER, "application/json").unwrap();
        fragment.set_data(&backend, br#"{ "a": 1 }"#).await.unwrap();

        let (media_type, raw) = fragment.data_as(&backend, None).await.unwrap();
        assert_eq!(media_type, MediaType::ApplicationJson);
        assert_eq!(raw, br#"{ "a": 1 }"#);

        let (media_type, text) = fragment.data_as(&backend, Some(".txt")).await.unwrap();
        assert_eq!(media_type, MediaType::TextPlain);
        assert_eq!(text, br#"{"a":1}"#);
    }
}
