//! Supported content types and their conversion families.
//!
//! A fragment is created with a full Content-Type value (`text/plain;
//! charset=utf-8`). Acceptance is an exact match against [`SUPPORTED_TYPES`];
//! everything after that works on the base media type, modelled as the closed
//! [`MediaType`] enum.

use std::fmt;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Content-Type values a fragment may be created with.
pub const SUPPORTED_TYPES: &[&str] = &[
    "text/plain",
    "text/plain; charset=utf-8",
    "text/markdown",
    "text/html",
    "application/json",
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/gif",
];

/// Exact membership test against [`SUPPORTED_TYPES`].
pub fn is_supported_type(value: &str) -> bool {
    SUPPORTED_TYPES.contains(&value)
}

/// Strip parameters from a Content-Type value.
///
/// `"text/html; charset=utf-8"` -> `"text/html"`
pub fn base_media_type(value: &str) -> &str {
    value.split(';').next().unwrap_or_default().trim()
}

/// Base media types known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "text/plain")]
    TextPlain,
    #[serde(rename = "text/markdown")]
    TextMarkdown,
    #[serde(rename = "text/html")]
    TextHtml,
    #[serde(rename = "application/json")]
    ApplicationJson,
    #[serde(rename = "image/png")]
    ImagePng,
    #[serde(rename = "image/jpeg")]
    ImageJpeg,
    #[serde(rename = "image/webp")]
    ImageWebp,
    #[serde(rename = "image/gif")]
    ImageGif,
}

const PLAIN_FAMILY: &[MediaType] = &[MediaType::TextPlain];
const MARKDOWN_FAMILY: &[MediaType] = &[
    MediaType::TextMarkdown,
    MediaType::TextHtml,
    MediaType::TextPlain,
];
const HTML_FAMILY: &[MediaType] = &[MediaType::TextHtml, MediaType::TextPlain];
const JSON_FAMILY: &[MediaType] = &[MediaType::ApplicationJson, MediaType::TextPlain];
const IMAGE_FAMILY: &[MediaType] = &[
    MediaType::ImagePng,
    MediaType::ImageJpeg,
    MediaType::ImageWebp,
    MediaType::ImageGif,
];

impl MediaType {
    pub const ALL: [MediaType; 8] = [
        MediaType::TextPlain,
        MediaType::TextMarkdown,
        MediaType::TextHtml,
        MediaType::ApplicationJson,
        MediaType::ImagePng,
        MediaType::ImageJpeg,
        MediaType::ImageWebp,
        MediaType::ImageGif,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::TextPlain => "text/plain",
            MediaType::TextMarkdown => "text/markdown",
            MediaType::TextHtml => "text/html",
            MediaType::ApplicationJson => "application/json",
            MediaType::ImagePng => "image/png",
            MediaType::ImageJpeg => "image/jpeg",
            MediaType::ImageWebp => "image/webp",
            MediaType::ImageGif => "image/gif",
        }
    }

    /// Look up a base media type (no parameters). Case-insensitive.
    pub fn from_mime(base: &str) -> Option<Self> {
        let base = base.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(base))
    }

    /// Look up a file extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(MediaType::TextPlain),
            "md" => Some(MediaType::TextMarkdown),
            "html" => Some(MediaType::TextHtml),
            "json" => Some(MediaType::ApplicationJson),
            "png" => Some(MediaType::ImagePng),
            "jpg" | "jpeg" => Some(MediaType::ImageJpeg),
            "webp" => Some(MediaType::ImageWebp),
            "gif" => Some(MediaType::ImageGif),
            _ => None,
        }
    }

    /// Canonical extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::TextPlain => "txt",
            MediaType::TextMarkdown => "md",
            MediaType::TextHtml => "html",
            MediaType::ApplicationJson => "json",
            MediaType::ImagePng => "png",
            MediaType::ImageJpeg => "jpg",
            MediaType::ImageWebp => "webp",
            MediaType::ImageGif => "gif",
        }
    }

    /// Types this one may be converted into, itself included.
    pub fn eligible_targets(&self) -> &'static [MediaType] {
        match self {
            MediaType::TextPlain => PLAIN_FAMILY,
            MediaType::TextMarkdown => MARKDOWN_FAMILY,
            MediaType::TextHtml => HTML_FAMILY,
            MediaType::ApplicationJson => JSON_FAMILY,
            MediaType::ImagePng
            | MediaType::ImageJpeg
            | MediaType::ImageWebp
            | MediaType::ImageGif => IMAGE_FAMILY,
        }
    }

    pub fn can_convert_to(&self, target: MediaType) -> bool {
        self.eligible_targets().contains(&target)
    }

    /// True for `text/*` types.
    pub fn is_text(&self) -> bool {
        self.as_str().starts_with("text/")
    }

    pub fn is_json(&self) -> bool {
        matches!(self, MediaType::ApplicationJson)
    }

    pub fn is_image(&self) -> bool {
        self.image_format().is_some()
    }

    /// Codec used to decode/encode this type, for image types.
    pub fn image_format(&self) -> Option<ImageFormat> {
        match self {
            MediaType::ImagePng => Some(ImageFormat::Png),
            MediaType::ImageJpeg => Some(ImageFormat::Jpeg),
            MediaType::ImageWebp => Some(ImageFormat::WebP),
            MediaType::ImageGif => Some(ImageFormat::Gif),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Eligible targets for a base media type string.
///
/// Unknown types have no targets.
pub fn eligible_targets(base: &str) -> &'static [MediaType] {
    MediaType::from_mime(base)
        .map(|t| t.eligible_targets())
        .unwrap_or_default()
}

/// Resolve a requested conversion target.
///
/// Accepts an extension (`html`, `.html`) or a media type (`text/html`).
/// Returns `None` for anything unrecognized.
pub fn resolve_target(requested: &str) -> Option<MediaType> {
    let requested = requested.trim();
    if requested.contains('/') {
        MediaType::from_mime(base_media_type(requested))
    } else {
        MediaType::from_extension(requested)
    }
}

/// A validated Content-Type value: the raw string plus its base media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct ContentType {
    raw: String,
    media: MediaType,
}

impl ContentType {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingType);
        }
        if !is_supported_type(value) {
            return Err(ValidationError::UnsupportedType(value.to_string()));
        }
        let media = MediaType::from_mime(base_media_type(value))
            .ok_or_else(|| ValidationError::UnsupportedType(value.to_string()))?;
        Ok(Self {
            raw: value.to_string(),
            media,
        })
    }

    /// The full value, parameters included.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn media_type(&self) -> MediaType {
        self.media
    }
}

impl From<ContentType> for String {
    fn from(value: ContentType) -> Self {
        value.raw
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_types_are_exact() {
        for value in SUPPORTED_TYPES {
            assert!(is_supported_type(value), "{value} should be supported");
        }
        assert!(!is_supported_type("text/plain;charset=utf-8"));
        assert!(!is_supported_type("text/plain; charset=iso-8859-1"));
        assert!(!is_supported_type("application/xml"));
        assert!(!is_supported_type(""));
    }

    #[test]
    fn test_base_media_type_strips_parameters() {
        assert_eq!(base_media_type("text/plain; charset=utf-8"), "text/plain");
        assert_eq!(base_media_type("image/png"), "image/png");
        assert_eq!(base_media_type(""), "");
    }

    #[test]
    fn test_every_supported_type_has_a_media_type() {
        for value in SUPPORTED_TYPES {
            let ct = ContentType::parse(value).unwrap();
            assert_eq!(ct.media_type().as_str(), base_media_type(value));
        }
    }

    #[test]
    fn test_families_include_self() {
        for t in MediaType::ALL {
            assert!(t.can_convert_to(t), "{t} should convert to itself");
        }
    }

    #[test]
    fn test_family_table() {
        use MediaType::*;
        assert_eq!(TextPlain.eligible_targets(), &[TextPlain]);
        assert_eq!(
            TextMarkdown.eligible_targets(),
            &[TextMarkdown, TextHtml, TextPlain]
        );
        assert_eq!(TextHtml.eligible_targets(), &[TextHtml, TextPlain]);
        assert_eq!(ApplicationJson.eligible_targets(), &[ApplicationJson, TextPlain]);
        for image in [ImagePng, ImageJpeg, ImageWebp, ImageGif] {
            assert_eq!(
                image.eligible_targets(),
                &[ImagePng, ImageJpeg, ImageWebp, ImageGif]
            );
        }
    }

    #[test]
    fn test_eligible_targets_by_string() {
        assert_eq!(eligible_targets("text/html").len(), 2);
        assert!(eligible_targets("application/xml").is_empty());
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(MediaType::from_extension(".txt"), Some(MediaType::TextPlain));
        assert_eq!(MediaType::from_extension("md"), Some(MediaType::TextMarkdown));
        assert_eq!(MediaType::from_extension(".HTML"), Some(MediaType::TextHtml));
        assert_eq!(MediaType::from_extension(".json"), Some(MediaType::ApplicationJson));
        assert_eq!(MediaType::from_extension(".png"), Some(MediaType::ImagePng));
        assert_eq!(MediaType::from_extension(".jpg"), Some(MediaType::ImageJpeg));
        assert_eq!(MediaType::from_extension(".jpeg"), Some(MediaType::ImageJpeg));
        assert_eq!(MediaType::from_extension(".webp"), Some(MediaType::ImageWebp));
        assert_eq!(MediaType::from_extension(".gif"), Some(MediaType::ImageGif));
        assert_eq!(MediaType::from_extension(".exe"), None);
        assert_eq!(MediaType::from_extension(""), None);
    }

    #[test]
    fn test_resolve_target_accepts_types_and_extensions() {
        assert_eq!(resolve_target("html"), Some(MediaType::TextHtml));
        assert_eq!(resolve_target("text/html"), Some(MediaType::TextHtml));
        assert_eq!(
            resolve_target("text/plain; charset=utf-8"),
            Some(MediaType::TextPlain)
        );
        assert_eq!(resolve_target("text/csv"), None);
        assert_eq!(resolve_target(".bogus"), None);
    }

    #[test]
    fn test_classification() {
        assert!(MediaType::TextMarkdown.is_text());
        assert!(!MediaType::ApplicationJson.is_text());
        assert!(MediaType::ApplicationJson.is_json());
        assert!(MediaType::ImageWebp.is_image());
        assert!(!MediaType::TextHtml.is_image());
    }

    #[test]
    fn test_content_type_parse_errors() {
        assert!(matches!(
            ContentType::parse(""),
            Err(ValidationError::MissingType)
        ));
        assert!(matches!(
            ContentType::parse("audio/wav"),
            Err(ValidationError::UnsupportedType(t)) if t == "audio/wav"
        ));
    }

    #[test]
    fn test_content_type_serializes_as_raw_string() {
        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(
            serde_json::to_string(&ct).unwrap(),
            "\"text/plain; charset=utf-8\""
        );
    }
}
