//! Byte-level conversion between media types.
//!
//! Two families: text (plain, Markdown, HTML, JSON) and raster images (PNG,
//! JPEG, WebP, GIF). Callers check eligibility with
//! [`MediaType::can_convert_to`] first; combinations the engine has no
//! converter for come back as [`ConversionError::NotEligible`].

use std::io::Cursor;

use image::codecs::gif::GifEncoder;
use image::{DynamicImage, Frame};
use pulldown_cmark::{html, Options, Parser};
use thiserror::Error;

use crate::media::MediaType;

/// Why a conversion produced no output.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("unknown conversion target: {0}")]
    UnknownTarget(String),

    #[error("{from} can not be converted to {to}")]
    NotEligible { from: MediaType, to: MediaType },

    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("text payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("image conversion failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Convert `data` of type `source` into `target`.
///
/// Converting a type to itself returns the bytes untouched. The input is never
/// modified; a new buffer is always returned.
///
/// JSON to plain text is compact `serde_json` output. Numbers written as
/// floats stay floats, so `1e2` comes back as `100.0` and `1.0` stays `1.0`.
pub fn convert(
    source: MediaType,
    data: &[u8],
    target: MediaType,
) -> Result<Vec<u8>, ConversionError> {
    if source == target {
        return Ok(data.to_vec());
    }

    match (source.is_image(), target.is_image()) {
        (true, true) => convert_image(source, data, target),
        (false, false) => convert_text(source, data, target),
        _ => Err(ConversionError::NotEligible {
            from: source,
            to: target,
        }),
    }
}

fn convert_text(
    source: MediaType,
    data: &[u8],
    target: MediaType,
) -> Result<Vec<u8>, ConversionError> {
    match (source, target) {
        (MediaType::ApplicationJson, MediaType::TextPlain) => {
            let value: serde_json::Value = serde_json::from_slice(data)?;
            Ok(serde_json::to_vec(&value)?)
        }
        (MediaType::TextMarkdown | MediaType::TextHtml, MediaType::TextPlain) => {
            Ok(data.to_vec())
        }
        (MediaType::TextMarkdown, MediaType::TextHtml) => {
            let markdown = std::str::from_utf8(data)?;
            Ok(markdown_to_html(markdown).into_bytes())
        }
        _ => Err(ConversionError::NotEligible {
            from: source,
            to: target,
        }),
    }
}

/// Render CommonMark (plus tables and strikethrough) to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn convert_image(
    source: MediaType,
    data: &[u8],
    target: MediaType,
) -> Result<Vec<u8>, ConversionError> {
    let (Some(source_format), Some(target_format)) = (source.image_format(), target.image_format())
    else {
        return Err(ConversionError::NotEligible {
            from: source,
            to: target,
        });
    };

    let decoded = image::load_from_memory_with_format(data, source_format)?;
    let mut out = Cursor::new(Vec::new());

    match target {
        // JPEG has no alpha channel
        MediaType::ImageJpeg => {
            DynamicImage::ImageRgb8(decoded.to_rgb8()).write_to(&mut out, target_format)?
        }
        // WebP encoding is lossless and only takes 8-bit RGB(A)
        MediaType::ImageWebp => {
            DynamicImage::ImageRgba8(decoded.to_rgba8()).write_to(&mut out, target_format)?
        }
        MediaType::ImageGif => {
            let mut encoder = GifEncoder::new(&mut out);
            encoder.encode_frame(Frame::new(decoded.to_rgba8()))?;
        }
        _ => decoded.write_to(&mut out, target_format)?,
    }

    Ok(out.into_inner())
}
