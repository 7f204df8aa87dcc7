// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image validation and normalization ahead of captioning
//!
//! Uploads pass through three checks before any model sees them:
//! the filename extension allow-list, magic-byte sniffing, and a full decode.
//! The full decode is authoritative: `validate` only returns true for bytes
//! that `normalize` will also accept.

use std::path::Path;

use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, RgbImage};
use thiserror::Error;

/// Extensions accepted for uploads (lowercase, without the dot)
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif"];

/// Default bound for normalized images
pub const DEFAULT_MAX_DIMENSIONS: (u32, u32) = (2048, 2048);

/// Default maximum upload size (10MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Corrupted image data")]
    CorruptedData,

    #[error("Failed to read image file: {0}")]
    Io(#[from] std::io::Error),
}

/// Image information extracted during loading
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Color mode of the source ("RGB", "RGBA", "L", ...)
    pub color_mode: &'static str,
    /// Detected format, when known
    pub format: Option<ImageFormat>,
    /// Size in bytes, when loaded from bytes
    pub size_bytes: Option<usize>,
}

/// Where an image to normalize comes from
#[derive(Debug)]
pub enum ImageSource<'a> {
    /// Raw encoded bytes (an upload)
    Bytes(&'a [u8]),
    /// A file on disk
    Path(&'a Path),
    /// An image that is already decoded
    Decoded(DynamicImage),
}

impl<'a> From<&'a [u8]> for ImageSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl<'a> From<&'a Path> for ImageSource<'a> {
    fn from(path: &'a Path) -> Self {
        ImageSource::Path(path)
    }
}

impl From<DynamicImage> for ImageSource<'_> {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Decoded(image)
    }
}

/// A decoded RGB raster bounded by the configured maximum dimensions
///
/// Only `normalize` constructs these, so the color mode is always RGB.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: RgbImage,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn color_mode(&self) -> &'static str {
        "RGB"
    }

    /// Borrow the underlying RGB pixels
    pub fn rgb(&self) -> &RgbImage {
        &self.image
    }

    /// Clone into a `DynamicImage` for resize/crop operations
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.image.clone())
    }
}

/// Check a filename against the extension allow-list
///
/// The name must contain a `.`; the suffix is compared case-insensitively.
/// No I/O is performed.
pub fn check_extension(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Reject payloads above `max_bytes`
pub fn check_size(bytes: &[u8], max_bytes: usize) -> Result<(), ImageError> {
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge(bytes.len(), max_bytes));
    }
    Ok(())
}

/// Check that bytes hold a decodable image in a supported format
///
/// Never fails: any sniffing or decode error yields `false`. Truncated
/// streams are rejected because the check runs the same full decode that
/// `normalize` uses.
pub fn validate(bytes: &[u8]) -> bool {
    match decode_image_bytes(bytes) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("Image validation failed: {}", e);
            false
        }
    }
}

/// Decode raw image bytes (for multipart uploads)
///
/// # Arguments
/// * `bytes` - Raw image bytes
///
/// # Returns
/// * `Ok((DynamicImage, ImageInfo))` - The decoded image and metadata
/// * `Err(ImageError)` - If decoding fails
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    // Detect format from magic bytes
    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(ImageError::CorruptedData);
    }

    let mut info = image_info(&img);
    info.format = Some(format);
    info.size_bytes = Some(bytes.len());

    Ok((img, info))
}

/// Detect image format from magic bytes
///
/// # Arguments
/// * `bytes` - Raw image data
///
/// # Returns
/// * `Ok(ImageFormat)` - Detected format
/// * `Err(ImageError::UnsupportedFormat)` - If format is not one we accept
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Get the format extension as a string
pub fn format_to_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        _ => "unknown",
    }
}

/// Describe an image's dimensions and color mode
pub fn image_info(image: &DynamicImage) -> ImageInfo {
    let (width, height) = image.dimensions();
    ImageInfo {
        width,
        height,
        color_mode: color_mode_name(image.color()),
        format: None,
        size_bytes: None,
    }
}

fn color_mode_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 | ColorType::L16 => "L",
        ColorType::La8 | ColorType::La16 => "LA",
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB",
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA",
        _ => "unknown",
    }
}

/// Decode (if needed), convert to RGB and bound an image
///
/// # Arguments
/// * `source` - Bytes, a path, or an already-decoded image
/// * `resize` - Whether to scale images larger than `max_size` down
/// * `max_size` - (width, height) bound; aspect ratio is preserved
///
/// # Errors
/// Returns `ImageError` if the input cannot be read or decoded.
///
/// Images already within bounds are never upscaled and never cropped.
pub fn normalize(
    source: ImageSource<'_>,
    resize: bool,
    max_size: (u32, u32),
) -> Result<DecodedImage, ImageError> {
    let image = match source {
        ImageSource::Bytes(bytes) => decode_image_bytes(bytes)?.0,
        ImageSource::Path(path) => {
            let bytes = std::fs::read(path)?;
            decode_image_bytes(&bytes)?.0
        }
        ImageSource::Decoded(image) => image,
    };

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::CorruptedData);
    }

    let (max_w, max_h) = max_size;
    let image = if resize && (width > max_w || height > max_h) {
        let resized = image.resize(max_w, max_h, image::imageops::FilterType::Lanczos3);
        tracing::debug!(
            "Resized image {}x{} -> {}x{}",
            width,
            height,
            resized.width(),
            resized.height()
        );
        resized
    } else {
        image
    };

    Ok(DecodedImage {
        image: image.to_rgb8(),
    })
}
