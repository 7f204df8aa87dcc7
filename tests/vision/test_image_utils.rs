// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Image validation and normalization tests
//!
//! Covers the upload checks applied before any model runs:
//! - Extension allow-list
//! - Decodability of the payload
//! - Bounded, aspect-preserving downscaling

use std::io::Cursor;

use caption_node::vision::image_utils::{
    check_extension, check_size, detect_format, normalize, validate, ImageError, ImageSource,
    DEFAULT_MAX_DIMENSIONS,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use rand::Rng;

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

fn solid(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 80, 200])))
}

#[cfg(test)]
mod image_utils_tests {
    use super::*;

    #[test]
    fn test_extension_is_case_insensitive() {
        assert!(check_extension("photo.JPG"));
        assert!(check_extension("scan.Png"));
        assert!(check_extension("archive.tar.webp"));
        assert!(!check_extension("photo"));
        assert!(!check_extension("notes.txt"));
        assert!(!check_extension("photo."));
    }

    #[test]
    fn test_text_renamed_to_jpg_is_rejected() {
        let bytes = b"this is a plain text file, not a picture";
        assert!(check_extension("fake.jpg"));
        assert!(!validate(bytes));
    }

    #[test]
    fn test_valid_jpeg_accepted() {
        let bytes = encode(solid(800, 600), ImageFormat::Jpeg);
        assert_eq!(detect_format(&bytes).unwrap(), ImageFormat::Jpeg);
        assert!(validate(&bytes));
    }

    #[test]
    fn test_noisy_photo_passes_validation() {
        let mut rng = rand::thread_rng();
        let noise = RgbImage::from_fn(320, 240, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]));
        let bytes = encode(DynamicImage::ImageRgb8(noise), ImageFormat::Jpeg);

        assert!(validate(&bytes));
        let image = normalize(ImageSource::Bytes(&bytes), true, DEFAULT_MAX_DIMENSIONS).unwrap();
        assert_eq!((image.width(), image.height()), (320, 240));
    }

    #[test]
    fn test_large_image_is_bounded_with_aspect_kept() {
        let image = normalize(
            ImageSource::Decoded(solid(4000, 3000)),
            true,
            DEFAULT_MAX_DIMENSIONS,
        )
        .unwrap();

        assert!(image.width().max(image.height()) <= 2048);
        let original = 4000.0 / 3000.0;
        let ratio = image.width() as f64 / image.height() as f64;
        assert!((ratio - original).abs() / original < 0.01);
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let bytes = encode(solid(500, 500), ImageFormat::Png);
        let image = normalize(ImageSource::Bytes(&bytes), true, DEFAULT_MAX_DIMENSIONS).unwrap();
        assert_eq!((image.width(), image.height()), (500, 500));
    }

    #[test]
    fn test_resize_disabled_keeps_dimensions() {
        let image = normalize(ImageSource::Decoded(solid(300, 200)), false, (100, 100)).unwrap();
        assert_eq!((image.width(), image.height()), (300, 200));
    }

    #[test]
    fn test_rgba_is_converted_to_rgb() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(16, 8));
        let bytes = encode(rgba, ImageFormat::Png);
        let image = normalize(ImageSource::Bytes(&bytes), true, DEFAULT_MAX_DIMENSIONS).unwrap();
        assert_eq!(image.color_mode(), "RGB");
        assert_eq!(image.rgb().dimensions(), (16, 8));
    }

    #[test]
    fn test_path_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, encode(solid(40, 30), ImageFormat::Png)).unwrap();

        let image = normalize(ImageSource::Path(&path), true, DEFAULT_MAX_DIMENSIONS).unwrap();
        assert_eq!((image.width(), image.height()), (40, 30));

        let missing = dir.path().join("missing.png");
        assert!(matches!(
            normalize(ImageSource::Path(&missing), true, DEFAULT_MAX_DIMENSIONS),
            Err(ImageError::Io(_))
        ));
    }

    #[test]
    fn test_size_guard() {
        let bytes = vec![0u8; 2048];
        assert!(check_size(&bytes, 4096).is_ok());
        assert!(matches!(
            check_size(&bytes, 1024),
            Err(ImageError::TooLarge(2048, 1024))
        ));
    }
}
