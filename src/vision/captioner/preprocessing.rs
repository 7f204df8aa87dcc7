// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for captioning vision encoders

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

use crate::vision::image_utils::DecodedImage;

/// CLIP normalization mean values (BLIP and GIT both use these)
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std values
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// How an image is fitted to the square encoder input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Resize to exact size (may distort aspect ratio)
    Stretch,
    /// Resize the shortest edge then center crop
    CenterCrop,
}

impl Default for ResizeMode {
    fn default() -> Self {
        Self::Stretch
    }
}

/// Per-backend encoder input geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessConfig {
    /// Square side length fed to the encoder
    pub input_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub resize_mode: ResizeMode,
}

/// Preprocess an image into an encoder tensor
///
/// Steps:
/// 1. Resize to `input_size` x `input_size` using the configured mode
/// 2. Normalize: (pixel/255 - mean) / std
/// 3. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess(image: &DecodedImage, config: &PreprocessConfig) -> Array4<f32> {
    let resized = resize_for_encoder(&image.to_dynamic(), config.input_size, config.resize_mode);
    let rgb = resized.to_rgb8();

    let size = config.input_size as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let normalized = (pixel[c] as f32 / 255.0 - config.mean[c]) / config.std[c];
            tensor[[0, c, y as usize, x as usize]] = normalized;
        }
    }

    tensor
}

/// Resize image to target size using specified mode
pub fn resize_for_encoder(image: &DynamicImage, target_size: u32, mode: ResizeMode) -> DynamicImage {
    match mode {
        ResizeMode::Stretch => image.resize_exact(target_size, target_size, FilterType::CatmullRom),
        ResizeMode::CenterCrop => center_crop_resize(image, target_size),
    }
}

/// Resize with center crop (no distortion, may lose edges)
fn center_crop_resize(image: &DynamicImage, target_size: u32) -> DynamicImage {
    let (orig_w, orig_h) = image.dimensions();

    // Scale so the shortest edge covers the target
    let scale_w = target_size as f32 / orig_w as f32;
    let scale_h = target_size as f32 / orig_h as f32;
    let scale = scale_w.max(scale_h);

    let new_w = ((orig_w as f32 * scale).round() as u32).max(target_size);
    let new_h = ((orig_h as f32 * scale).round() as u32).max(target_size);

    let resized = image.resize_exact(new_w, new_h, FilterType::CatmullRom);

    let crop_x = (new_w - target_size) / 2;
    let crop_y = (new_h - target_size) / 2;

    resized.crop_imm(crop_x, crop_y, target_size, target_size)
}
