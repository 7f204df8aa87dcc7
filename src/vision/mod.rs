// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision side of the pipeline
//!
//! This module provides:
//! - Image validation and normalization
//! - The static model registry
//! - Device resolution
//! - The captioning engine and its ONNX backend

pub mod captioner;
pub mod device;
pub mod image_utils;
pub mod registry;

pub use device::{resolve_device, Device};
pub use image_utils::{
    check_extension, decode_image_bytes, detect_format, normalize, validate, DecodedImage,
    ImageError, ImageInfo, ImageSource,
};
pub use registry::{list_models, resolve_backend, GenerationProtocol, ModelDescriptor, ModelKey};
