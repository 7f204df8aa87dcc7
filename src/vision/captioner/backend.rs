// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Backend seams: processor, generative model and loader
//!
//! A backend pairs a processor (image to model input, tokens to text) with
//! a generative model (model input to token sequence). The engine only
//! talks to these traits, so the ONNX implementation and test doubles are
//! interchangeable.

use std::sync::Arc;

use async_trait::async_trait;
use ndarray::Array4;

use crate::error::CaptionError;
use crate::vision::device::Device;
use crate::vision::image_utils::DecodedImage;
use crate::vision::registry::ModelDescriptor;

/// Encoded model input for one image
#[derive(Debug, Clone)]
pub struct ProcessorOutput {
    /// Normalized NCHW pixel tensor [1, 3, H, W]
    pub pixel_values: Array4<f32>,
    /// Text prompt tokens (the decoder start token for unconditional captions)
    pub input_ids: Vec<u32>,
}

/// Arguments for one generate call, already shaped by the protocol
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub pixel_values: Array4<f32>,
    /// Present only for the conditional protocol
    pub input_ids: Option<Vec<u32>>,
    pub max_length: usize,
    pub num_beams: usize,
    /// Present only for the conditional protocol
    pub temperature: Option<f32>,
    pub early_stopping: bool,
}

/// Image encoder and token decoder for one backend
pub trait CaptionProcessor: Send + Sync {
    fn encode(&self, image: &DecodedImage) -> Result<ProcessorOutput, CaptionError>;

    /// Decode generated tokens, skipping special tokens
    fn decode(&self, tokens: &[u32]) -> Result<String, CaptionError>;
}

/// Generative model producing a token sequence
pub trait CaptionModel: Send + Sync {
    fn generate(&self, request: GenerateRequest) -> Result<Vec<u32>, CaptionError>;
}

/// A fully loaded backend
#[derive(Clone)]
pub struct LoadedBackend {
    pub processor: Arc<dyn CaptionProcessor>,
    pub model: Arc<dyn CaptionModel>,
}

impl std::fmt::Debug for LoadedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedBackend").finish_non_exhaustive()
    }
}

/// Loads backends by descriptor onto a device
#[async_trait]
pub trait BackendLoader: Send + Sync {
    async fn load(
        &self,
        descriptor: &'static ModelDescriptor,
        device: Device,
    ) -> Result<LoadedBackend, CaptionError>;
}
