// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generation protocol dispatch
//!
//! Conditional backends (BLIP) receive the full processor output and the
//! temperature. Causal backends (GIT) receive only the pixel tensor.

use serde::{Deserialize, Serialize};

use super::backend::{GenerateRequest, ProcessorOutput};
use crate::error::CaptionError;
use crate::vision::registry::GenerationProtocol;

/// Default maximum caption length in tokens
pub const DEFAULT_MAX_LENGTH: usize = 50;

/// Default beam width
pub const DEFAULT_NUM_BEAMS: usize = 5;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// Caller-facing generation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_length: usize,
    pub num_beams: usize,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            num_beams: DEFAULT_NUM_BEAMS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<(), CaptionError> {
        if self.max_length == 0 {
            return Err(CaptionError::InvalidInput(
                "max_length must be greater than 0".to_string(),
            ));
        }
        if self.num_beams == 0 {
            return Err(CaptionError::InvalidInput(
                "num_beams must be greater than 0".to_string(),
            ));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(CaptionError::InvalidInput(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

impl GenerationProtocol {
    /// Shape a generate call for this protocol
    pub fn build_request(&self, output: ProcessorOutput, params: &GenerationParams) -> GenerateRequest {
        match self {
            GenerationProtocol::Conditional => GenerateRequest {
                pixel_values: output.pixel_values,
                input_ids: Some(output.input_ids),
                max_length: params.max_length,
                num_beams: params.num_beams,
                temperature: Some(params.temperature),
                early_stopping: true,
            },
            GenerationProtocol::Causal => GenerateRequest {
                pixel_values: output.pixel_values,
                input_ids: None,
                max_length: params.max_length,
                num_beams: params.num_beams,
                temperature: None,
                early_stopping: false,
            },
        }
    }
}
