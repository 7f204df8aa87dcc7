// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for the caption and translation pipeline

use thiserror::Error;

use crate::vision::image_utils::ImageError;

/// Errors surfaced by the captioning and translation core
#[derive(Debug, Error)]
pub enum CaptionError {
    /// Bad extension, undecodable image or empty upload
    #[error("{0}")]
    InvalidInput(String),

    /// Input could be read but not turned into a usable RGB image
    #[error("Image preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("Unknown model: {key} (available: {available})")]
    UnknownModel { key: String, available: String },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Network or IO failure while loading a backend
    #[error("Failed to load model {key}: {reason}")]
    ModelLoad { key: String, reason: String },

    #[error("Caption generation failed: {0}")]
    Generation(String),

    #[error("Translation provider error: {0}")]
    TranslationProvider(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },
}

impl CaptionError {
    /// Short machine-readable name used in API error bodies and logs
    pub fn kind(&self) -> &'static str {
        match self {
            CaptionError::InvalidInput(_) => "invalid_input",
            CaptionError::Preprocessing(_) => "preprocessing_error",
            CaptionError::UnknownModel { .. } => "unknown_model",
            CaptionError::UnsupportedLanguage(_) => "unsupported_language",
            CaptionError::ModelLoad { .. } => "model_load_error",
            CaptionError::Generation(_) => "generation_error",
            CaptionError::TranslationProvider(_) => "translation_provider_error",
            CaptionError::Timeout { .. } => "timeout",
        }
    }

    /// Whether the caller can fix the request and retry
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CaptionError::InvalidInput(_)
                | CaptionError::Preprocessing(_)
                | CaptionError::UnknownModel { .. }
                | CaptionError::UnsupportedLanguage(_)
        )
    }
}

impl From<ImageError> for CaptionError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::EmptyData
            | ImageError::UnsupportedFormat
            | ImageError::CorruptedData
            | ImageError::TooLarge(..) => CaptionError::InvalidInput(err.to_string()),
            ImageError::DecodeFailed(_) | ImageError::Io(_) => {
                CaptionError::Preprocessing(err.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CaptionError>;
