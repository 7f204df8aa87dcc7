// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload-to-caption pipeline
//!
//! Validator -> engine -> translator. Each stage only sees the previous
//! stage's output. Captioning and translation are reported separately:
//! a caption that succeeded is returned even when its translation fails.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::CaptionError;
use crate::translation::languages::CAPTION_LANGUAGE;
use crate::translation::{TranslationResult, Translator, AUTO_DETECT};
use crate::vision::captioner::{CaptionResult, CaptioningEngine, GenerationParams};
use crate::vision::image_utils::{
    check_extension, check_size, decode_image_bytes, normalize, ImageSource, ALLOWED_EXTENSIONS,
    DEFAULT_MAX_DIMENSIONS, DEFAULT_MAX_FILE_SIZE,
};
use crate::vision::registry::ModelKey;

/// Limits and defaults applied to every request
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model used when a request does not name one
    pub default_model: ModelKey,
    pub max_content_length: usize,
    pub max_image_size: (u32, u32),
    pub generation: GenerationParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_model: ModelKey::Blip,
            max_content_length: DEFAULT_MAX_FILE_SIZE,
            max_image_size: DEFAULT_MAX_DIMENSIONS,
            generation: GenerationParams::default(),
        }
    }
}

/// One caption request as handed over by a transport
#[derive(Debug, Clone, Copy)]
pub struct CaptionRequest<'a> {
    pub bytes: &'a [u8],
    pub filename: &'a str,
    /// Target language code; `None`, empty or `"en"` means no translation
    pub language: Option<&'a str>,
    /// Model key; `None` selects the default model
    pub model: Option<&'a str>,
}

/// Caption plus the optional translation outcome
#[derive(Debug, Clone)]
pub struct CaptionOutcome {
    pub caption: CaptionResult,
    pub translation: Option<TranslationResult>,
    /// Set when translation was requested but not delivered
    pub warning: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Shared pipeline over one engine and one translator
#[derive(Debug, Clone)]
pub struct CaptionPipeline {
    engine: Arc<CaptioningEngine>,
    translator: Translator,
    config: PipelineConfig,
}

impl CaptionPipeline {
    pub fn new(engine: Arc<CaptioningEngine>, translator: Translator, config: PipelineConfig) -> Self {
        Self {
            engine,
            translator,
            config,
        }
    }

    pub fn engine(&self) -> &Arc<CaptioningEngine> {
        &self.engine
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate an upload, caption it and optionally translate the caption
    ///
    /// # Errors
    /// * `InvalidInput` - missing file, bad extension, oversized or
    ///   undecodable bytes; no model is touched
    /// * `UnknownModel` - the requested model is not registered
    /// * `ModelLoad`, `Timeout`, `Generation` - the captioning stage failed
    ///
    /// Translation problems never produce an error; they become `warning`.
    pub async fn caption(&self, request: CaptionRequest<'_>) -> Result<CaptionOutcome, CaptionError> {
        if request.filename.is_empty() {
            return Err(CaptionError::InvalidInput("No file selected".to_string()));
        }
        if !check_extension(request.filename) {
            return Err(CaptionError::InvalidInput(format!(
                "Invalid file type. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }
        if request.bytes.is_empty() {
            return Err(CaptionError::InvalidInput("Uploaded file is empty".to_string()));
        }
        check_size(request.bytes, self.config.max_content_length)?;
        let decoded = match decode_image_bytes(request.bytes) {
            Ok((decoded, _)) => decoded,
            Err(e) => {
                warn!("⚠️ Rejected invalid image upload {}: {}", request.filename, e);
                return Err(CaptionError::InvalidInput("Invalid image file".to_string()));
            }
        };

        let model = match request.model.filter(|m| !m.trim().is_empty()) {
            Some(name) => name.parse::<ModelKey>()?,
            None => self.config.default_model,
        };

        let image = normalize(ImageSource::Decoded(decoded), true, self.config.max_image_size)?;

        let backend = self.engine.switch_model(model).await?;

        info!(
            "Generating caption for {} ({}x{}) with {}",
            request.filename,
            image.width(),
            image.height(),
            model
        );
        let caption = self
            .engine
            .generate_with(backend, image, self.config.generation)
            .await?;

        let (translation, warning) = match request.language.map(str::trim) {
            Some(target) if !target.is_empty() && target != CAPTION_LANGUAGE => {
                self.translate_caption(&caption.caption, target).await
            }
            _ => (None, None),
        };

        Ok(CaptionOutcome {
            caption,
            translation,
            warning,
            timestamp: Utc::now(),
        })
    }

    async fn translate_caption(&self, caption: &str, target: &str) -> (Option<TranslationResult>, Option<String>) {
        if !self.translator.is_supported(target) {
            return (None, Some(format!("Language {} not supported", target)));
        }

        info!("Translating caption to {}", target);
        match self.translator.translate(caption, target, AUTO_DETECT).await {
            Ok(result) => (Some(result), None),
            Err(e) => {
                warn!("⚠️ Translation to {} failed: {}", target, e);
                (None, Some(format!("Translation failed: {}", e)))
            }
        }
    }
}
