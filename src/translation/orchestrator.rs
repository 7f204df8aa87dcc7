// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Translation orchestration: validation, detection fallback, identity skip

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::detector::LanguageDetector;
use super::languages::{display_name, is_supported, list_supported, Language};
use super::provider::TranslationProvider;
use crate::error::CaptionError;

/// Source code meaning "detect from the text"
pub const AUTO_DETECT: &str = "auto";

/// Source used when detection fails
pub const FALLBACK_SOURCE: &str = "en";

/// Outcome of one translation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub source_language_name: String,
    pub target_language_name: String,
}

/// Validates languages, detects sources and delegates to a provider
#[derive(Clone)]
pub struct Translator {
    provider: Arc<dyn TranslationProvider>,
    detector: Arc<dyn LanguageDetector>,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator").finish_non_exhaustive()
    }
}

impl Translator {
    pub fn new(provider: Arc<dyn TranslationProvider>, detector: Arc<dyn LanguageDetector>) -> Self {
        Self { provider, detector }
    }

    pub fn is_supported(&self, code: &str) -> bool {
        is_supported(code)
    }

    pub fn list_supported(&self) -> &'static [Language] {
        list_supported()
    }

    /// Best-guess language of `text`, or `None` if detection fails
    pub fn detect_language(&self, text: &str) -> Option<String> {
        match self.detector.detect(text) {
            Ok(code) => Some(code),
            Err(e) => {
                debug!("Language detection failed: {}", e);
                None
            }
        }
    }

    /// Translate `text` into `target`
    ///
    /// # Arguments
    /// * `text` - Text to translate
    /// * `target` - Catalog code of the target language
    /// * `source` - Catalog code of the source, or `"auto"` to detect
    ///
    /// # Errors
    /// * `UnsupportedLanguage` - `target` is not in the catalog; nothing
    ///   else runs
    /// * `TranslationProvider` / `Timeout` - the provider call failed
    ///
    /// Detection failure never fails the call; the source falls back to
    /// `"en"`. When source and target match the text is returned as is.
    pub async fn translate(&self, text: &str, target: &str, source: &str) -> Result<TranslationResult, CaptionError> {
        if !is_supported(target) {
            return Err(CaptionError::UnsupportedLanguage(target.to_string()));
        }

        let source = if source == AUTO_DETECT {
            self.detect_language(text).unwrap_or_else(|| {
                warn!(
                    "⚠️ Could not detect language, falling back to {}",
                    FALLBACK_SOURCE
                );
                FALLBACK_SOURCE.to_string()
            })
        } else {
            source.to_string()
        };

        let translated_text = if source == target {
            debug!("Source and target are both {}, skipping translation", target);
            text.to_string()
        } else {
            let translated = self.provider.translate(&source, target, text).await?;
            info!(
                "Translated {} chars {} -> {}",
                text.chars().count(),
                source,
                target
            );
            translated
        };

        Ok(TranslationResult {
            translated_text,
            source_language_name: display_name(&source).to_string(),
            target_language_name: display_name(target).to_string(),
            source_language: source,
            target_language: target.to_string(),
        })
    }

    /// Translate several texts; one failure does not stop the rest
    pub async fn batch_translate(
        &self,
        texts: &[String],
        target: &str,
        source: &str,
    ) -> Vec<Result<TranslationResult, CaptionError>> {
        let mut results = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let result = self.translate(text, target, source).await;
            if let Err(e) = &result {
                warn!("⚠️ Batch translation item {} failed: {}", index + 1, e);
            }
            results.push(result);
        }
        results
    }
}
