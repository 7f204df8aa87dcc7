// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption response types

use serde::{Deserialize, Serialize};

use crate::pipeline::CaptionOutcome;

/// Response from POST /api/caption
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionResponse {
    pub success: bool,
    /// English caption
    pub caption: String,
    pub confidence: f32,
    /// Model key that produced the caption
    pub model_used: String,
    /// RFC 3339 completion time
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_caption: Option<String>,
    /// Target language code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_name: Option<String>,
    /// Why a requested translation is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<CaptionOutcome> for CaptionResponse {
    fn from(outcome: CaptionOutcome) -> Self {
        let (translated_caption, language, language_name) = match outcome.translation {
            Some(t) => (
                Some(t.translated_text),
                Some(t.target_language),
                Some(t.target_language_name),
            ),
            None => (None, None, None),
        };

        Self {
            success: true,
            caption: outcome.caption.caption,
            confidence: outcome.caption.confidence,
            model_used: outcome.caption.model.to_string(),
            timestamp: outcome.timestamp.to_rfc3339(),
            translated_caption,
            language,
            language_name,
            warning: outcome.warning,
        }
    }
}
