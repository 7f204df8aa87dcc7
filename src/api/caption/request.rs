// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption request extraction from multipart form data

use axum_extra::extract::Multipart;
use tracing::debug;

use crate::api::errors::ApiError;

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";
/// Optional target-language field
pub const LANGUAGE_FIELD: &str = "language";
/// Optional model-key field
pub const MODEL_FIELD: &str = "model";

/// An uploaded file part
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied filename; empty when the part carried none
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Parsed `/api/caption` form
#[derive(Debug, Clone, Default)]
pub struct CaptionForm {
    pub image: Option<UploadedFile>,
    pub language: Option<String>,
    pub model: Option<String>,
}

impl CaptionForm {
    /// Read every field of the form, ignoring unknown ones
    ///
    /// # Errors
    /// * `PayloadTooLarge` - the image part exceeds `max_bytes`
    /// * `BadRequest` - the body is not valid multipart data
    pub async fn from_multipart(multipart: &mut Multipart, max_bytes: usize) -> Result<Self, ApiError> {
        let mut form = CaptionForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::from_multipart(e, max_bytes))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                IMAGE_FIELD => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::from_multipart(e, max_bytes))?;
                    if bytes.len() > max_bytes {
                        return Err(ApiError::PayloadTooLarge { max_bytes });
                    }
                    form.image = Some(UploadedFile {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
                LANGUAGE_FIELD | MODEL_FIELD => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::from_multipart(e, max_bytes))?;
                    let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                    if name == LANGUAGE_FIELD {
                        form.language = value;
                    } else {
                        form.model = value;
                    }
                }
                other => debug!("Ignoring multipart field {}", other),
            }
        }

        Ok(form)
    }
}
