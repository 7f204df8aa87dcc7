// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use tracing::info;

use super::request::CaptionForm;
use super::response::CaptionResponse;
use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::pipeline::CaptionRequest;

/// POST /api/caption - Caption an uploaded image
///
/// Multipart fields: `image` (file), optional `language`, optional `model`.
/// A caption whose translation failed is still a success; the reason is
/// carried in `warning`.
pub async fn caption_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CaptionResponse>, ApiError> {
    let pipeline = state.pipeline().await?;
    let max_bytes = pipeline.config().max_content_length;

    let form = CaptionForm::from_multipart(&mut multipart, max_bytes).await?;
    let upload = form
        .image
        .ok_or_else(|| ApiError::bad_request("No image file provided"))?;

    info!(
        "Caption request: file={} bytes={} language={:?} model={:?}",
        upload.filename,
        upload.bytes.len(),
        form.language,
        form.model
    );

    let outcome = pipeline
        .caption(CaptionRequest {
            bytes: &upload.bytes,
            filename: &upload.filename,
            language: form.language.as_deref(),
            model: form.model.as_deref(),
        })
        .await?;

    info!("Caption generated successfully: {}", outcome.caption.caption);
    Ok(Json(CaptionResponse::from(outcome)))
}
