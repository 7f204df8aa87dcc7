// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Catalog, registry and health handlers

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::translation::languages::list_supported;
use crate::version::get_version_info;
use crate::vision::registry::list_models;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageEntry {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesResponse {
    pub success: bool,
    pub languages: Vec<LanguageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelEntry {
    /// Model key accepted by `/api/caption`
    pub name: String,
    pub display_name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub success: bool,
    pub models: Vec<ModelEntry>,
    pub current_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub device: String,
    pub timestamp: String,
    /// Build version, date and feature list
    pub version: serde_json::Value,
}

/// GET /api/languages
pub async fn languages_handler() -> Json<LanguagesResponse> {
    let languages = list_supported()
        .iter()
        .map(|l| LanguageEntry {
            code: l.code.to_string(),
            name: l.name.to_string(),
        })
        .collect();

    Json(LanguagesResponse {
        success: true,
        languages,
    })
}

/// GET /api/models
pub async fn models_handler(State(state): State<AppState>) -> Result<Json<ModelsResponse>, ApiError> {
    let pipeline = state.pipeline().await?;
    let models = list_models()
        .iter()
        .map(|d| ModelEntry {
            name: d.key.to_string(),
            display_name: d.display_name.to_string(),
            description: d.description.to_string(),
        })
        .collect();

    Ok(Json(ModelsResponse {
        success: true,
        models,
        current_model: pipeline.engine().current_model().to_string(),
    }))
}

/// GET /api/health
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let pipeline = state.pipeline().await?;
    let health = pipeline.engine().health();

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        model: health.model.to_string(),
        device: health.device.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: get_version_info(),
    }))
}

/// Fallback for unknown routes
pub async fn not_found_handler() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}
