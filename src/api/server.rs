// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server: shared state, router and serve loop

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::caption::caption_handler;
use super::errors::ApiError;
use super::handlers::{health_handler, languages_handler, models_handler, not_found_handler};
use crate::pipeline::CaptionPipeline;

/// State shared by every handler
///
/// The pipeline slot is empty until the initial backend has loaded;
/// handlers that need it answer 503 until then.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<RwLock<Option<Arc<CaptionPipeline>>>>,
    max_content_length: usize,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("max_content_length", &self.max_content_length)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State with a pipeline ready to serve
    pub fn new(pipeline: Arc<CaptionPipeline>) -> Self {
        let max_content_length = pipeline.config().max_content_length;
        Self {
            pipeline: Arc::new(RwLock::new(Some(pipeline))),
            max_content_length,
        }
    }

    /// State whose pipeline is installed later with `install`
    pub fn loading(max_content_length: usize) -> Self {
        Self {
            pipeline: Arc::new(RwLock::new(None)),
            max_content_length,
        }
    }

    pub async fn install(&self, pipeline: Arc<CaptionPipeline>) {
        *self.pipeline.write().await = Some(pipeline);
    }

    /// The active pipeline, or 503 while it is still loading
    pub async fn pipeline(&self) -> Result<Arc<CaptionPipeline>, ApiError> {
        self.pipeline.read().await.clone().ok_or_else(|| {
            ApiError::ServiceUnavailable("Captioning engine is still loading".to_string())
        })
    }

    pub fn max_content_length(&self) -> usize {
        self.max_content_length
    }
}

/// Build the router with all routes and layers
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.max_content_length();

    Router::new()
        .route("/api/caption", post(caption_handler))
        .route("/api/languages", get(languages_handler))
        .route("/api/models", get(models_handler))
        .route("/api/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🌐 API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
