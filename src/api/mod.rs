// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP API
//!
//! Routes:
//! - `POST /api/caption` - caption (and optionally translate) an upload
//! - `GET /api/languages` - supported translation targets
//! - `GET /api/models` - registered captioning models
//! - `GET /api/health` - active model and device

pub mod caption;
pub mod errors;
pub mod handlers;
pub mod server;

pub use errors::{ApiError, ErrorResponse};
pub use server::{create_app, start_server, AppState};
