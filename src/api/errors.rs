// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::multipart::MultipartError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::error::CaptionError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_type: String,
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        error_type: &'static str,
        message: String,
    },
    #[error("File too large. Maximum size: {:.1}MB", megabytes(.max_bytes))]
    PayloadTooLarge { max_bytes: usize },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{message}")]
    Internal {
        error_type: &'static str,
        message: String,
    },
    #[error("{0}")]
    Timeout(String),
}

fn megabytes(bytes: &usize) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            error_type: "invalid_request",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            error_type: "internal_error",
            message: message.into(),
        }
    }

    /// Map a multipart read failure, keeping 413 for body-limit overruns
    pub fn from_multipart(err: MultipartError, max_bytes: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { max_bytes }
        } else {
            ApiError::bad_request(format!("Malformed upload: {}", err.body_text()))
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let error_type = match self {
            ApiError::BadRequest { error_type, .. } | ApiError::Internal { error_type, .. } => *error_type,
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::NotFound(_) => "not_found",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Timeout(_) => "timeout",
        };

        ErrorResponse {
            success: false,
            error: self.to_string(),
            error_type: error_type.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<CaptionError> for ApiError {
    fn from(err: CaptionError) -> Self {
        let error_type = err.kind();
        match err {
            CaptionError::Timeout { .. } => {
                warn!("Request timed out: {}", err);
                ApiError::Timeout(err.to_string())
            }
            e if e.is_client_error() => ApiError::BadRequest {
                error_type,
                message: e.to_string(),
            },
            e => {
                error!("Pipeline error ({}): {}", error_type, e);
                ApiError::Internal {
                    error_type,
                    message: e.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
