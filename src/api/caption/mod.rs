// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption API endpoint module
//!
//! Provides POST /api/caption for captioning an uploaded image and
//! optionally translating the caption.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::caption_handler;
pub use request::{CaptionForm, UploadedFile};
pub use response::CaptionResponse;
