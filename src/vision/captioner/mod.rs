// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Captioning engine and backends
//!
//! Components:
//! - `engine` - Active backend ownership, switching and generation
//! - `backend` - Processor/model/loader traits
//! - `protocol` - Conditional vs causal generate call shapes
//! - `beam` - Beam search decoding
//! - `preprocessing` - Image preprocessing for encoder input
//! - `onnx` - ONNX Runtime backend provider

pub mod backend;
pub mod beam;
pub mod engine;
pub mod onnx;
pub mod preprocessing;
pub mod protocol;

pub use backend::{
    BackendLoader, CaptionModel, CaptionProcessor, GenerateRequest, LoadedBackend, ProcessorOutput,
};
pub use engine::{
    ActiveBackend, CaptionResult, CaptioningEngine, EngineHealth, EngineOptions,
    PLACEHOLDER_CONFIDENCE,
};
pub use onnx::OnnxBackendLoader;
pub use protocol::GenerationParams;
