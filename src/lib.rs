// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod translation;
pub mod version;
pub mod vision;

pub use config::NodeConfig;
pub use error::{CaptionError, Result};
pub use pipeline::{CaptionOutcome, CaptionPipeline, CaptionRequest, PipelineConfig};
pub use translation::{TranslationResult, Translator};
pub use vision::captioner::{CaptionResult, CaptioningEngine, EngineOptions, GenerationParams};
pub use vision::{Device, ModelKey};
