// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Static registry of captioning backends

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CaptionError;
use crate::vision::captioner::preprocessing::{PreprocessConfig, ResizeMode, CLIP_MEAN, CLIP_STD};

/// Short identifier selecting a captioning backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKey {
    Blip,
    Git,
}

impl ModelKey {
    /// Every registered key, in listing order
    pub const ALL: [ModelKey; 2] = [ModelKey::Blip, ModelKey::Git];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKey::Blip => "blip",
            ModelKey::Git => "git",
        }
    }

    /// Registry entry for this key
    pub fn descriptor(&self) -> &'static ModelDescriptor {
        match self {
            ModelKey::Blip => &MODELS[0],
            ModelKey::Git => &MODELS[1],
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKey {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blip" => Ok(ModelKey::Blip),
            "git" => Ok(ModelKey::Git),
            _ => Err(CaptionError::UnknownModel {
                key: s.to_string(),
                available: available_keys(),
            }),
        }
    }
}

/// How a backend's generate call is shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationProtocol {
    /// Takes the full processor output and honours temperature
    Conditional,
    /// Takes only the pixel tensor; temperature is not passed
    Causal,
}

/// Everything needed to present and load one backend
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub key: ModelKey,
    pub display_name: &'static str,
    pub description: &'static str,
    /// Hugging Face style repository identifier; also the local cache key
    pub backend_id: &'static str,
    /// Hub repository publishing the ONNX encoder/decoder export
    pub onnx_repo: &'static str,
    pub protocol: GenerationProtocol,
    pub preprocess: PreprocessConfig,
    /// First token fed to the text decoder
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
}

static MODELS: [ModelDescriptor; 2] = [
    ModelDescriptor {
        key: ModelKey::Blip,
        display_name: "BLIP (Salesforce)",
        description: "Bootstrapping Language-Image Pre-training",
        backend_id: "Salesforce/blip-image-captioning-large",
        onnx_repo: "Xenova/blip-image-captioning-large",
        protocol: GenerationProtocol::Conditional,
        preprocess: PreprocessConfig {
            input_size: 384,
            mean: CLIP_MEAN,
            std: CLIP_STD,
            resize_mode: ResizeMode::Stretch,
        },
        // [DEC] / [SEP] in the BLIP BERT vocabulary
        decoder_start_token_id: 30522,
        eos_token_id: 102,
    },
    ModelDescriptor {
        key: ModelKey::Git,
        display_name: "GIT (Microsoft)",
        description: "Generative Image-to-text Transformer",
        backend_id: "microsoft/git-base-coco",
        onnx_repo: "Xenova/git-base-coco",
        protocol: GenerationProtocol::Causal,
        preprocess: PreprocessConfig {
            input_size: 224,
            mean: CLIP_MEAN,
            std: CLIP_STD,
            resize_mode: ResizeMode::CenterCrop,
        },
        // [CLS] / [SEP]
        decoder_start_token_id: 101,
        eos_token_id: 102,
    },
];

/// List every registered backend in a fixed order
pub fn list_models() -> &'static [ModelDescriptor] {
    &MODELS
}

/// Resolve a model key string to its backend identifier
///
/// # Errors
/// `CaptionError::UnknownModel` if the key is not registered.
pub fn resolve_backend(key: &str) -> Result<&'static str, CaptionError> {
    let key: ModelKey = key.parse()?;
    Ok(key.descriptor().backend_id)
}

fn available_keys() -> String {
    ModelKey::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
