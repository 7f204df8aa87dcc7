// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime captioning backend
//!
//! Each backend is an exported vision encoder, an exported text decoder
//! and a `tokenizer.json`, laid out as:
//!
//! ```text
//! onnx/vision_encoder.onnx
//! onnx/decoder_model.onnx
//! tokenizer.json
//! ```
//!
//! Files are looked up under `<cache_dir>/<backend id>/` first, then in the
//! hub snapshot cache at `<cache_dir>/hub`, and otherwise downloaded from
//! the backend's ONNX export repository into that hub cache.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::Cache;
use ndarray::{Array2, ArrayD, ArrayViewD, Slice};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::backend::{
    BackendLoader, CaptionModel, CaptionProcessor, GenerateRequest, LoadedBackend, ProcessorOutput,
};
use super::beam::{beam_search, BeamConfig};
use super::preprocessing::{preprocess, PreprocessConfig};
use crate::error::CaptionError;
use crate::vision::device::Device;
use crate::vision::image_utils::DecodedImage;
use crate::vision::registry::ModelDescriptor;

/// Vision encoder export, relative to the backend directory
pub const VISION_ENCODER_FILE: &str = "onnx/vision_encoder.onnx";

/// Text decoder export, relative to the backend directory
pub const TEXT_DECODER_FILE: &str = "onnx/decoder_model.onnx";

pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Decoder input names that receive the image embeddings
const IMAGE_EMBEDDING_INPUTS: &[&str] = &["encoder_hidden_states", "image_features", "image_embeds"];

/// Loads ONNX backends from the model cache or the hub
#[derive(Debug, Clone)]
pub struct OnnxBackendLoader {
    cache_dir: PathBuf,
    offline: bool,
    intra_threads: usize,
}

impl OnnxBackendLoader {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            offline: false,
            intra_threads: 4,
        }
    }

    /// Never contact the hub; only files already in the cache are used
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads.max(1);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn hub_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("hub")
    }

    /// Find a backend file in the caches, downloading it when allowed
    pub async fn resolve_file(&self, descriptor: &ModelDescriptor, file: &str) -> Result<PathBuf> {
        let local = self.cache_dir.join(descriptor.backend_id).join(file);
        if local.exists() {
            debug!("Using cached {}", local.display());
            return Ok(local);
        }

        if let Some(cached) = Cache::new(self.hub_cache_dir())
            .model(descriptor.onnx_repo.to_string())
            .get(file)
        {
            debug!("Using hub snapshot {}", cached.display());
            return Ok(cached);
        }

        if self.offline {
            anyhow::bail!(
                "{} not found in model cache and offline mode is enabled",
                local.display()
            );
        }

        info!("Downloading {} from {}", file, descriptor.onnx_repo);
        let api = ApiBuilder::new()
            .with_cache_dir(self.hub_cache_dir())
            .with_progress(false)
            .build()
            .context("Failed to create Hugging Face hub client")?;

        api.model(descriptor.onnx_repo.to_string())
            .get(file)
            .await
            .with_context(|| format!("Failed to download {} from {}", file, descriptor.onnx_repo))
    }

    async fn load_inner(&self, descriptor: &'static ModelDescriptor, device: Device) -> Result<LoadedBackend> {
        let backend_id = descriptor.backend_id;
        let encoder_path = self.resolve_file(descriptor, VISION_ENCODER_FILE).await?;
        let decoder_path = self.resolve_file(descriptor, TEXT_DECODER_FILE).await?;
        let tokenizer_path = self.resolve_file(descriptor, TOKENIZER_FILE).await?;

        let threads = self.intra_threads;
        let (processor, model) = tokio::task::spawn_blocking(move || -> Result<_> {
            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
            debug!("Loaded tokenizer with {} tokens", tokenizer.get_vocab_size(true));

            let encoder = build_session(&encoder_path, device, threads)?;
            let decoder = build_session(&decoder_path, device, threads)?;

            let processor = OnnxProcessor {
                tokenizer,
                preprocess: descriptor.preprocess,
                start_token_id: descriptor.decoder_start_token_id,
            };
            let model = OnnxCaptionModel::new(encoder, decoder, descriptor)?;
            Ok((processor, model))
        })
        .await
        .context("Backend loading task panicked")??;

        info!("✅ ONNX backend {} loaded on {}", backend_id, device);

        Ok(LoadedBackend {
            processor: Arc::new(processor),
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl BackendLoader for OnnxBackendLoader {
    async fn load(
        &self,
        descriptor: &'static ModelDescriptor,
        device: Device,
    ) -> Result<LoadedBackend, CaptionError> {
        self.load_inner(descriptor, device)
            .await
            .map_err(|e| CaptionError::ModelLoad {
                key: descriptor.key.to_string(),
                reason: format!("{:#}", e),
            })
    }
}

fn build_session(path: &Path, device: Device, threads: usize) -> Result<Session> {
    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers(device.execution_providers())
        .context("Failed to set execution providers")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(threads)
        .context("Failed to set intra threads")?
        .commit_from_file(path)
        .context(format!("Failed to load ONNX model from {}", path.display()))?;

    let input_names: Vec<_> = session.inputs.iter().map(|i| &i.name).collect();
    debug!("{} inputs: {:?}", path.display(), input_names);

    Ok(session)
}

/// Pixel preprocessing plus tokenizer decoding
pub struct OnnxProcessor {
    tokenizer: Tokenizer,
    preprocess: PreprocessConfig,
    start_token_id: u32,
}

impl CaptionProcessor for OnnxProcessor {
    fn encode(&self, image: &DecodedImage) -> Result<ProcessorOutput, CaptionError> {
        Ok(ProcessorOutput {
            pixel_values: preprocess(image, &self.preprocess),
            input_ids: vec![self.start_token_id],
        })
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, CaptionError> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(|e| CaptionError::Generation(format!("Decoding failed: {}", e)))
    }
}

/// Vision encoder + text decoder driven by beam search
pub struct OnnxCaptionModel {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    decoder_inputs: Vec<String>,
    start_token_id: u32,
    eos_token_id: u32,
}

impl std::fmt::Debug for OnnxCaptionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxCaptionModel")
            .field("decoder_inputs", &self.decoder_inputs)
            .field("eos_token_id", &self.eos_token_id)
            .finish_non_exhaustive()
    }
}

impl OnnxCaptionModel {
    fn new(encoder: Session, decoder: Session, descriptor: &ModelDescriptor) -> Result<Self> {
        let decoder_inputs: Vec<String> = decoder.inputs.iter().map(|i| i.name.clone()).collect();
        if !decoder_inputs.iter().any(|n| n == "input_ids") {
            anyhow::bail!("Decoder has no input_ids input: {:?}", decoder_inputs);
        }
        if !decoder_inputs
            .iter()
            .any(|n| IMAGE_EMBEDDING_INPUTS.contains(&n.as_str()))
        {
            anyhow::bail!("Decoder has no image embedding input: {:?}", decoder_inputs);
        }

        Ok(Self {
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            decoder_inputs,
            start_token_id: descriptor.decoder_start_token_id,
            eos_token_id: descriptor.eos_token_id,
        })
    }

    fn encode_image(&self, pixel_values: ndarray::Array4<f32>) -> Result<ArrayD<f32>, CaptionError> {
        let mut session = self
            .encoder
            .lock()
            .map_err(|_| CaptionError::Generation("Encoder session lock poisoned".to_string()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());
        let input = Value::from_array(pixel_values).map_err(generation_error)?;
        let outputs = session
            .run(ort::inputs![input_name => input])
            .map_err(generation_error)?;
        let embeddings = outputs[0]
            .try_extract_array::<f32>()
            .map_err(generation_error)?;

        debug!("Image embeddings shape: {:?}", embeddings.shape());
        Ok(embeddings.to_owned())
    }

    /// Logits for the position after `tokens`
    fn next_logits(&self, embeddings: &ArrayD<f32>, tokens: &[u32]) -> Result<Vec<f32>, CaptionError> {
        let len = tokens.len();
        let ids = Array2::from_shape_vec((1, len), tokens.iter().map(|&t| t as i64).collect())
            .map_err(generation_error)?;
        let image_seq = if embeddings.ndim() >= 2 { embeddings.shape()[1] } else { 1 };

        let mut inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> = Vec::new();
        for name in &self.decoder_inputs {
            let value = match name.as_str() {
                "input_ids" => Value::from_array(ids.clone()).map_err(generation_error)?.into_dyn(),
                "attention_mask" => Value::from_array(Array2::<i64>::ones((1, len)))
                    .map_err(generation_error)?
                    .into_dyn(),
                "encoder_attention_mask" => Value::from_array(Array2::<i64>::ones((1, image_seq)))
                    .map_err(generation_error)?
                    .into_dyn(),
                n if IMAGE_EMBEDDING_INPUTS.contains(&n) => Value::from_array(embeddings.clone())
                    .map_err(generation_error)?
                    .into_dyn(),
                other => {
                    return Err(CaptionError::Generation(format!(
                        "Unsupported decoder input: {}",
                        other
                    )))
                }
            };
            inputs.push((Cow::Owned(name.clone()), value.into()));
        }

        let mut session = self
            .decoder
            .lock()
            .map_err(|_| CaptionError::Generation("Decoder session lock poisoned".to_string()))?;
        let outputs = session.run(inputs).map_err(generation_error)?;
        let logits = outputs[0]
            .try_extract_array::<f32>()
            .map_err(generation_error)?;

        last_position_logits(&logits)
    }
}

impl CaptionModel for OnnxCaptionModel {
    fn generate(&self, request: GenerateRequest) -> Result<Vec<u32>, CaptionError> {
        let embeddings = self.encode_image(request.pixel_values)?;
        let prompt = request.input_ids.unwrap_or_else(|| vec![self.start_token_id]);

        // Beam search is deterministic; temperature only affects sampling
        if let Some(t) = request.temperature.filter(|t| *t != 1.0) {
            debug!("Ignoring temperature {} for beam search", t);
        }
        let config = BeamConfig {
            num_beams: request.num_beams,
            max_length: request.max_length,
            eos_token_id: self.eos_token_id,
            early_stopping: request.early_stopping,
        };

        beam_search(&prompt, &config, |tokens| self.next_logits(&embeddings, tokens))
    }
}

/// Extract the last sequence position from decoder logits
///
/// Accepts `[batch, seq, vocab]` or `[seq, vocab]`.
pub fn last_position_logits(logits: &ArrayViewD<'_, f32>) -> Result<Vec<f32>, CaptionError> {
    let shape = logits.shape();
    let row = match shape.len() {
        3 if shape[1] > 0 => logits.slice_each_axis(|ax| match ax.axis.index() {
            0 => Slice::from(0..1),
            1 => Slice::from(shape[1] - 1..shape[1]),
            _ => Slice::from(..),
        }),
        2 if shape[0] > 0 => logits.slice_each_axis(|ax| match ax.axis.index() {
            0 => Slice::from(shape[0] - 1..shape[0]),
            _ => Slice::from(..),
        }),
        _ => {
            return Err(CaptionError::Generation(format!(
                "Unexpected decoder output shape: {:?}",
                shape
            )))
        }
    };

    Ok(row.iter().copied().collect())
}

fn generation_error(e: impl std::fmt::Display) -> CaptionError {
    CaptionError::Generation(e.to_string())
}
