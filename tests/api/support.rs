// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for router tests: an in-memory backend, a scripted
//! translation provider and multipart body helpers.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use caption_node::api::{create_app, AppState};
use caption_node::error::CaptionError;
use caption_node::pipeline::{CaptionPipeline, PipelineConfig};
use caption_node::translation::{DetectionError, LanguageDetector, TranslationProvider, Translator};
use caption_node::vision::captioner::{
    BackendLoader, CaptionModel, CaptionProcessor, CaptioningEngine, EngineOptions,
    GenerateRequest, LoadedBackend, ProcessorOutput,
};
use caption_node::vision::image_utils::DecodedImage;
use caption_node::vision::{Device, ModelDescriptor, ModelKey};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use serde_json::Value;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "caption-test-boundary";

struct KeyedProcessor {
    key: ModelKey,
}

impl CaptionProcessor for KeyedProcessor {
    fn encode(&self, _image: &DecodedImage) -> Result<ProcessorOutput, CaptionError> {
        Ok(ProcessorOutput {
            pixel_values: Array4::zeros((1, 3, 2, 2)),
            input_ids: vec![self.key.descriptor().decoder_start_token_id],
        })
    }

    fn decode(&self, _tokens: &[u32]) -> Result<String, CaptionError> {
        Ok(match self.key {
            ModelKey::Blip => "a red square on a table".to_string(),
            ModelKey::Git => "a red square".to_string(),
        })
    }
}

struct CountingModel {
    calls: Arc<AtomicUsize>,
}

impl CaptionModel for CountingModel {
    fn generate(&self, _request: GenerateRequest) -> Result<Vec<u32>, CaptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1, 2, 3])
    }
}

struct InMemoryLoader {
    generate_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl BackendLoader for InMemoryLoader {
    async fn load(
        &self,
        descriptor: &'static ModelDescriptor,
        _device: Device,
    ) -> Result<LoadedBackend, CaptionError> {
        Ok(LoadedBackend {
            processor: Arc::new(KeyedProcessor {
                key: descriptor.key,
            }),
            model: Arc::new(CountingModel {
                calls: self.generate_calls.clone(),
            }),
        })
    }
}

/// Provider that prefixes the target code, or fails every call
pub struct ScriptedProvider {
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl TranslationProvider for ScriptedProvider {
    async fn translate(&self, _source: &str, target: &str, text: &str) -> Result<String, CaptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CaptionError::TranslationProvider("HTTP 503".to_string()));
        }
        Ok(format!("[{}] {}", target, text))
    }
}

struct EnglishDetector;

impl LanguageDetector for EnglishDetector {
    fn detect(&self, _text: &str) -> Result<String, DetectionError> {
        Ok("en".to_string())
    }
}

/// A router over an in-memory pipeline plus its call counters
pub struct TestApp {
    pub state: AppState,
    pub generate_calls: Arc<AtomicUsize>,
    pub provider: Arc<ScriptedProvider>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with(PipelineConfig::default(), false).await
    }

    pub async fn with(config: PipelineConfig, failing_provider: bool) -> Self {
        let generate_calls = Arc::new(AtomicUsize::new(0));
        let loader = InMemoryLoader {
            generate_calls: generate_calls.clone(),
        };
        let engine = CaptioningEngine::initialize(
            Arc::new(loader),
            config.default_model,
            EngineOptions {
                device: Some(Device::Cpu),
                load_timeout: Duration::from_secs(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let provider = Arc::new(ScriptedProvider {
            fail: failing_provider,
            calls: AtomicUsize::new(0),
        });
        let translator = Translator::new(provider.clone(), Arc::new(EnglishDetector));
        let pipeline = CaptionPipeline::new(Arc::new(engine), translator, config);

        Self {
            state: AppState::new(Arc::new(pipeline)),
            generate_calls,
            provider,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        create_app(self.state.clone()).oneshot(request).await.unwrap()
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn provider_calls(&self) -> usize {
        self.provider.calls.load(Ordering::SeqCst)
    }
}

/// One multipart part
pub enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value).as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn caption_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/caption")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 30, 30])));
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg).unwrap();
    buf
}
