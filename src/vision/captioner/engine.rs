// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Captioning engine: owns the single active backend
//!
//! The active backend is held as a reference-counted snapshot. Generation
//! clones the snapshot and runs against it on the blocking pool, so a
//! concurrent switch never pulls a backend out from under an in-flight
//! request. Switches are serialized and staged: the new backend is loaded
//! completely before it replaces the old one, and a failed load leaves the
//! previous backend active.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::backend::{BackendLoader, LoadedBackend};
use super::protocol::GenerationParams;
use crate::error::CaptionError;
use crate::vision::device::{resolve_device, Device};
use crate::vision::image_utils::{normalize, DecodedImage, ImageSource, DEFAULT_MAX_DIMENSIONS};
use crate::vision::registry::{ModelDescriptor, ModelKey};

/// Confidence attached to every caption.
///
/// This is a fixed placeholder, not a probability derived from the
/// generated sequence. It carries no information about caption quality.
pub const PLACEHOLDER_CONFIDENCE: f32 = 0.85;

/// Default deadline for loading a backend
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// One generated caption
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionResult {
    pub caption: String,
    /// Always `PLACEHOLDER_CONFIDENCE`
    pub confidence: f32,
    pub model: ModelKey,
}

/// Engine construction options
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Explicit device; probed when `None`
    pub device: Option<Device>,
    pub load_timeout: Duration,
    /// Bound applied when `batch_generate` normalizes its inputs
    pub max_image_size: (u32, u32),
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            device: None,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            max_image_size: DEFAULT_MAX_DIMENSIONS,
        }
    }
}

/// The loaded backend together with the key and device it serves
#[derive(Debug)]
pub struct ActiveBackend {
    pub key: ModelKey,
    pub descriptor: &'static ModelDescriptor,
    pub device: Device,
    backend: LoadedBackend,
}

impl ActiveBackend {
    fn caption(&self, image: &DecodedImage, params: &GenerationParams) -> Result<CaptionResult, CaptionError> {
        let output = self.backend.processor.encode(image)?;
        let request = self.descriptor.protocol.build_request(output, params);
        let tokens = self.backend.model.generate(request)?;
        let text = self.backend.processor.decode(&tokens)?;

        Ok(CaptionResult {
            caption: text.trim().to_string(),
            confidence: PLACEHOLDER_CONFIDENCE,
            model: self.key,
        })
    }
}

/// Snapshot of engine state for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    pub model: ModelKey,
    pub backend_id: &'static str,
    pub device: Device,
}

/// Captioning engine with swappable backends
pub struct CaptioningEngine {
    loader: Arc<dyn BackendLoader>,
    device: Device,
    active: RwLock<Arc<ActiveBackend>>,
    switch_lock: Mutex<()>,
    load_timeout: Duration,
    max_image_size: (u32, u32),
}

impl std::fmt::Debug for CaptioningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptioningEngine")
            .field("model", &self.current_model())
            .field("device", &self.device)
            .field("load_timeout", &self.load_timeout)
            .finish_non_exhaustive()
    }
}

impl CaptioningEngine {
    /// Resolve the device and load the initial backend
    ///
    /// # Arguments
    /// - `loader`: Backend provider used for this and all later switches
    /// - `key`: Model to load first
    /// - `options`: Device override, load deadline and image bound
    ///
    /// # Errors
    /// Returns `CaptionError::ModelLoad` or `CaptionError::Timeout` if the
    /// backend cannot be loaded. No engine is constructed in that case.
    pub async fn initialize(
        loader: Arc<dyn BackendLoader>,
        key: ModelKey,
        options: EngineOptions,
    ) -> Result<Self, CaptionError> {
        let device = resolve_device(options.device);
        info!("Initializing captioning engine with {} on {}", key, device);

        let active = load_active(loader.as_ref(), key, device, options.load_timeout).await?;

        info!("✅ Captioning engine ready ({} on {})", key, device);

        Ok(Self {
            loader,
            device,
            active: RwLock::new(Arc::new(active)),
            switch_lock: Mutex::new(()),
            load_timeout: options.load_timeout,
            max_image_size: options.max_image_size,
        })
    }

    /// Key of the currently active backend
    pub fn current_model(&self) -> ModelKey {
        self.active_backend().key
    }

    /// Device all backends are loaded on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Shared handle to the active backend
    ///
    /// The handle stays valid after a switch; it simply stops being the
    /// active one.
    pub fn active_backend(&self) -> Arc<ActiveBackend> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn health(&self) -> EngineHealth {
        let active = self.active_backend();
        EngineHealth {
            model: active.key,
            backend_id: active.descriptor.backend_id,
            device: active.device,
        }
    }

    /// Make `key` the active backend
    ///
    /// No-op when `key` is already active. Otherwise the new backend is
    /// loaded on the engine's device and installed only once fully loaded.
    /// Returns the backend serving `key`, which stays usable even if a
    /// later switch replaces it.
    ///
    /// # Errors
    /// Returns the load error; the previous backend remains active.
    pub async fn switch_model(&self, key: ModelKey) -> Result<Arc<ActiveBackend>, CaptionError> {
        let _guard = self.switch_lock.lock().await;

        let active = self.active_backend();
        let current = active.key;
        if current == key {
            debug!("Model {} already active, skipping switch", key);
            return Ok(active);
        }

        info!("🔄 Switching model {} -> {}", current, key);
        let staged = match load_active(self.loader.as_ref(), key, self.device, self.load_timeout).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!("⚠️ Switch to {} failed, keeping {}: {}", key, current, e);
                return Err(e);
            }
        };

        let staged = Arc::new(staged);
        let previous = {
            let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *active, staged.clone())
        };
        debug!(
            "Released handle to {} ({} other holders)",
            previous.key,
            Arc::strong_count(&previous) - 1
        );

        info!("✅ Switched to {}", key);
        Ok(staged)
    }

    /// Generate a caption for one image with the active backend
    ///
    /// # Errors
    /// Invalid parameters yield `CaptionError::InvalidInput`; backend
    /// failures yield `CaptionError::Generation` or `Preprocessing`.
    pub async fn generate_caption(
        &self,
        image: DecodedImage,
        params: GenerationParams,
    ) -> Result<CaptionResult, CaptionError> {
        self.generate_with(self.active_backend(), image, params).await
    }

    /// Generate a caption with a specific backend snapshot
    ///
    /// Used with the handle returned by `switch_model` so the caption comes
    /// from the model that was selected, whatever is active by then.
    pub async fn generate_with(
        &self,
        active: Arc<ActiveBackend>,
        image: DecodedImage,
        params: GenerationParams,
    ) -> Result<CaptionResult, CaptionError> {
        params.validate()?;

        let (width, height) = (image.width(), image.height());
        let start = Instant::now();

        let result = tokio::task::spawn_blocking(move || active.caption(&image, &params))
            .await
            .map_err(|e| CaptionError::Generation(format!("Caption task failed: {}", e)))?;

        match &result {
            Ok(caption) => info!(
                "Captioned {}x{} image with {} in {}ms: '{}'",
                width,
                height,
                caption.model,
                start.elapsed().as_millis(),
                caption.caption
            ),
            Err(e) => error!("Caption generation failed for {}x{} image: {}", width, height, e),
        }

        result
    }

    /// Caption several images; one failure does not stop the rest
    ///
    /// Each input is normalized with the engine's image bound. The output
    /// has one entry per input, in order.
    pub async fn batch_generate(
        &self,
        sources: Vec<ImageSource<'_>>,
        params: GenerationParams,
    ) -> Vec<Result<CaptionResult, CaptionError>> {
        let total = sources.len();
        let mut results = Vec::with_capacity(total);

        for (index, source) in sources.into_iter().enumerate() {
            let result = match normalize(source, true, self.max_image_size) {
                Ok(image) => self.generate_caption(image, params).await,
                Err(e) => Err(CaptionError::from(e)),
            };
            if let Err(e) = &result {
                warn!("⚠️ Batch item {}/{} failed: {}", index + 1, total, e);
            }
            results.push(result);
        }

        results
    }
}

async fn load_active(
    loader: &dyn BackendLoader,
    key: ModelKey,
    device: Device,
    timeout: Duration,
) -> Result<ActiveBackend, CaptionError> {
    let descriptor = key.descriptor();
    let start = Instant::now();

    let backend = tokio::time::timeout(timeout, loader.load(descriptor, device))
        .await
        .map_err(|_| CaptionError::Timeout {
            operation: format!("Loading model {}", key),
            seconds: timeout.as_secs(),
        })??;

    info!(
        "Loaded {} ({}) in {}ms",
        key,
        descriptor.backend_id,
        start.elapsed().as_millis()
    );

    Ok(ActiveBackend {
        key,
        descriptor,
        device,
        backend,
    })
}
