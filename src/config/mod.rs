// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Every flag falls back to an environment variable; a `.env` file in the
//! working directory is loaded before parsing.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::pipeline::PipelineConfig;
use crate::translation::provider::{DEFAULT_TRANSLATE_ENDPOINT, DEFAULT_TRANSLATE_TIMEOUT};
use crate::vision::captioner::{EngineOptions, GenerationParams};
use crate::vision::{Device, ModelKey};

/// Cache directory used when none is configured, relative to `$HOME`
pub const DEFAULT_CACHE_SUBDIR: &str = ".cache/image-captioner";

/// Image captioning and translation server
#[derive(Parser, Debug, Clone)]
#[command(name = "caption-node")]
#[command(version)]
#[command(about = "Image captioning and caption translation server", long_about = None)]
pub struct NodeConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Model used when a request does not name one (blip, git)
    #[arg(long, env = "DEFAULT_MODEL", default_value = "blip")]
    pub default_model: ModelKey,

    /// Compute device (cuda, coreml, cpu); probed when unset
    #[arg(long, env = "DEVICE")]
    pub device: Option<Device>,

    /// Local model cache directory
    #[arg(long, env = "MODEL_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Maximum upload size in bytes
    #[arg(long, env = "MAX_CONTENT_LENGTH", default_value_t = 10 * 1024 * 1024)]
    pub max_content_length: usize,

    /// Largest width/height kept after normalization
    #[arg(long, env = "MAX_IMAGE_DIM", default_value_t = 2048)]
    pub max_image_dim: u32,

    #[arg(long, env = "TRANSLATE_ENDPOINT", default_value = DEFAULT_TRANSLATE_ENDPOINT)]
    pub translate_endpoint: String,

    #[arg(long, env = "TRANSLATE_TIMEOUT_SECS", default_value_t = DEFAULT_TRANSLATE_TIMEOUT.as_secs())]
    pub translate_timeout_secs: u64,

    #[arg(long, env = "MODEL_LOAD_TIMEOUT_SECS", default_value_t = 600)]
    pub model_load_timeout_secs: u64,

    /// Only load models already present in the cache
    #[arg(long, env = "HF_HUB_OFFLINE")]
    pub offline: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl NodeConfig {
    /// Load `.env`, then parse flags and environment
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    /// Reject limits that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.max_content_length == 0 {
            bail!("max_content_length must be greater than 0");
        }
        if self.max_image_dim == 0 {
            bail!("max_image_dim must be greater than 0");
        }
        if self.translate_timeout_secs == 0 {
            bail!("translate_timeout_secs must be greater than 0");
        }
        if self.model_load_timeout_secs == 0 {
            bail!("model_load_timeout_secs must be greater than 0");
        }
        url_scheme(&self.translate_endpoint)
            .with_context(|| format!("Invalid translate endpoint '{}'", self.translate_endpoint))?;
        Ok(())
    }

    /// Seed RUST_LOG from `log_level` unless it is already set
    pub fn apply_log_level(&self) {
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", &self.log_level);
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    pub fn translate_timeout(&self) -> Duration {
        Duration::from_secs(self.translate_timeout_secs)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            device: self.device,
            load_timeout: Duration::from_secs(self.model_load_timeout_secs),
            max_image_size: (self.max_image_dim, self.max_image_dim),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            default_model: self.default_model,
            max_content_length: self.max_content_length,
            max_image_size: (self.max_image_dim, self.max_image_dim),
            generation: GenerationParams::default(),
        }
    }
}

/// `$HOME/.cache/image-captioner`, or a relative path without `$HOME`
pub fn default_cache_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(DEFAULT_CACHE_SUBDIR),
        None => PathBuf::from(DEFAULT_CACHE_SUBDIR),
    }
}

fn url_scheme(endpoint: &str) -> Result<&str> {
    let (scheme, rest) = endpoint.split_once("://").context("missing scheme")?;
    if !matches!(scheme, "http" | "https") || rest.is_empty() {
        bail!("expected an http(s) URL");
    }
    Ok(scheme)
}
