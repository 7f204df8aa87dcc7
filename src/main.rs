// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;

use anyhow::{Context, Result};
use caption_node::{
    api::{start_server, AppState},
    config::NodeConfig,
    pipeline::CaptionPipeline,
    translation::{GoogleTranslateProvider, Translator, WhatlangDetector},
    vision::captioner::{CaptioningEngine, OnnxBackendLoader},
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::load();

    // Initialize tracing subscriber for logging
    config.apply_log_level();
    tracing_subscriber::fmt::init();

    println!("🚀 Starting {}...\n", caption_node::version::get_version_string());
    println!("📦 BUILD VERSION: {}", caption_node::version::VERSION);
    println!("📅 Build Date: {}", caption_node::version::BUILD_DATE);
    println!();

    config.validate().context("Invalid configuration")?;

    let addr = config.socket_addr();
    let cache_dir = config.cache_dir();
    info!(
        "Configuration: addr={} default_model={} cache_dir={} offline={}",
        addr,
        config.default_model,
        cache_dir.display(),
        config.offline
    );

    // Serve immediately; handlers answer 503 until the engine is installed
    let state = AppState::loading(config.max_content_length);
    let server = tokio::spawn(start_server(state.clone(), addr));

    println!("🧠 Loading captioning model {}...", config.default_model);
    let loader = OnnxBackendLoader::new(cache_dir).with_offline(config.offline);
    let engine = match CaptioningEngine::initialize(
        Arc::new(loader),
        config.default_model,
        config.engine_options(),
    )
    .await
    {
        Ok(engine) => engine,
        Err(e) => {
            error!("❌ Failed to initialize captioning engine: {}", e);
            server.abort();
            return Err(e).context("Failed to initialize captioning engine");
        }
    };
    println!(
        "✅ Captioning engine ready: {} on {}",
        engine.current_model(),
        engine.device()
    );

    let provider = GoogleTranslateProvider::new(&config.translate_endpoint, config.translate_timeout())?;
    let translator = Translator::new(Arc::new(provider), Arc::new(WhatlangDetector));

    let pipeline = CaptionPipeline::new(Arc::new(engine), translator, config.pipeline_config());
    state.install(Arc::new(pipeline)).await;
    println!("✅ Caption Node ready on http://{}\n", addr);

    server.await.context("Server task panicked")??;

    println!("👋 Caption Node stopped");
    Ok(())
}
