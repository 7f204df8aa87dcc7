// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use crate::config::default_cache_dir;
use crate::translation::languages::CAPTION_LANGUAGE;
use crate::translation::provider::{
    GoogleTranslateProvider, DEFAULT_TRANSLATE_ENDPOINT, DEFAULT_TRANSLATE_TIMEOUT,
};
use crate::translation::{list_supported, Translator, WhatlangDetector, AUTO_DETECT};
use crate::vision::captioner::{
    CaptioningEngine, EngineOptions, GenerationParams, OnnxBackendLoader,
};
use crate::vision::image_utils::{decode_image_bytes, format_to_extension, ImageSource};
use crate::vision::registry::list_models;
use crate::vision::{Device, ModelKey};

/// Arguments for the caption command
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Image files to caption
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Captioning model (blip, git)
    #[arg(long, default_value = "blip")]
    pub model: ModelKey,

    /// Translate captions into this language
    #[arg(long)]
    pub language: Option<String>,

    /// Compute device (cuda, coreml, cpu); probed when unset
    #[arg(long)]
    pub device: Option<Device>,

    #[arg(long, env = "MODEL_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Only use models already in the cache
    #[arg(long, env = "HF_HUB_OFFLINE")]
    pub offline: bool,

    #[arg(long, default_value_t = crate::vision::captioner::protocol::DEFAULT_NUM_BEAMS)]
    pub num_beams: usize,

    #[arg(long, default_value_t = crate::vision::captioner::protocol::DEFAULT_MAX_LENGTH)]
    pub max_length: usize,
}

/// Arguments for the translate command
#[derive(Args, Debug)]
pub struct TranslateArgs {
    pub text: String,

    /// Target language code
    #[arg(long)]
    pub to: String,

    /// Source language code, or "auto" to detect
    #[arg(long, default_value = AUTO_DETECT)]
    pub from: String,

    #[arg(long, env = "TRANSLATE_ENDPOINT", default_value = DEFAULT_TRANSLATE_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, default_value_t = DEFAULT_TRANSLATE_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

fn default_translator(endpoint: &str, timeout: Duration) -> Result<Translator> {
    let provider = GoogleTranslateProvider::new(endpoint, timeout)?;
    Ok(Translator::new(Arc::new(provider), Arc::new(WhatlangDetector)))
}

/// Caption every file, then translate the captions that succeeded
pub async fn caption(args: CaptionArgs) -> Result<()> {
    dotenv::dotenv().ok();

    let params = GenerationParams {
        num_beams: args.num_beams,
        max_length: args.max_length,
        ..GenerationParams::default()
    };
    params.validate()?;

    let cache_dir = args.cache_dir.clone().unwrap_or_else(default_cache_dir);
    let loader = OnnxBackendLoader::new(cache_dir).with_offline(args.offline);

    println!("🧠 Loading {} ...", args.model);
    let engine = CaptioningEngine::initialize(
        Arc::new(loader),
        args.model,
        EngineOptions {
            device: args.device,
            ..EngineOptions::default()
        },
    )
    .await
    .context("Failed to initialize captioning engine")?;
    println!("✅ {} ready on {}\n", engine.current_model(), engine.device());

    let sources = args
        .paths
        .iter()
        .map(|p| ImageSource::Path(p.as_path()))
        .collect();
    let results = engine.batch_generate(sources, params).await;

    let target = args
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty() && *l != CAPTION_LANGUAGE);

    let mut captions = Vec::new();
    let mut failures = 0;
    for (path, result) in args.paths.iter().zip(&results) {
        match result {
            Ok(caption) => {
                println!("📷 {}", path.display());
                println!("   {}", caption.caption);
                captions.push(caption.caption.clone());
            }
            Err(e) => {
                failures += 1;
                println!("❌ {}: {}", path.display(), e);
            }
        }
    }

    if let Some(target) = target {
        let translator = default_translator(DEFAULT_TRANSLATE_ENDPOINT, DEFAULT_TRANSLATE_TIMEOUT)?;
        if !translator.is_supported(target) {
            println!("\n⚠️ Language {} not supported", target);
        } else {
            println!("\n🌐 Translations ({})", target);
            for (caption, result) in captions
                .iter()
                .zip(translator.batch_translate(&captions, target, AUTO_DETECT).await)
            {
                match result {
                    Ok(t) => println!("   {} -> {}", caption, t.translated_text),
                    Err(e) => {
                        warn!("Translation of '{}' failed: {}", caption, e);
                        println!("   {} -> (translation failed: {})", caption, e);
                    }
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} images failed", failures, results.len());
    }
    Ok(())
}

pub async fn translate(args: TranslateArgs) -> Result<()> {
    let translator = default_translator(&args.endpoint, Duration::from_secs(args.timeout_secs))?;
    let result = translator.translate(&args.text, &args.to, &args.from).await?;

    println!(
        "{} ({}) -> {} ({})",
        result.source_language_name,
        result.source_language,
        result.target_language_name,
        result.target_language
    );
    println!("{}", result.translated_text);
    Ok(())
}

pub fn info(args: InfoArgs) -> Result<()> {
    for path in &args.paths {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        match decode_image_bytes(&bytes) {
            Ok((_, info)) => println!(
                "{}: {}x{} {} {} ({} bytes)",
                path.display(),
                info.width,
                info.height,
                info.color_mode,
                info.format.map(format_to_extension).unwrap_or("unknown"),
                info.size_bytes.unwrap_or(bytes.len())
            ),
            Err(e) => println!("❌ {}: {}", path.display(), e),
        }
    }
    Ok(())
}

pub fn print_languages() {
    println!("📋 Supported languages:");
    for language in list_supported() {
        println!("  {:<6} {}", language.code, language.name);
    }
}

pub fn print_models() {
    println!("📋 Captioning models:");
    for model in list_models() {
        println!("  {:<5} {} - {}", model.key.as_str(), model.display_name, model.description);
        println!("        {} (ONNX export: {})", model.backend_id, model.onnx_repo);
    }
}
