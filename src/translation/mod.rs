// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption translation
//!
//! Components:
//! - `languages` - The fixed catalog of supported languages
//! - `detector` - Source-language detection
//! - `provider` - External translation services
//! - `orchestrator` - Validation, detection fallback and identity skip

pub mod detector;
pub mod languages;
pub mod orchestrator;
pub mod provider;

pub use detector::{DetectionError, LanguageDetector, WhatlangDetector};
pub use languages::{display_name, is_supported, language_name, list_supported, Language};
pub use orchestrator::{TranslationResult, Translator, AUTO_DETECT};
pub use provider::{GoogleTranslateProvider, TranslationProvider, DEFAULT_TRANSLATE_ENDPOINT};
