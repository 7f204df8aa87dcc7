// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Supported language catalog

use serde::Serialize;

/// Display name used for codes missing from the catalog
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Language captions are generated in
pub const CAPTION_LANGUAGE: &str = "en";

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

const fn lang(code: &'static str, name: &'static str) -> Language {
    Language { code, name }
}

static LANGUAGES: [Language; 48] = [
    lang("en", "English"),
    lang("es", "Spanish"),
    lang("fr", "French"),
    lang("de", "German"),
    lang("it", "Italian"),
    lang("pt", "Portuguese"),
    lang("ru", "Russian"),
    lang("ja", "Japanese"),
    lang("ko", "Korean"),
    lang("zh-CN", "Chinese (Simplified)"),
    lang("zh-TW", "Chinese (Traditional)"),
    lang("ar", "Arabic"),
    lang("hi", "Hindi"),
    lang("bn", "Bengali"),
    lang("nl", "Dutch"),
    lang("pl", "Polish"),
    lang("tr", "Turkish"),
    lang("vi", "Vietnamese"),
    lang("th", "Thai"),
    lang("sv", "Swedish"),
    lang("da", "Danish"),
    lang("fi", "Finnish"),
    lang("no", "Norwegian"),
    lang("cs", "Czech"),
    lang("el", "Greek"),
    lang("he", "Hebrew"),
    lang("id", "Indonesian"),
    lang("ms", "Malay"),
    lang("ro", "Romanian"),
    lang("uk", "Ukrainian"),
    lang("hu", "Hungarian"),
    lang("sk", "Slovak"),
    lang("bg", "Bulgarian"),
    lang("hr", "Croatian"),
    lang("sr", "Serbian"),
    lang("sl", "Slovenian"),
    lang("lt", "Lithuanian"),
    lang("lv", "Latvian"),
    lang("et", "Estonian"),
    lang("fa", "Persian"),
    lang("ur", "Urdu"),
    lang("sw", "Swahili"),
    lang("ta", "Tamil"),
    lang("te", "Telugu"),
    lang("kn", "Kannada"),
    lang("ml", "Malayalam"),
    lang("mr", "Marathi"),
    lang("gu", "Gujarati"),
];

/// Every supported language, in catalog order
pub fn list_supported() -> &'static [Language] {
    &LANGUAGES
}

pub fn is_supported(code: &str) -> bool {
    language_name(code).is_some()
}

/// Display name for a catalog code (exact match)
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES.iter().find(|l| l.code == code).map(|l| l.name)
}

/// Display name, or `"Unknown"` for codes outside the catalog
pub fn display_name(code: &str) -> &'static str {
    language_name(code).unwrap_or(UNKNOWN_LANGUAGE)
}
