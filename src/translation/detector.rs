// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Source-language detection

use thiserror::Error;
use tracing::debug;

/// Why a language could not be detected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectionError {
    #[error("Could not determine language")]
    Undetermined,

    #[error("Detected language {0} has no translation code")]
    Unmapped(String),
}

/// Maps text to a best-guess language code
///
/// Codes are the ones translation providers accept. They are not limited
/// to the catalog: a detected source outside it is still translated and
/// reported under the name "Unknown".
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Result<String, DetectionError>;
}

/// Trigram-based detector backed by `whatlang`
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Result<String, DetectionError> {
        let info = whatlang::detect(text).ok_or(DetectionError::Undetermined)?;
        let iso639_3 = info.lang().code();
        debug!(
            "whatlang: {} (confidence {:.2}, reliable {})",
            iso639_3,
            info.confidence(),
            info.is_reliable()
        );
        provider_code(iso639_3)
            .map(str::to_string)
            .ok_or_else(|| DetectionError::Unmapped(iso639_3.to_string()))
    }
}

/// Translate a whatlang ISO 639-3 code into the provider's code
///
/// Catalog languages map to their catalog code.
fn provider_code(iso639_3: &str) -> Option<&'static str> {
    Some(match iso639_3 {
        "eng" => "en",
        "spa" => "es",
        "fra" => "fr",
        "deu" => "de",
        "ita" => "it",
        "por" => "pt",
        "rus" => "ru",
        "jpn" => "ja",
        "kor" => "ko",
        "cmn" => "zh-CN",
        "ara" => "ar",
        "hin" => "hi",
        "ben" => "bn",
        "nld" => "nl",
        "pol" => "pl",
        "tur" => "tr",
        "vie" => "vi",
        "tha" => "th",
        "swe" => "sv",
        "dan" => "da",
        "fin" => "fi",
        "nob" | "nno" => "no",
        "ces" => "cs",
        "ell" => "el",
        "heb" => "he",
        "ind" => "id",
        "zlm" | "msa" => "ms",
        "ron" => "ro",
        "ukr" => "uk",
        "hun" => "hu",
        "slk" => "sk",
        "bul" => "bg",
        "hrv" => "hr",
        "srp" => "sr",
        "slv" => "sl",
        "lit" => "lt",
        "lav" => "lv",
        "est" => "et",
        "pes" | "fas" => "fa",
        "urd" => "ur",
        "swh" | "swa" => "sw",
        "tam" => "ta",
        "tel" => "te",
        "kan" => "kn",
        "mal" => "ml",
        "mar" => "mr",
        "guj" => "gu",
        // Detected by whatlang but outside the catalog
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "aze" => "az",
        "bel" => "be",
        "cat" => "ca",
        "epo" => "eo",
        "hye" => "hy",
        "jav" => "jw",
        "kat" => "ka",
        "khm" => "km",
        "lat" => "la",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "ori" => "or",
        "pan" => "pa",
        "sin" => "si",
        "sna" => "sn",
        "tgl" => "tl",
        "tuk" => "tk",
        "uzb" => "uz",
        "yid" => "yi",
        "zul" => "zu",
        _ => return None,
    })
}
