// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Translation orchestrator tests
//!
//! Verifies provider call counts with a mocked provider:
//! - Identical source and target never reach the provider
//! - Unsupported targets are rejected before detection
//! - Detection failures fall back to English
//! - Detected languages outside the catalog still reach the provider
//! - Provider failures are surfaced

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use caption_node::error::CaptionError;
use caption_node::translation::{
    DetectionError, LanguageDetector, TranslationProvider, Translator, AUTO_DETECT,
};
use mockall::{mock, predicate};

mock! {
    pub Provider {}

    #[async_trait]
    impl TranslationProvider for Provider {
        async fn translate(&self, source: &str, target: &str, text: &str) -> Result<String, CaptionError>;
    }
}

/// Detector returning a fixed answer and counting calls
struct CountingDetector {
    answer: Result<String, DetectionError>,
    calls: AtomicUsize,
}

impl CountingDetector {
    fn new(answer: Result<String, DetectionError>) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LanguageDetector for CountingDetector {
    fn detect(&self, _text: &str) -> Result<String, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

#[cfg(test)]
mod orchestrator_tests {
    use super::*;

    #[tokio::test]
    async fn test_same_language_skips_provider() {
        let mut provider = MockProvider::new();
        provider.expect_translate().times(0);
        let detector = CountingDetector::new(Ok("fr".to_string()));
        let translator = Translator::new(Arc::new(provider), detector.clone());

        let text = "un chat assis sur un canapé";
        let result = translator.translate(text, "fr", AUTO_DETECT).await.unwrap();

        assert_eq!(result.translated_text, text);
        assert_eq!(result.source_language, "fr");
        assert_eq!(result.target_language_name, "French");
        assert_eq!(detector.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_target_rejected_first() {
        let mut provider = MockProvider::new();
        provider.expect_translate().times(0);
        let detector = CountingDetector::new(Ok("en".to_string()));
        let translator = Translator::new(Arc::new(provider), detector.clone());

        let err = translator
            .translate("a cat", "xx", AUTO_DETECT)
            .await
            .unwrap_err();

        assert!(matches!(err, CaptionError::UnsupportedLanguage(ref code) if code == "xx"));
        assert_eq!(detector.calls(), 0);
    }

    #[tokio::test]
    async fn test_detection_failure_falls_back_to_english() {
        let mut provider = MockProvider::new();
        provider
            .expect_translate()
            .with(
                predicate::eq("en"),
                predicate::eq("de"),
                predicate::always(),
            )
            .times(1)
            .returning(|_, _, _| Ok("eine Katze".to_string()));
        let translator = Translator::new(
            Arc::new(provider),
            CountingDetector::new(Err(DetectionError::Undetermined)),
        );

        let result = translator.translate("a cat", "de", AUTO_DETECT).await.unwrap();
        assert_eq!(result.translated_text, "eine Katze");
        assert_eq!(result.source_language, "en");
        assert_eq!(result.source_language_name, "English");
        assert_eq!(result.target_language_name, "German");
    }

    #[tokio::test]
    async fn test_non_catalog_source_reaches_provider() {
        let mut provider = MockProvider::new();
        provider
            .expect_translate()
            .with(
                predicate::eq("ca"),
                predicate::eq("en"),
                predicate::eq("El gat dorm al sofà"),
            )
            .times(1)
            .returning(|_, _, _| Ok("The cat sleeps on the sofa".to_string()));
        let translator = Translator::new(
            Arc::new(provider),
            CountingDetector::new(Ok("ca".to_string())),
        );

        let result = translator
            .translate("El gat dorm al sofà", "en", AUTO_DETECT)
            .await
            .unwrap();
        assert_eq!(result.translated_text, "The cat sleeps on the sofa");
        assert_eq!(result.source_language, "ca");
        assert_eq!(result.source_language_name, "Unknown");
        assert_eq!(result.target_language_name, "English");
    }

    #[tokio::test]
    async fn test_provider_failure_is_surfaced() {
        let mut provider = MockProvider::new();
        provider
            .expect_translate()
            .times(1)
            .returning(|_, _, _| Err(CaptionError::TranslationProvider("HTTP 500".to_string())));
        let translator = Translator::new(
            Arc::new(provider),
            CountingDetector::new(Ok("en".to_string())),
        );

        let err = translator.translate("a cat", "es", AUTO_DETECT).await.unwrap_err();
        assert!(matches!(err, CaptionError::TranslationProvider(_)));
    }

    #[tokio::test]
    async fn test_batch_translate_keeps_order() {
        let mut provider = MockProvider::new();
        provider
            .expect_translate()
            .times(2)
            .returning(|_, _, text| Ok(format!("[it] {}", text)));
        let translator = Translator::new(
            Arc::new(provider),
            CountingDetector::new(Ok("en".to_string())),
        );

        let texts = vec!["a dog".to_string(), "a bird".to_string()];
        let results = translator.batch_translate(&texts, "it", AUTO_DETECT).await;

        let translated: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap().translated_text)
            .collect();
        assert_eq!(translated, vec!["[it] a dog", "[it] a bird"]);
    }

    #[test]
    fn test_catalog_lookups() {
        let translator = Translator::new(
            Arc::new(MockProvider::new()),
            CountingDetector::new(Ok("en".to_string())),
        );
        assert!(translator.is_supported("zh-CN"));
        assert!(!translator.is_supported("xx"));
        assert_eq!(translator.list_supported()[1].name, "Spanish");
        assert_eq!(translator.detect_language("anything"), Some("en".to_string()));
    }
}
