// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! External translation providers

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::CaptionError;

/// Google Translate web endpoint
pub const DEFAULT_TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

pub const DEFAULT_TRANSLATE_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) const RATE_LIMIT_MAX_RETRIES: usize = 3;
pub(crate) const RATE_LIMIT_BASE_DELAY: Duration = Duration::from_millis(500);
pub(crate) const RATE_LIMIT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Stateless (source, target, text) -> translated text service
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(&self, source: &str, target: &str, text: &str) -> Result<String, CaptionError>;
}

/// Provider backed by the public Google Translate web endpoint
#[derive(Debug, Clone)]
pub struct GoogleTranslateProvider {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    base_delay: Duration,
}

impl GoogleTranslateProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CaptionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CaptionError::TranslationProvider(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
            base_delay: RATE_LIMIT_BASE_DELAY,
        })
    }

    /// First rate-limit backoff; later waits double up to the cap
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay.min(RATE_LIMIT_MAX_DELAY);
        self
    }

    async fn request_once(&self, source: &str, target: &str, text: &str) -> Result<Attempt, CaptionError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(CaptionError::Timeout {
                    operation: "Translation request".to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
            Err(e) => return Err(CaptionError::TranslationProvider(e.to_string())),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| CaptionError::TranslationProvider(e.to_string()))?;

        if is_rate_limited(status) {
            return Ok(Attempt::RateLimited(retry_after(&headers)));
        }
        if !status.is_success() {
            return Err(CaptionError::TranslationProvider(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| CaptionError::TranslationProvider(format!("Invalid response: {}", e)))?;
        parse_translation(&json).map(Attempt::Done)
    }
}

enum Attempt {
    Done(String),
    RateLimited(Option<Duration>),
}

#[async_trait]
impl TranslationProvider for GoogleTranslateProvider {
    async fn translate(&self, source: &str, target: &str, text: &str) -> Result<String, CaptionError> {
        let mut delay = self.base_delay;
        let mut attempt = 0;
        loop {
            match self.request_once(source, target, text).await? {
                Attempt::Done(translated) => {
                    debug!("Translated {} chars {} -> {}", text.len(), source, target);
                    return Ok(translated);
                }
                Attempt::RateLimited(retry_after) => {
                    attempt += 1;
                    if attempt > RATE_LIMIT_MAX_RETRIES {
                        return Err(CaptionError::TranslationProvider(
                            "Rate limited by translation service".to_string(),
                        ));
                    }
                    let wait = retry_after.map_or(delay, |r| r.max(delay)).min(RATE_LIMIT_MAX_DELAY);
                    warn!(
                        "Translation rate limited; retrying in {:.1}s (attempt {}/{})",
                        wait.as_secs_f32(),
                        attempt,
                        RATE_LIMIT_MAX_RETRIES
                    );
                    sleep(wait).await;
                    delay = next_delay(delay);
                }
            }
        }
    }
}

pub(crate) fn is_rate_limited(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?.trim();
    value.parse::<u64>().ok().map(Duration::from_secs)
}

pub(crate) fn next_delay(current: Duration) -> Duration {
    current.saturating_mul(2).min(RATE_LIMIT_MAX_DELAY)
}

/// Join the translated segments of a `translate_a/single` response
///
/// The response is `[[["segment", "source", ...], ...], ...]`.
pub fn parse_translation(json: &Value) -> Result<String, CaptionError> {
    let segments = json
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| CaptionError::TranslationProvider("Missing translation segments".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(CaptionError::TranslationProvider(
            "Empty translation returned".to_string(),
        ));
    }
    Ok(translated)
}
