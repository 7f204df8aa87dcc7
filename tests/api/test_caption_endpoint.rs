// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /api/caption tests
//!
//! Drives the router with hand-built multipart bodies against an in-memory
//! backend, covering:
//! - Captions with and without translation
//! - Upload rejections before any model runs
//! - Partial success when translation is unavailable
//! - Model selection and oversized uploads

use axum::http::StatusCode;
use caption_node::pipeline::PipelineConfig;

use super::support::{caption_request, json_body, jpeg, Part, TestApp};

#[cfg(test)]
mod caption_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_caption_without_language() {
        let app = TestApp::new().await;
        let image = jpeg(800, 600);

        let response = app
            .send(caption_request(&[Part::File {
                name: "image",
                filename: "photo.jpg",
                bytes: &image,
            }]))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["caption"], "a red square on a table");
        assert!((body["confidence"].as_f64().unwrap() - 0.85).abs() < 1e-6);
        assert_eq!(body["model_used"], "blip");
        assert!(body["timestamp"].as_str().is_some());
        assert!(body.get("translated_caption").is_none());
        assert!(body.get("language_name").is_none());
        assert!(body.get("warning").is_none());
        assert_eq!(app.provider_calls(), 0);
    }

    #[tokio::test]
    async fn test_caption_with_spanish_translation() {
        let app = TestApp::new().await;
        let image = jpeg(800, 600);

        let response = app
            .send(caption_request(&[
                Part::File {
                    name: "image",
                    filename: "photo.jpg",
                    bytes: &image,
                },
                Part::Text {
                    name: "language",
                    value: "es",
                },
            ]))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["translated_caption"], "[es] a red square on a table");
        assert_ne!(body["translated_caption"], body["caption"]);
        assert_eq!(body["language"], "es");
        assert_eq!(body["language_name"], "Spanish");
    }

    #[tokio::test]
    async fn test_english_target_skips_translation() {
        let app = TestApp::new().await;
        let image = jpeg(64, 64);

        let response = app
            .send(caption_request(&[
                Part::File {
                    name: "image",
                    filename: "photo.png",
                    bytes: &image,
                },
                Part::Text {
                    name: "language",
                    value: "en",
                },
            ]))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body.get("translated_caption").is_none());
        assert_eq!(app.provider_calls(), 0);
    }

    #[tokio::test]
    async fn test_text_renamed_to_jpg_rejected_before_model() {
        let app = TestApp::new().await;

        let response = app
            .send(caption_request(&[Part::File {
                name: "image",
                filename: "notes.jpg",
                bytes: b"shopping list: eggs, milk, bread",
            }]))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid image file");
        assert_eq!(app.generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_image_field() {
        let app = TestApp::new().await;

        let response = app
            .send(caption_request(&[Part::Text {
                name: "language",
                value: "fr",
            }]))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "No image file provided");
    }

    #[tokio::test]
    async fn test_empty_filename() {
        let app = TestApp::new().await;
        let image = jpeg(32, 32);

        let response = app
            .send(caption_request(&[Part::File {
                name: "image",
                filename: "",
                bytes: &image,
            }]))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file selected");
    }

    #[tokio::test]
    async fn test_disallowed_extension() {
        let app = TestApp::new().await;
        let image = jpeg(32, 32);

        let response = app
            .send(caption_request(&[Part::File {
                name: "image",
                filename: "photo.tiff",
                bytes: &image,
            }]))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Invalid file type. Allowed: jpg, jpeg, png, webp, bmp, gif"
        );
        assert_eq!(app.generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_language_returns_caption_with_warning() {
        let app = TestApp::new().await;
        let image = jpeg(32, 32);

        let response = app
            .send(caption_request(&[
                Part::File {
                    name: "image",
                    filename: "photo.jpeg",
                    bytes: &image,
                },
                Part::Text {
                    name: "language",
                    value: "xx",
                },
            ]))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["caption"], "a red square on a table");
        assert_eq!(body["warning"], "Language xx not supported");
        assert!(body.get("translated_caption").is_none());
        assert_eq!(app.provider_calls(), 0);
    }

    #[tokio::test]
    async fn test_translation_failure_is_partial_success() {
        let app = TestApp::with(PipelineConfig::default(), true).await;
        let image = jpeg(32, 32);

        let response = app
            .send(caption_request(&[
                Part::File {
                    name: "image",
                    filename: "photo.jpg",
                    bytes: &image,
                },
                Part::Text {
                    name: "language",
                    value: "de",
                },
            ]))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["caption"], "a red square on a table");
        assert!(body["warning"]
            .as_str()
            .unwrap()
            .starts_with("Translation failed"));
        assert_eq!(app.provider_calls(), 1);
    }

    #[tokio::test]
    async fn test_model_selection() {
        let app = TestApp::new().await;
        let image = jpeg(32, 32);

        let response = app
            .send(caption_request(&[
                Part::File {
                    name: "image",
                    filename: "photo.jpg",
                    bytes: &image,
                },
                Part::Text {
                    name: "model",
                    value: "git",
                },
            ]))
            .await;
        let body = json_body(response).await;
        assert_eq!(body["model_used"], "git");
        assert_eq!(body["caption"], "a red square");

        // Omitting the model returns to the configured default
        let response = app
            .send(caption_request(&[Part::File {
                name: "image",
                filename: "photo.jpg",
                bytes: &image,
            }]))
            .await;
        assert_eq!(json_body(response).await["model_used"], "blip");
    }

    #[tokio::test]
    async fn test_unknown_model_rejected() {
        let app = TestApp::new().await;
        let image = jpeg(32, 32);

        let response = app
            .send(caption_request(&[
                Part::File {
                    name: "image",
                    filename: "photo.jpg",
                    bytes: &image,
                },
                Part::Text {
                    name: "model",
                    value: "vit-gpt2",
                },
            ]))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error_type"], "unknown_model");
        assert_eq!(app.generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload() {
        let config = PipelineConfig {
            max_content_length: 4 * 1024,
            ..PipelineConfig::default()
        };
        let app = TestApp::with(config, false).await;
        let payload = vec![0xFFu8; 16 * 1024];

        let response = app
            .send(caption_request(&[Part::File {
                name: "image",
                filename: "huge.jpg",
                bytes: &payload,
            }]))
            .await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert_eq!(body["error"], "File too large. Maximum size: 0.0MB");
        assert_eq!(app.generate_calls(), 0);
    }
}
