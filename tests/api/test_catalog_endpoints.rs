// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Languages, models, health and fallback route tests

use axum::http::StatusCode;
use caption_node::api::{create_app, AppState};
use caption_node::translation::list_supported;
use tower::util::ServiceExt;

use super::support::{get, json_body, TestApp};

#[cfg(test)]
mod catalog_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_languages_listed_in_catalog_order() {
        let app = TestApp::new().await;

        let response = app.send(get("/api/languages")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        let languages = body["languages"].as_array().unwrap();
        assert_eq!(languages.len(), list_supported().len());
        assert_eq!(languages[0]["code"], "en");
        assert_eq!(languages[0]["name"], "English");
        assert_eq!(languages[1]["code"], "es");
    }

    #[tokio::test]
    async fn test_models_report_current_model() {
        let app = TestApp::new().await;

        let body = json_body(app.send(get("/api/models")).await).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["current_model"], "blip");

        let models = body["models"].as_array().unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0]["name"], "blip");
        assert_eq!(models[0]["display_name"], "BLIP (Salesforce)");
        assert_eq!(models[1]["name"], "git");
        assert_eq!(models[1]["description"], "Generative Image-to-text Transformer");
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new().await;

        let response = app.send(get("/api/health")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model"], "blip");
        assert_eq!(body["device"], "cpu");
        assert!(body["timestamp"].as_str().is_some());
        assert_eq!(body["version"]["version"], caption_node::version::VERSION_NUMBER);
        assert!(body["version"]["features"]
            .as_array()
            .unwrap()
            .iter()
            .any(|f| f == "caption-translation"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = TestApp::new().await;

        let response = app.send(get("/api/does-not-exist")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_unavailable_until_pipeline_installed() {
        let state = AppState::loading(1024);

        let response = create_app(state.clone())
            .oneshot(get("/api/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        // Catalog lookups do not need the engine
        let response = create_app(state).oneshot(get("/api/languages")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
