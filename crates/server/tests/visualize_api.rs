//! Integration tests for the HTTP API, driven through the router without
//! a listener. The encoder runs in stub mode so no model assets are
//! needed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use encoder::EncoderConfig;
use server::{build_router, ServerConfig, ServerState};

fn test_router() -> Router {
    let config = ServerConfig {
        metrics_enabled: false,
        encoder: EncoderConfig {
            mode: "stub".into(),
            ..Default::default()
        },
        ..Default::default()
    };
    let state = Arc::new(ServerState::new(config).expect("failed to create test state"));
    build_router(state)
}

async fn post_visualize(router: Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/visualize")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

#[tokio::test]
async fn hello_world_round_trip() {
    let (status, body) = post_visualize(test_router(), r#"{"text": "hello world"}"#).await;
    assert_eq!(status, StatusCode::OK);

    // [CLS] hello world [SEP]: two visible tokens, four of everything else.
    assert_eq!(body["tokens"], serde_json::json!(["hello", "world"]));
    assert_eq!(body["token_ids"].as_array().unwrap().len(), 4);

    let embeddings = body["embeddings"].as_array().unwrap();
    assert_eq!(embeddings.len(), 4);
    for row in embeddings {
        assert_eq!(row.as_array().unwrap().len(), 3);
    }

    let attention = body["attention_scores"].as_array().unwrap();
    assert_eq!(attention.len(), 4);
    for row in attention {
        assert_eq!(row.as_array().unwrap().len(), 4);
    }
}

#[tokio::test]
async fn technical_info_matches_the_payload() {
    let (status, body) = post_visualize(test_router(), r#"{"text": "hello world"}"#).await;
    assert_eq!(status, StatusCode::OK);

    let info = &body["technical_info"];
    assert_eq!(info["num_tokens"], 4);
    assert_eq!(info["input_text_length"], 11);
    assert_eq!(info["perplexity"], 5.0);
    assert_eq!(info["embedding_shape"][0], 4);
    assert!(info["vocab_size"].as_u64().unwrap() > 0);
    assert!(info["hidden_size"].as_u64().unwrap() > 0);
    assert!(info["num_attention_heads"].as_u64().unwrap() > 0);
    assert!(info["num_hidden_layers"].as_u64().unwrap() > 0);

    let hidden = info["hidden_size"].as_u64().unwrap() as usize;
    let original = body["original_embeddings"].as_array().unwrap();
    assert_eq!(original.len(), 4);
    assert_eq!(original[0].as_array().unwrap().len(), hidden);
}

#[tokio::test]
async fn plot_data_is_plotly_shaped() {
    let (status, body) = post_visualize(test_router(), r#"{"text": "plot me please"}"#).await;
    assert_eq!(status, StatusCode::OK);

    let trace = &body["plot_data"]["data"][0];
    assert_eq!(trace["type"], "scatter3d");
    assert_eq!(trace["mode"], "markers+text");
    assert_eq!(trace["marker"]["colorscale"], "Viridis");
    // Full sequence in the trace: 3 words + 2 boundary markers.
    assert_eq!(trace["x"].as_array().unwrap().len(), 5);
    assert_eq!(trace["text"].as_array().unwrap().len(), 5);

    let layout = &body["plot_data"]["layout"];
    assert_eq!(layout["scene"]["camera"]["eye"]["z"], 1.5);
    assert!(layout["title"].as_str().unwrap().contains("5 tokens"));
    assert_eq!(layout["scene"]["xaxis"]["range"].as_array().unwrap().len(), 2);

    let colorscales = body["available_colorscales"].as_array().unwrap();
    assert_eq!(colorscales[0], "Viridis");
}

#[tokio::test]
async fn empty_text_is_an_error_response() {
    let (status, body) = post_visualize(test_router(), r#"{"text": ""}"#).await;
    assert!(status.is_server_error());
    let message = body["error"].as_str().unwrap();
    assert!(!message.is_empty());
    assert!(message.contains("no text"));
}

#[tokio::test]
async fn missing_text_field_is_an_error_response() {
    let (status, body) = post_visualize(test_router(), "{}").await;
    assert!(status.is_server_error());
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn responses_are_reproducible_across_requests() {
    let (_, first) = post_visualize(test_router(), r#"{"text": "same input text"}"#).await;
    let (_, second) = post_visualize(test_router(), r#"{"text": "same input text"}"#).await;
    assert_eq!(first["embeddings"], second["embeddings"]);
    assert_eq!(first["attention_scores"], second["attention_scores"]);
}

#[tokio::test]
async fn health_and_readiness_respond() {
    let router = test_router();
    let response = router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["components"]["encoder"], "stub");
}

#[tokio::test]
async fn root_lists_the_visualize_endpoint() {
    let response = test_router()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["name"], "tokenlens");
    assert!(body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e == "/api/v1/visualize"));
}

#[tokio::test]
async fn unknown_route_is_404_with_error_body() {
    let response = test_router()
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn single_word_input_still_renders() {
    let (status, body) = post_visualize(test_router(), r#"{"text": "hi"}"#).await;
    assert_eq!(status, StatusCode::OK);

    // [CLS] hi [SEP]: below the stochastic threshold, linear fallback.
    let embeddings = body["embeddings"].as_array().unwrap();
    assert_eq!(embeddings.len(), 3);
    for row in embeddings {
        let row = row.as_array().unwrap();
        assert_eq!(row.len(), 3);
        for value in row {
            assert!(value.is_number());
        }
    }
    assert_eq!(body["tokens"].as_array().unwrap().len(), 1);
}
