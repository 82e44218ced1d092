// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dispatcher tests against a registry-backed manifest.

mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;

use actionhost::params::WebRequest;
use actionhost::response::InvocationResult;
use common::TestContext;

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_unknown_item_is_404() {
    let ctx = TestContext::new();

    for path in ["demo/missing", "nopkg/hello", "demo", ""] {
        let result = ctx.dispatcher.dispatch(path, &WebRequest::new("GET")).await;
        assert_eq!(
            result,
            InvocationResult::error(404, "The requested resource does not exist."),
            "path {:?}",
            path
        );
    }
}

#[tokio::test]
async fn test_action_inputs_and_query() {
    let ctx = TestContext::new();
    let request = WebRequest::new("GET").query("name=Ada");

    let result = ctx.dispatcher.dispatch("demo/hello", &request).await;

    assert_eq!(result, InvocationResult::new(200, json!({"message": "Hello Ada"})));
}

#[tokio::test]
async fn test_dispatch_is_idempotent() {
    let ctx = TestContext::new();
    let request = WebRequest::new("GET").query("name=Ada");

    let first = ctx.dispatcher.dispatch("demo/hello", &request).await;
    let second = ctx.dispatcher.dispatch("demo/hello", &request).await;

    assert_eq!(first, second);
    assert_eq!(ctx.registry.call_count("demo", "hello"), 2);
}

// ============================================================================
// Envelope
// ============================================================================

#[tokio::test]
async fn test_envelope_fields() {
    let ctx = TestContext::new();
    let request = WebRequest::new("POST")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.9")
        .body(r#"{"some":"json"}"#);

    let result = ctx.dispatcher.dispatch("demo/echo/a/b", &request).await;
    let body = result.body;

    assert_eq!(body["some"], json!("json"));
    assert_eq!(body["__ow_method"], json!("post"));
    assert_eq!(body["__ow_path"], json!("/a/b"));
    assert_eq!(body["__ow_headers"]["x-forwarded-for"], json!("127.0.0.1"));
    assert_eq!(body["region"], json!("eu"));
    assert!(body.get("__ow_body").is_none());
}

#[tokio::test]
async fn test_empty_ow_path_without_remainder() {
    let ctx = TestContext::new();
    let result = ctx.dispatcher.dispatch("demo/echo", &WebRequest::new("GET")).await;
    assert_eq!(result.body["__ow_path"], json!(""));
}

#[tokio::test]
async fn test_raw_action_receives_body_unparsed() {
    let ctx = TestContext::new();
    let request = WebRequest::new("POST")
        .header("content-type", "multipart/form-data; boundary=x")
        .query("a=1")
        .body("whisper words of wisdom");

    let result = ctx.dispatcher.dispatch("demo/rawecho", &request).await;
    let body = result.body;

    assert_eq!(body["__ow_body"], json!(BASE64.encode("whisper words of wisdom")));
    assert_eq!(body["__ow_query"], json!("a=1"));
}

#[tokio::test]
async fn test_env_interpolation_in_inputs() {
    let ctx = TestContext::new();
    let mut config = (**ctx.dispatcher.config()).clone();
    config
        .packages
        .get_mut("demo")
        .unwrap()
        .actions
        .get_mut("echo")
        .unwrap()
        .inputs
        .insert("token".to_string(), json!("Bearer ${ECHO_TOKEN}"));
    let dispatcher = actionhost::dispatcher::Dispatcher::new(
        std::sync::Arc::new(config),
        ctx.dispatcher.invoker().clone(),
    )
    .with_env("ECHO_TOKEN", "abc123");

    let result = dispatcher.dispatch("demo/echo", &WebRequest::new("GET")).await;

    assert_eq!(result.body["token"], json!("Bearer abc123"));
}

// ============================================================================
// Invocation outcomes
// ============================================================================

#[tokio::test]
async fn test_auth_required_without_header() {
    let ctx = TestContext::new();

    let result = ctx.dispatcher.dispatch("demo/secure", &WebRequest::new("GET")).await;

    assert_eq!(result.status_code, 401);
    assert_eq!(
        result.body,
        json!({"error": "cannot authorize request, reason: missing authorization header"})
    );
    assert_eq!(ctx.registry.call_count("demo", "secure"), 0);
}

#[tokio::test]
async fn test_auth_passes_with_header() {
    let ctx = TestContext::new();
    let request = WebRequest::new("GET").header("Authorization", "Bearer token");

    let result = ctx.dispatcher.dispatch("demo/secure", &request).await;

    assert_eq!(result.status_code, 200);
}

#[tokio::test]
async fn test_unbuilt_action_is_400() {
    let ctx = TestContext::new();

    let result = ctx.dispatcher.dispatch("demo/unbuilt", &WebRequest::new("GET")).await;

    assert_eq!(
        result,
        InvocationResult::error(
            400,
            "Response is not valid 'message/http'. unbuilt action not found, or does not export main"
        )
    );
}

#[tokio::test]
async fn test_no_response_is_204() {
    let ctx = TestContext::new();
    let result = ctx.dispatcher.dispatch("demo/silent", &WebRequest::new("GET")).await;
    assert_eq!(result, InvocationResult::new(204, json!("")));
}

#[tokio::test]
async fn test_non_web_action_is_still_served() {
    let ctx = TestContext::new();
    let result = ctx
        .dispatcher
        .dispatch("demo/internal", &WebRequest::new("GET"))
        .await;
    assert_eq!(result.status_code, 200);
    assert_eq!(ctx.registry.call_count("demo", "internal"), 1);
}
