// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Sequence invocation tests.

mod common;

use std::collections::HashMap;

use serde_json::json;

use actionhost::manifest::SequenceDefinition;
use actionhost::params::{Params, WebRequest};
use actionhost::response::InvocationResult;
use actionhost::sequence::invoke_sequence;
use common::TestContext;

fn payload(value: &str) -> Params {
    let mut params = Params::new();
    params.insert("payload".to_string(), json!(value));
    params
}

#[tokio::test]
async fn test_add_then_square() {
    let ctx = TestContext::new();
    let request = WebRequest::new("GET").query("payload=1,2,3");

    let result = ctx.dispatcher.dispatch("demo/math", &request).await;

    assert_eq!(result, InvocationResult::new(200, json!({"payload": 36})));
}

#[tokio::test]
async fn test_invoke_sequence_directly() {
    let ctx = TestContext::new();
    let config = ctx.dispatcher.config();
    let sequence = SequenceDefinition::new("demo", "math", "addNumbers,squareNumber");

    let result = invoke_sequence(
        ctx.dispatcher.invoker(),
        config,
        Some(&sequence),
        &payload("1,2,3"),
        &HashMap::new(),
    )
    .await;

    assert_eq!(result, Some(InvocationResult::new(200, json!({"payload": 36}))));
}

#[tokio::test]
async fn test_error_stops_the_chain() {
    let ctx = TestContext::new();
    let request = WebRequest::new("GET").query("payload=2");

    let result = ctx.dispatcher.dispatch("demo/guarded", &request).await;

    assert_eq!(result, InvocationResult::new(422, json!({"error": "rejected"})));
    assert_eq!(ctx.registry.call_count("demo", "addNumbers"), 1);
    assert_eq!(ctx.registry.call_count("demo", "reject"), 1);
    assert_eq!(ctx.registry.call_count("demo", "squareNumber"), 0);
}

#[tokio::test]
async fn test_missing_component_is_400() {
    let ctx = TestContext::new();

    let result = ctx
        .dispatcher
        .dispatch("demo/broken", &WebRequest::new("GET").query("payload=1"))
        .await;

    assert_eq!(
        result,
        InvocationResult::error(400, "Sequence component does not exist.")
    );
    assert_eq!(ctx.registry.call_count("demo", "addNumbers"), 1);
}

#[tokio::test]
async fn test_empty_sequence_has_no_result() {
    let ctx = TestContext::new();
    let empty = SequenceDefinition::new("demo", "nothing", "");

    let result = invoke_sequence(
        ctx.dispatcher.invoker(),
        ctx.dispatcher.config(),
        Some(&empty),
        &Params::new(),
        &HashMap::new(),
    )
    .await;
    assert_eq!(result, None);

    let result = invoke_sequence(
        ctx.dispatcher.invoker(),
        ctx.dispatcher.config(),
        None,
        &Params::new(),
        &HashMap::new(),
    )
    .await;
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_empty_sequence_renders_204() {
    let ctx = TestContext::new();
    let result = ctx
        .dispatcher
        .dispatch("demo/nothing", &WebRequest::new("GET"))
        .await;
    assert_eq!(result, InvocationResult::no_content());
}

#[tokio::test]
async fn test_first_step_body_overrides_step_inputs_like_single_action() {
    let ctx = TestContext::new();
    let request = WebRequest::new("POST")
        .header("content-type", "application/json")
        .body(r#"{"payload":"1,2,3"}"#);

    let single = ctx.dispatcher.dispatch("demo/tally", &request).await;
    let sequence = ctx.dispatcher.dispatch("demo/tallied", &request).await;

    assert_eq!(single, InvocationResult::new(200, json!({"payload": 6})));
    assert_eq!(sequence, InvocationResult::new(200, json!({"payload": 36})));
}

#[tokio::test]
async fn test_first_step_final_inputs_override_body() {
    let ctx = TestContext::new();
    let request = WebRequest::new("POST")
        .header("content-type", "application/json")
        .body(r#"{"payload":"1,2,3"}"#);

    let single = ctx.dispatcher.dispatch("demo/pinnedTally", &request).await;
    let sequence = ctx.dispatcher.dispatch("demo/pinned", &request).await;

    assert_eq!(single, InvocationResult::new(200, json!({"payload": 30})));
    assert_eq!(sequence, InvocationResult::new(200, json!({"payload": 900})));
}

#[tokio::test]
async fn test_first_step_inputs_fill_missing_request_fields() {
    let ctx = TestContext::new();

    let result = ctx
        .dispatcher
        .dispatch("demo/tallied", &WebRequest::new("GET"))
        .await;

    assert_eq!(result, InvocationResult::new(200, json!({"payload": 900})));
}
