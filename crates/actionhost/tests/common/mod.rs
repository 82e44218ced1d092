// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for actionhost integration tests.
//!
//! Provides a manifest with a few packages and a dispatcher backed by an
//! in-process [`FunctionRegistry`].

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};

use actionhost::dispatcher::Dispatcher;
use actionhost::invoker::ActionInvoker;
use actionhost::loader::FunctionRegistry;
use actionhost::manifest::ActionConfig;

/// Manifest shared by the integration tests.
pub const MANIFEST: &str = r#"
packages:
  demo:
    inputs:
      region: eu
    actions:
      hello:
        function: actions/hello/index.js
        web: 'yes'
        inputs:
          greeting: Hello
      secure:
        function: actions/secure/index.js
        web: 'yes'
        annotations:
          require-adobe-auth: true
      echo:
        function: actions/echo/index.js
        web: 'yes'
      rawecho:
        function: actions/rawecho/index.js
        web: raw
      internal:
        function: actions/internal/index.js
      silent:
        function: actions/silent/index.js
        web: 'yes'
      unbuilt:
        function: actions/unbuilt/index.js
        web: 'yes'
      addNumbers:
        function: actions/addNumbers/index.js
      squareNumber:
        function: actions/squareNumber/index.js
      reject:
        function: actions/reject/index.js
      echo all:
        function: actions/echo/index.js
        web: 'yes'
      tally:
        function: actions/tally/index.js
        inputs:
          payload: 10,20
      pinnedTally:
        function: actions/pinnedTally/index.js
        inputs:
          payload: 10,20
        annotations:
          final: true
    sequences:
      math:
        actions: addNumbers, squareNumber
        web: 'yes'
      guarded:
        actions: addNumbers, reject, squareNumber
        web: 'yes'
      broken:
        actions: addNumbers, nonexistent
        web: 'yes'
      nothing:
        actions: ''
        web: 'yes'
      tallied:
        actions: tally, squareNumber
        web: 'yes'
      pinned:
        actions: pinnedTally, squareNumber
        web: 'yes'
  web:
    actions:
      echo:
        function: actions/echo/index.js
        web: 'yes'
"#;

/// Test context holding the registry so tests can inspect call counts.
pub struct TestContext {
    pub registry: Arc<FunctionRegistry>,
    pub dispatcher: Arc<Dispatcher>,
}

impl TestContext {
    /// Create a context with every action except `unbuilt` registered.
    pub fn new() -> Self {
        let config = ActionConfig::from_yaml_str(MANIFEST).expect("test manifest parses");
        let registry = Arc::new(FunctionRegistry::new());
        register_actions(&registry);

        let invoker = ActionInvoker::new(registry.clone()).with_project_dir("/srv/app");
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(config), invoker));
        Self {
            registry,
            dispatcher,
        }
    }
}

fn register_actions(registry: &FunctionRegistry) {
    for name in ["hello", "secure", "internal"] {
        registry.register_fn("demo", name, |params, _| {
            let greeting = params.get("greeting").cloned().unwrap_or(Value::Null);
            let name = params.get("name").and_then(Value::as_str).unwrap_or("world");
            Ok(Some(json!({
                "body": {"message": format!("{} {}", greeting.as_str().unwrap_or("Hi"), name)}
            })))
        });
    }

    for (package, name) in [("demo", "echo"), ("demo", "echo all"), ("web", "echo")] {
        registry.register_fn(package, name, |params, _| {
            Ok(Some(json!({"body": Value::Object(params)})))
        });
    }
    registry.register_fn("demo", "rawecho", |params, _| {
        Ok(Some(json!({"body": Value::Object(params)})))
    });
    registry.register_fn("demo", "silent", |_, _| Ok(None));

    // Sums the comma-separated numbers in `payload`
    for name in ["addNumbers", "tally", "pinnedTally"] {
        registry.register_fn("demo", name, |params, _| {
            let sum: i64 = params
                .get("payload")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .split(',')
                .filter_map(|n| n.trim().parse::<i64>().ok())
                .sum();
            Ok(Some(json!({"body": {"payload": sum}})))
        });
    }

    // Squares `body.payload` from the previous step
    registry.register_fn("demo", "squareNumber", |params, _| {
        let n = params["body"]["payload"].as_i64().unwrap_or_default();
        Ok(Some(json!({"body": {"payload": n * n}})))
    });

    registry.register_fn("demo", "reject", |_, _| {
        Ok(Some(json!({"error": {"statusCode": 422, "body": {"error": "rejected"}}})))
    });
}
