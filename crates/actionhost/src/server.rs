// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP adapter.
//!
//! Mounts the dispatcher under `/api/v1/web/...` and `/api/v1/...`. Both
//! prefixes dispatch identically. The path is percent-decoded before
//! dispatch.
//!
//! A single leading `web/` is always taken as the web marker, so a package
//! named `web` is reached as `/api/v1/web/web/...`.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::routing::any;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::dispatcher::Dispatcher;
use crate::params::WebRequest;
use crate::response::InvocationResult;

/// Prefix every action route lives under.
pub const API_PREFIX: &str = "/api/v1/";
/// Additional segment marking web-action routes.
pub const WEB_SEGMENT: &str = "web/";

/// Build the router.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/api/v1/{*path}", any(handle_action))
        .with_state(dispatcher)
        .layer(TraceLayer::new_for_http())
}

async fn handle_action(
    State(dispatcher): State<Arc<Dispatcher>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = action_path(uri.path());

    let mut request = WebRequest::new(method.as_str()).body(body);
    for (name, value) in &headers {
        request = request.header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }
    if let Some(query) = uri.query() {
        request = request.query(query);
    }

    render(dispatcher.dispatch(&path, &request).await)
}

/// Dispatcher path for a request path: the API prefix and one `web/`
/// segment removed, then percent-decoded.
pub fn action_path(uri_path: &str) -> String {
    let path = uri_path.strip_prefix(API_PREFIX).unwrap_or_default();
    let path = path.strip_prefix(WEB_SEGMENT).unwrap_or(path);
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Turn an invocation result into an HTTP response.
///
/// String bodies are sent verbatim; other JSON bodies are serialized with
/// `application/json` unless the action set its own content type.
pub fn render(result: InvocationResult) -> Response {
    let (content_type, body) = match result.body {
        Value::String(s) => (None, Body::from(s)),
        Value::Null => (None, Body::empty()),
        other => (Some("application/json"), Body::from(other.to_string())),
    };

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::from_u16(result.status_code).unwrap_or_else(|_| {
        warn!(status = result.status_code, "Action returned an invalid status code");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    for (name, value) in result.headers.into_iter().flatten() {
        let value = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(header = %name, "Dropping invalid response header"),
        }
    }

    response
}
