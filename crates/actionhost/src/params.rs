// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Invocation envelope construction.
//!
//! Builds the parameter object an action receives from an inbound request
//! and the item's static inputs. Field precedence, lowest first:
//!
//! 1. `__ow_headers`, `__ow_method`
//! 2. query-string values
//! 3. static inputs (interpolated against the environment)
//! 4. decoded body fields (non-raw JSON/form POST bodies)
//! 5. static inputs again, when the action marks them `final`

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde_json::Value;

use crate::interpolate::interpolate;
use crate::manifest::Inputs;

/// The envelope passed to an action.
pub type Params = serde_json::Map<String, Value>;

/// Request headers, as an object.
pub const OW_HEADERS: &str = "__ow_headers";
/// Lowercase request method.
pub const OW_METHOD: &str = "__ow_method";
/// Path remainder after `/{package}/{item}`.
pub const OW_PATH: &str = "__ow_path";
/// Undecoded body.
pub const OW_BODY: &str = "__ow_body";
/// Unparsed query string (raw actions only).
pub const OW_QUERY: &str = "__ow_query";

const FORWARDED_FOR: &str = "x-forwarded-for";
const LOCALHOST: &str = "127.0.0.1";

/// A transport-independent view of an inbound HTTP request.
#[derive(Debug, Clone, Default)]
pub struct WebRequest {
    /// Request method as received, e.g. `POST`.
    pub method: String,
    /// Header name/value pairs in arrival order.
    pub headers: Vec<(String, String)>,
    /// Query string without the leading `?`.
    pub query: Option<String>,
    /// Request body.
    pub body: Bytes,
}

impl WebRequest {
    /// Create a request with no headers, query or body.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the query string.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header, matched case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Media type of the body without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header_value("content-type").map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

/// How the body should be treated.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeOptions {
    /// Raw web action: never decode the body.
    pub raw: bool,
    /// Static inputs win over request-derived values.
    pub final_params: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    fn of(content_type: Option<&str>) -> Self {
        match content_type {
            Some("application/json") => BodyKind::Json,
            Some(ct) if ct.ends_with("+json") => BodyKind::Json,
            Some("application/x-www-form-urlencoded") => BodyKind::Form,
            _ => BodyKind::Other,
        }
    }
}

/// Interpolate every static input against `env`.
pub fn interpolate_inputs(inputs: &Inputs, env: &HashMap<String, String>) -> Params {
    inputs
        .iter()
        .map(|(k, v)| (k.clone(), interpolate(v, env)))
        .collect()
}

/// Build the envelope for one invocation.
pub fn build_params(
    request: &WebRequest,
    inputs: &Inputs,
    options: EnvelopeOptions,
    env: &HashMap<String, String>,
) -> Params {
    let mut params = Params::new();

    params.insert(OW_HEADERS.to_string(), Value::Object(header_object(request)));
    params.insert(
        OW_METHOD.to_string(),
        Value::String(request.method.to_lowercase()),
    );

    let query = request.query.as_deref().unwrap_or_default();
    params.extend(query_values(query.as_bytes()));
    if options.raw {
        params.insert(OW_QUERY.to_string(), Value::String(query.to_string()));
    }

    let inputs = interpolate_inputs(inputs, env);
    params.extend(inputs.clone());

    if request.method.eq_ignore_ascii_case("post") {
        let content_type = request.content_type();
        let kind = BodyKind::of(content_type.as_deref());
        if options.raw {
            params.insert(
                OW_BODY.to_string(),
                Value::String(raw_body(&request.body, kind)),
            );
        } else if !request.body.is_empty() {
            merge_body(&mut params, &request.body, kind);
        }
    }

    if options.final_params {
        params.extend(inputs);
    }

    params
}

fn header_object(request: &WebRequest) -> Params {
    let mut headers = Params::new();
    for (name, value) in &request.headers {
        if name.eq_ignore_ascii_case(FORWARDED_FOR) {
            continue;
        }
        match headers.get_mut(name) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            _ => {
                headers.insert(name.clone(), Value::String(value.clone()));
            }
        }
    }
    headers.insert(FORWARDED_FOR.to_string(), Value::String(LOCALHOST.to_string()));
    headers
}

/// Decode `a=1&b=2` into fields. Repeated keys collect into an array.
pub fn query_values(encoded: &[u8]) -> Params {
    let mut values = Params::new();
    for (key, value) in url::form_urlencoded::parse(encoded) {
        let value = Value::String(value.into_owned());
        match values.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                values.insert(key.into_owned(), value);
            }
        }
    }
    values
}

fn merge_body(params: &mut Params, body: &[u8], kind: BodyKind) {
    match kind {
        BodyKind::Json => match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => params.extend(fields),
            _ => {
                params.insert(OW_BODY.to_string(), Value::String(raw_body(body, kind)));
            }
        },
        BodyKind::Form => params.extend(query_values(body)),
        BodyKind::Other => {
            params.insert(OW_BODY.to_string(), Value::String(raw_body(body, kind)));
        }
    }
}

/// Encode a body for `__ow_body`.
///
/// Form bodies are normalized to a query string without base64. JSON bodies
/// are re-serialized before encoding, and an empty object becomes `""`.
/// Anything else is base64 of the bytes as received.
fn raw_body(body: &[u8], kind: BodyKind) -> String {
    if body.is_empty() {
        return String::new();
    }
    match kind {
        BodyKind::Form => url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(url::form_urlencoded::parse(body))
            .finish(),
        BodyKind::Json => match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) if fields.is_empty() => String::new(),
            Ok(value) => BASE64.encode(value.to_string()),
            Err(_) => BASE64.encode(body),
        },
        BodyKind::Other => BASE64.encode(body),
    }
}
