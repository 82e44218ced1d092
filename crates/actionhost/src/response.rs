// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Action return values and their normalized HTTP shape.
//!
//! Actions may return anything. [`ActionResponse::decode`] classifies the
//! value with fixed precedence rules, and [`InvocationResult`] is the uniform
//! `{statusCode, headers?, body}` every invocation ends in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::params::Params;

/// Default status for a response without an explicit one.
pub const DEFAULT_STATUS: u16 = 200;
/// Status for an invocation that produced no response.
pub const NO_CONTENT_STATUS: u16 = 204;
/// Status for an `error` response without an explicit one.
pub const DEFAULT_ERROR_STATUS: u16 = 400;

/// Normalized result of one action or sequence invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers, if the action set any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    /// Response body; `""` for none.
    pub body: Value,
}

impl InvocationResult {
    /// Result with a status and body and no headers.
    pub fn new(status_code: u16, body: Value) -> Self {
        Self {
            status_code,
            headers: None,
            body,
        }
    }

    /// Result with an `{error: message}` body.
    pub fn error(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(status_code, json!({ "error": message.into() }))
    }

    /// `204` with an empty body.
    pub fn no_content() -> Self {
        Self::new(NO_CONTENT_STATUS, Value::String(String::new()))
    }

    /// Whether this result stops a sequence.
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }

    /// Fields of the result as parameters for the next sequence step.
    pub fn into_params(self) -> Params {
        let mut params = Params::new();
        params.insert("statusCode".to_string(), json!(self.status_code));
        if let Some(headers) = self.headers {
            params.insert("headers".to_string(), Value::Object(headers));
        }
        params.insert("body".to_string(), self.body);
        params
    }
}

/// An action return value, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResponse {
    /// Nothing (or a falsy value) was returned.
    NoContent,
    /// A regular response.
    Success {
        /// Status code, defaulted to 200.
        status_code: u16,
        /// Headers, if an object was given.
        headers: Option<Map<String, Value>>,
        /// Body, defaulted to `""`.
        body: Value,
    },
    /// The action returned an `error` object carrying `statusCode` and/or `body`.
    Failure {
        /// Status from `error`, then the top level, then 400.
        status_code: u16,
        /// Headers from the top level.
        headers: Option<Map<String, Value>>,
        /// Body from `error`, then the top level, then `""`.
        body: Value,
    },
}

impl ActionResponse {
    /// Classify a return value.
    ///
    /// 1. absent or falsy (`null`, `false`, `0`, `""`): no content
    /// 2. object whose `error` is an object with `statusCode` or `body`: failure
    /// 3. any other object: success from its `statusCode`/`headers`/`body`
    /// 4. any other value: success with the value as body
    pub fn decode(value: Option<Value>) -> Self {
        let value = match value {
            Some(v) if is_truthy(&v) => v,
            _ => return ActionResponse::NoContent,
        };

        let Value::Object(mut fields) = value else {
            return ActionResponse::Success {
                status_code: DEFAULT_STATUS,
                headers: None,
                body: value,
            };
        };

        let headers = match fields.remove("headers") {
            Some(Value::Object(h)) => Some(h),
            _ => None,
        };
        let top_status = fields.get("statusCode").and_then(status_code);

        if let Some(Value::Object(mut error)) = fields.remove("error")
            && (error.contains_key("statusCode") || error.contains_key("body"))
        {
            let status_code = error
                .get("statusCode")
                .and_then(status_code)
                .or(top_status)
                .unwrap_or(DEFAULT_ERROR_STATUS);
            let body = error
                .remove("body")
                .or_else(|| fields.remove("body"))
                .unwrap_or_else(|| Value::String(String::new()));
            return ActionResponse::Failure {
                status_code,
                headers,
                body,
            };
        }

        ActionResponse::Success {
            status_code: top_status.unwrap_or(DEFAULT_STATUS),
            headers,
            body: fields
                .remove("body")
                .unwrap_or_else(|| Value::String(String::new())),
        }
    }
}

impl From<ActionResponse> for InvocationResult {
    fn from(response: ActionResponse) -> Self {
        match response {
            ActionResponse::NoContent => InvocationResult::no_content(),
            ActionResponse::Success {
                status_code,
                headers,
                body,
            }
            | ActionResponse::Failure {
                status_code,
                headers,
                body,
            } => InvocationResult {
                status_code,
                headers,
                body,
            },
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn status_code(value: &Value) -> Option<u16> {
    let code = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (100..=599).contains(&code).then_some(code as u16)
}
