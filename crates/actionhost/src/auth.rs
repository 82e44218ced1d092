// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Authorization gate for actions annotated `require-adobe-auth`.
//!
//! Locally there is no identity provider, so the gate only checks that the
//! headers production would validate are present at all.

use serde_json::Value;
use thiserror::Error;

use crate::manifest::ActionDefinition;
use crate::params::{OW_HEADERS, Params};

/// Header always required by auth-gated actions.
pub const AUTHORIZATION_HEADER: &str = "authorization";
/// Header additionally required in strict mode.
pub const ORG_ID_HEADER: &str = "x-gw-ims-org-id";

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A required header is absent.
    #[error("cannot authorize request, reason: missing {0} header")]
    MissingHeader(String),
}

/// Checks required headers on the envelope.
#[derive(Debug, Clone)]
pub struct AuthGate {
    required_headers: Vec<String>,
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthGate {
    /// Gate requiring `authorization` only.
    pub fn new() -> Self {
        Self {
            required_headers: vec![AUTHORIZATION_HEADER.to_string()],
        }
    }

    /// Gate requiring `authorization` and `x-gw-ims-org-id`.
    pub fn strict() -> Self {
        Self {
            required_headers: vec![AUTHORIZATION_HEADER.to_string(), ORG_ID_HEADER.to_string()],
        }
    }

    /// Headers checked, in reporting order.
    pub fn required_headers(&self) -> &[String] {
        &self.required_headers
    }

    /// Check an action's envelope. Actions without the annotation always pass.
    pub fn check(&self, action: &ActionDefinition, params: &Params) -> Result<(), AuthError> {
        if !action.requires_auth() {
            return Ok(());
        }

        let headers = params.get(OW_HEADERS).and_then(Value::as_object);
        for required in &self.required_headers {
            let present = headers
                .map(|h| h.keys().any(|k| k.eq_ignore_ascii_case(required)))
                .unwrap_or(false);
            if !present {
                return Err(AuthError::MissingHeader(required.clone()));
            }
        }
        Ok(())
    }
}
