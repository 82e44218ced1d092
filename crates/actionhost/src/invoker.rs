// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Action invoker.
//!
//! Runs one action through AUTH_CHECK, LOAD, EXECUTE and NORMALIZE. Every
//! failure is converted into an [`InvocationResult`] here; nothing past this
//! point returns an error to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::auth::AuthGate;
use crate::loader::{ActionLoader, ActivationContext};
use crate::manifest::ActionDefinition;
use crate::params::Params;
use crate::response::{ActionResponse, DEFAULT_ERROR_STATUS, InvocationResult};

/// Client-facing message for load and execution failures.
pub const INVALID_RESPONSE: &str = "Response is not valid 'message/http'.";

const UNAUTHORIZED_STATUS: u16 = 401;

/// Invokes single actions.
#[derive(Clone)]
pub struct ActionInvoker {
    loader: Arc<dyn ActionLoader>,
    auth: AuthGate,
    namespace: String,
    project_dir: PathBuf,
}

impl ActionInvoker {
    /// Create an invoker with the default auth gate, namespace `local` and
    /// the current directory as project root.
    pub fn new(loader: Arc<dyn ActionLoader>) -> Self {
        Self {
            loader,
            auth: AuthGate::new(),
            namespace: "local".to_string(),
            project_dir: PathBuf::from("."),
        }
    }

    /// Set the auth gate.
    pub fn with_auth_gate(mut self, auth: AuthGate) -> Self {
        self.auth = auth;
        self
    }

    /// Set the namespace reported to actions.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the root that action `function` paths are relative to.
    pub fn with_project_dir(mut self, project_dir: impl Into<PathBuf>) -> Self {
        self.project_dir = project_dir.into();
        self
    }

    /// The loader in use.
    pub fn loader(&self) -> &Arc<dyn ActionLoader> {
        &self.loader
    }

    /// Namespace reported to actions.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Directory an action runs in: the directory of its implementation.
    pub fn working_dir(&self, action: &ActionDefinition) -> PathBuf {
        let function = self.project_dir.join(&action.function);
        function
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.project_dir.clone())
    }

    /// Invoke an action with its envelope.
    pub async fn invoke(&self, action: &ActionDefinition, params: Params) -> InvocationResult {
        let name = action.qualified_name();

        if let Err(e) = self.auth.check(action, &params) {
            warn!(action = %name, reason = %e, "Rejected unauthorized invocation");
            return InvocationResult::error(UNAUTHORIZED_STATUS, e.to_string());
        }

        let function = match self.loader.load(action).await {
            Ok(function) => function,
            Err(e) => {
                error!(
                    action = %name,
                    loader = self.loader.loader_type(),
                    error = %e,
                    "Failed to load action"
                );
                return InvocationResult::error(
                    DEFAULT_ERROR_STATUS,
                    format!(
                        "{} {} action not found, or does not export main",
                        INVALID_RESPONSE, action.name
                    ),
                );
            }
        };

        let context = ActivationContext::new(
            &self.namespace,
            &action.package,
            &action.name,
            self.working_dir(action),
        );
        debug!(
            action = %name,
            activation_id = %context.activation_id,
            working_dir = %context.working_dir.display(),
            "Invoking action"
        );

        let value = match function.call(params, &context).await {
            Ok(value) => value,
            Err(e) => {
                error!(
                    action = %name,
                    activation_id = %context.activation_id,
                    error = %e,
                    "Action failed"
                );
                return InvocationResult::error(DEFAULT_ERROR_STATUS, INVALID_RESPONSE);
            }
        };

        let result: InvocationResult = ActionResponse::decode(value).into();
        let elapsed_ms = (chrono::Utc::now() - context.started_at).num_milliseconds();
        info!(
            action = %name,
            activation_id = %context.activation_id,
            status = result.status_code,
            elapsed_ms,
            "Action completed"
        );
        result
    }
}
