// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Loader trait definitions.
//!
//! Defines the abstract interface for locating action implementations and
//! calling them.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::manifest::ActionDefinition;
use crate::params::Params;

/// Environment variable carrying the activation id.
pub const ACTIVATION_ID_VAR: &str = "__OW_ACTIVATION_ID";
/// Environment variable carrying the fully qualified action name.
pub const ACTION_NAME_VAR: &str = "__OW_ACTION_NAME";
/// Environment variable carrying the namespace.
pub const NAMESPACE_VAR: &str = "__OW_NAMESPACE";

/// Errors locating or loading an action implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// No built module exists for the action.
    #[error("Module not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The module exists but has no usable entry point.
    #[error("Module does not export main: {}", .0.display())]
    NoMain(PathBuf),

    /// No in-process function is registered for the action.
    #[error("No function registered for {0}")]
    NotRegistered(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while an action executes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// Process exited with non-zero code.
    #[error("Exit code {exit_code}: {stderr}")]
    ExitCode {
        /// Exit code from the process (-1 if killed by a signal).
        exit_code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// The action produced output that is not JSON.
    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    /// The action panicked.
    #[error("Action panicked: {0}")]
    Panicked(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The action reported a failure.
    #[error("{0}")]
    Failed(String),
}

/// Per-invocation identity handed to the action.
///
/// This replaces mutating the server's own environment: spawned actions get
/// these values as environment variables on the child process, in-process
/// functions receive the context directly.
#[derive(Debug, Clone)]
pub struct ActivationContext {
    /// Fresh id for this activation (32 hex chars).
    pub activation_id: String,
    /// Namespace the action runs in.
    pub namespace: String,
    /// Package name.
    pub package: String,
    /// Action name.
    pub action: String,
    /// Directory of the action implementation; the action's working directory.
    pub working_dir: PathBuf,
    /// When the activation started.
    pub started_at: DateTime<Utc>,
}

impl ActivationContext {
    /// Create a context with a new activation id.
    pub fn new(
        namespace: impl Into<String>,
        package: impl Into<String>,
        action: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            activation_id: uuid::Uuid::new_v4().simple().to_string(),
            namespace: namespace.into(),
            package: package.into(),
            action: action.into(),
            working_dir: working_dir.into(),
            started_at: Utc::now(),
        }
    }

    /// `/namespace/package/action`.
    pub fn action_name(&self) -> String {
        format!("/{}/{}/{}", self.namespace, self.package, self.action)
    }

    /// Environment variables exposing this context to the action.
    pub fn env_vars(&self) -> [(&'static str, String); 3] {
        [
            (ACTIVATION_ID_VAR, self.activation_id.clone()),
            (ACTION_NAME_VAR, self.action_name()),
            (NAMESPACE_VAR, self.namespace.clone()),
        ]
    }
}

/// A loaded, callable action.
#[async_trait]
pub trait ActionFunction: Send + Sync {
    /// Call the action with its envelope.
    ///
    /// `Ok(None)` means the action returned nothing.
    async fn call(
        &self,
        params: Params,
        context: &ActivationContext,
    ) -> Result<Option<Value>, ExecutionError>;
}

/// Locates action implementations.
///
/// `load` is called on every invocation so that rebuilt actions are picked
/// up without restarting the server.
#[async_trait]
pub trait ActionLoader: Send + Sync {
    /// Loader type identifier (e.g., "process", "registry")
    fn loader_type(&self) -> &'static str;

    /// Load the current implementation of an action.
    async fn load(&self, action: &ActionDefinition) -> Result<Arc<dyn ActionFunction>, LoadError>;

    /// Drop any cached state for an action.
    fn invalidate(&self, _action: &ActionDefinition) {}
}
