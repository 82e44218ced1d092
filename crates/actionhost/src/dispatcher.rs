// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Web-action dispatcher.
//!
//! Entry point for a request whose path has already had the mount prefix
//! removed: `{package}/{item}/{rest...}`. Resolves the item, builds the
//! envelope, and runs the action or sequence. Always produces a result.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::interpolate::process_env;
use crate::invoker::ActionInvoker;
use crate::manifest::{ActionConfig, Inputs};
use crate::params::{EnvelopeOptions, OW_PATH, WebRequest, build_params};
use crate::resolver::{Resolved, merged_inputs, resolve};
use crate::response::InvocationResult;
use crate::sequence::invoke_sequence;

/// Message for paths that do not name a known item.
pub const NOT_FOUND_MESSAGE: &str = "The requested resource does not exist.";

const NOT_FOUND_STATUS: u16 = 404;

/// Target of a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPath<'a> {
    /// Package segment.
    pub package: &'a str,
    /// Action or sequence segment.
    pub item: &'a str,
    /// Remainder as `/a/b`, or `""` when there is none.
    pub rest: String,
}

impl<'a> ActionPath<'a> {
    /// Split `package/item/rest...`. Returns `None` with fewer than two segments.
    pub fn parse(path: &'a str) -> Option<Self> {
        let mut segments = path.trim_start_matches('/').splitn(3, '/');
        let package = segments.next().filter(|s| !s.is_empty())?;
        let item = segments.next().filter(|s| !s.is_empty())?;
        let rest = match segments.next() {
            Some(rest) if !rest.is_empty() => format!("/{}", rest),
            _ => String::new(),
        };
        Some(Self {
            package,
            item,
            rest,
        })
    }
}

/// Dispatches web requests against a loaded manifest.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<ActionConfig>,
    invoker: ActionInvoker,
    env_overrides: HashMap<String, String>,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(config: Arc<ActionConfig>, invoker: ActionInvoker) -> Self {
        Self {
            config,
            invoker,
            env_overrides: HashMap::new(),
        }
    }

    /// Add a variable that takes precedence over the process environment
    /// during input interpolation.
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(name.into(), value.into());
        self
    }

    /// The manifest being served.
    pub fn config(&self) -> &Arc<ActionConfig> {
        &self.config
    }

    /// The invoker used for actions and sequence steps.
    pub fn invoker(&self) -> &ActionInvoker {
        &self.invoker
    }

    // Captured fresh for every request
    fn environment(&self) -> HashMap<String, String> {
        let mut env = process_env();
        env.extend(self.env_overrides.clone());
        env
    }

    /// Dispatch one request.
    pub async fn dispatch(&self, path: &str, request: &WebRequest) -> InvocationResult {
        let Some(target) = ActionPath::parse(path) else {
            debug!(path, "Path does not name a package and item");
            return not_found();
        };

        let Some(resolved) = resolve(&self.config, target.package, target.item) else {
            debug!(package = target.package, item = target.item, "No such action or sequence");
            return not_found();
        };

        let env = self.environment();
        // Sequence steps layer their own inputs
        let (inputs, final_params) = match resolved {
            Resolved::Action(action) => (
                merged_inputs(&self.config, action),
                action.annotations.final_params,
            ),
            Resolved::Sequence(_) => (Inputs::new(), false),
        };
        let options = EnvelopeOptions {
            raw: resolved.is_raw(),
            final_params,
        };
        let mut params = build_params(request, &inputs, options, &env);
        params.insert(OW_PATH.to_string(), target.rest.clone().into());

        match resolved {
            Resolved::Action(action) => {
                if !action.is_web_action() {
                    warn!(
                        action = %action.qualified_name(),
                        "Action is not a web action; it would be rejected in production \
                         without platform credentials"
                    );
                }
                self.invoker.invoke(action, params).await
            }
            Resolved::Sequence(sequence) => {
                invoke_sequence(&self.invoker, &self.config, Some(sequence), &params, &env)
                    .await
                    .unwrap_or_else(InvocationResult::no_content)
            }
        }
    }
}

fn not_found() -> InvocationResult {
    InvocationResult::error(NOT_FOUND_STATUS, NOT_FOUND_MESSAGE)
}
