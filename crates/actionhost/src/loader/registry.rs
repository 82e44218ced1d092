// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process function registry.
//!
//! Actions implemented as Rust closures, keyed by `package/action`. Used when
//! embedding the dispatcher and throughout the tests; every registered
//! function counts its calls.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::traits::*;
use crate::manifest::ActionDefinition;
use crate::params::Params;

type ActionFuture = Pin<Box<dyn Future<Output = Result<Option<Value>, ExecutionError>> + Send>>;
type Handler = Arc<dyn Fn(Params, ActivationContext) -> ActionFuture + Send + Sync>;

struct RegisteredFunction {
    handler: Handler,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ActionFunction for RegisteredFunction {
    async fn call(
        &self,
        params: Params,
        context: &ActivationContext,
    ) -> Result<Option<Value>, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        // A panic in the handler surfaces as a JoinError
        let handler = self.handler.clone();
        let context = context.clone();
        match tokio::spawn(async move { handler(params, context).await }).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(ExecutionError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(ExecutionError::Failed(e.to_string())),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct Entry {
    handler: Handler,
    calls: Arc<AtomicUsize>,
}

/// Loader backed by registered Rust functions.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: DashMap<String, Entry>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(package: &str, action: &str) -> String {
        format!("{}/{}", package, action)
    }

    /// Register an async function for `package/action`, replacing any
    /// previous registration and resetting its call count.
    pub fn register<F, Fut>(&self, package: &str, action: &str, function: F)
    where
        F: Fn(Params, ActivationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Value>, ExecutionError>> + Send + 'static,
    {
        let handler: Handler =
            Arc::new(move |params: Params, context: ActivationContext| -> ActionFuture {
                Box::pin(function(params, context))
            });
        self.functions.insert(
            Self::key(package, action),
            Entry {
                handler,
                calls: Arc::new(AtomicUsize::new(0)),
            },
        );
    }

    /// Register a synchronous function for `package/action`.
    pub fn register_fn<F>(&self, package: &str, action: &str, function: F)
    where
        F: Fn(Params, ActivationContext) -> Result<Option<Value>, ExecutionError>
            + Send
            + Sync
            + 'static,
    {
        let function = Arc::new(function);
        self.register(package, action, move |params, context| {
            let function = function.clone();
            async move { function(params, context) }
        });
    }

    /// Remove a registration. Returns whether one existed.
    pub fn unregister(&self, package: &str, action: &str) -> bool {
        self.functions.remove(&Self::key(package, action)).is_some()
    }

    /// How many times `package/action` has been called since registration.
    pub fn call_count(&self, package: &str, action: &str) -> usize {
        self.functions
            .get(&Self::key(package, action))
            .map(|e| e.calls.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

#[async_trait]
impl ActionLoader for FunctionRegistry {
    fn loader_type(&self) -> &'static str {
        "registry"
    }

    async fn load(&self, action: &ActionDefinition) -> Result<Arc<dyn ActionFunction>, LoadError> {
        let key = action.qualified_name();
        let entry = self
            .functions
            .get(&key)
            .ok_or(LoadError::NotRegistered(key))?;
        Ok(Arc::new(RegisteredFunction {
            handler: entry.handler.clone(),
            calls: entry.calls.clone(),
        }))
    }
}
