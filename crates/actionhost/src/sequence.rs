// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Sequence invoker.
//!
//! Steps run strictly one after another. The first step sees the request
//! envelope; every later step sees the request method and headers plus the
//! previous step's result. A step ending in `statusCode >= 400` stops the
//! chain and becomes the sequence's result.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::invoker::ActionInvoker;
use crate::manifest::{ActionConfig, SequenceDefinition};
use crate::params::{OW_HEADERS, OW_METHOD, Params, interpolate_inputs};
use crate::resolver::{Resolved, merged_inputs, resolve};
use crate::response::{DEFAULT_ERROR_STATUS, InvocationResult};

/// Message returned when a step names an unknown action.
pub const MISSING_COMPONENT: &str = "Sequence component does not exist.";

/// Parameters for step `index`.
///
/// Step 0 gets `step_inputs` with the request-derived `original` on top,
/// the same precedence a single action gets. Later steps get `__ow_method`
/// and `__ow_headers` from `original`, then `step_inputs`, then the fields
/// of `previous`. With `final_params` the step inputs are re-applied last.
pub fn step_params(
    index: usize,
    original: &Params,
    step_inputs: Params,
    final_params: bool,
    previous: Option<InvocationResult>,
) -> Params {
    let mut params = Params::new();
    if index == 0 {
        params.extend(step_inputs.clone());
        params.extend(original.clone());
    } else {
        for key in [OW_METHOD, OW_HEADERS] {
            if let Some(value) = original.get(key) {
                params.insert(key.to_string(), value.clone());
            }
        }
        params.extend(step_inputs.clone());
        if let Some(previous) = previous {
            params.extend(previous.into_params());
        }
    }

    if final_params {
        params.extend(step_inputs);
    }
    params
}

/// Run a sequence.
///
/// `params` is the request envelope without static inputs; each step adds
/// the inputs of its own action. Returns `None` when there is no sequence
/// or it has no steps.
pub async fn invoke_sequence(
    invoker: &ActionInvoker,
    config: &ActionConfig,
    sequence: Option<&SequenceDefinition>,
    params: &Params,
    env: &HashMap<String, String>,
) -> Option<InvocationResult> {
    let sequence = sequence?;
    let mut previous: Option<InvocationResult> = None;

    for (index, step) in sequence.actions.iter().enumerate() {
        let Some(Resolved::Action(action)) = resolve(config, &sequence.package, step) else {
            warn!(
                sequence = %sequence.name,
                package = %sequence.package,
                step = %step,
                "Sequence step is not an action"
            );
            return Some(InvocationResult::error(DEFAULT_ERROR_STATUS, MISSING_COMPONENT));
        };

        let inputs = interpolate_inputs(&merged_inputs(config, action), env);
        let envelope = step_params(
            index,
            params,
            inputs,
            action.annotations.final_params,
            previous.take(),
        );

        debug!(sequence = %sequence.name, index, action = %action.name, "Running sequence step");
        let result = invoker.invoke(action, envelope).await;

        if result.is_error() {
            debug!(
                sequence = %sequence.name,
                index,
                status = result.status_code,
                "Sequence stopped"
            );
            return Some(result);
        }
        previous = Some(result);
    }

    previous
}
