// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Maps `(package, item)` from a request path to an action or sequence.

use crate::manifest::{ActionConfig, ActionDefinition, Inputs, SequenceDefinition};

/// What a `(package, item)` pair resolved to.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    /// A single action.
    Action(&'a ActionDefinition),
    /// A sequence of actions in the same package.
    Sequence(&'a SequenceDefinition),
}

impl Resolved<'_> {
    /// Whether the resolved item receives its body unparsed.
    pub fn is_raw(&self) -> bool {
        match self {
            Resolved::Action(action) => action.is_raw(),
            Resolved::Sequence(sequence) => sequence.is_raw(),
        }
    }
}

/// Resolve an item. Actions shadow sequences of the same name.
pub fn resolve<'a>(config: &'a ActionConfig, package: &str, item: &str) -> Option<Resolved<'a>> {
    let pkg = config.package(package)?;
    if let Some(action) = pkg.actions.get(item) {
        return Some(Resolved::Action(action));
    }
    pkg.sequences.get(item).map(Resolved::Sequence)
}

/// Static inputs for an action: package inputs overridden by action inputs.
///
/// Sequences declare no inputs of their own; each step resolves the inputs
/// of its own action.
pub fn merged_inputs(config: &ActionConfig, action: &ActionDefinition) -> Inputs {
    let mut inputs = config
        .package(&action.package)
        .map(|p| p.inputs.clone())
        .unwrap_or_default();
    for (key, value) in &action.inputs {
        inputs.insert(key.clone(), value.clone());
    }
    inputs
}
