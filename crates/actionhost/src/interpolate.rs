// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Variable interpolation for static inputs.
//!
//! `${NAME}`, `$NAME` and `{NAME}` are replaced with the value of `NAME` from
//! a lookup table (normally the process environment). Unknown names are
//! replaced with the empty string. A placeholder wrapped in quotes
//! (`'{NAME}'`, `"$NAME"`, `` `${NAME}` ``) is kept as literal text.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)|\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .expect("placeholder regex is valid")
});

const QUOTES: [char; 3] = ['\'', '"', '`'];

/// Snapshot of the current process environment.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Interpolate a single string.
pub fn interpolate_str(input: &str, env: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(input, |caps: &Captures<'_>| {
            let whole = caps.get(0).expect("group 0 always matches");
            let before = input[..whole.start()].chars().next_back();
            let after = input[whole.end()..].chars().next();
            if matches!((before, after), (Some(b), Some(a)) if QUOTES.contains(&b) && QUOTES.contains(&a))
            {
                return whole.as_str().to_string();
            }

            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            env.get(name).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Interpolate a JSON value: strings are substituted, arrays are mapped
/// element-wise, everything else is returned unchanged.
pub fn interpolate(value: &Value, env: &HashMap<String, String>) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate_str(s, env)),
        Value::Array(items) => Value::Array(items.iter().map(|v| interpolate(v, env)).collect()),
        other => other.clone(),
    }
}
