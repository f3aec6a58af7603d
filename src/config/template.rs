// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! `${NAME}` substitution over configuration values
//!
//! Substitution never fails: unknown names and malformed placeholders stay in
//! the output exactly as written.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
    })
}

/// Binding table used for substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    vars: HashMap<String, String>,
}

impl Bindings {
    /// Empty binding table
    pub fn new() -> Self {
        Self::default()
    }

    /// Computed defaults overlaid by the process environment.
    pub fn from_process_env() -> Self {
        let cwd = std::env::current_dir().ok();
        Self::computed(dirs::home_dir().as_deref(), cwd.as_deref()).with_vars(std::env::vars())
    }

    /// Only the computed defaults: `HOME`, `CWD`, `CWD_NAME`.
    pub fn computed(home: Option<&Path>, cwd: Option<&Path>) -> Self {
        let mut vars = HashMap::new();
        if let Some(home) = home {
            vars.insert("HOME".to_string(), home.display().to_string());
        }
        if let Some(cwd) = cwd {
            vars.insert("CWD".to_string(), cwd.display().to_string());
            if let Some(name) = cwd.file_name().and_then(|n| n.to_str()) {
                vars.insert("CWD_NAME".to_string(), name.to_string());
            }
        }
        Self { vars }
    }

    /// Overlay additional bindings; later values win.
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a single binding
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Substitute placeholders in a single string.
pub fn substitute_str(input: &str, bindings: &Bindings) -> String {
    if !input.contains("${") {
        return input.to_string();
    }

    placeholder_regex()
        .replace_all(input, |caps: &Captures<'_>| match bindings.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Substitute placeholders in every string scalar of a nested value.
///
/// Mapping keys are left alone.
pub fn substitute(value: Value, bindings: &Bindings) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_str(&s, bindings)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| substitute(item, bindings))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute(v, bindings)))
                .collect(),
        ),
        other => other,
    }
}
