// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Profiles and inheritance
//!
//! A profile is a named bundle of setting overrides. Profiles may name a
//! parent through `inherits`; resolving walks that chain and merges parent
//! settings under the child's.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use super::merge::deep_merge;
use crate::error::{PalaverError, Result};

/// Key naming a profile's parent
pub const INHERITS_KEY: &str = "inherits";

/// A named set of setting overrides
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Profile name
    pub name: String,
    /// Parent profile, if any
    pub inherits: Option<String>,
    /// Settings mapping, without the `inherits` key
    pub settings: Map<String, Value>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inherits: None,
            settings: Map::new(),
        }
    }

    /// Build a profile from its raw mapping, splitting out `inherits`.
    pub fn from_value(name: impl Into<String>, value: Value) -> Result<Self> {
        let name = name.into();
        let mut settings = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(PalaverError::Config(format!(
                    "Profile '{}' must be a mapping, found {}",
                    name,
                    value_kind(&other)
                )))
            }
        };

        let inherits = match settings.remove(INHERITS_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(parent)) => Some(parent),
            Some(other) => {
                return Err(PalaverError::Config(format!(
                    "Profile '{}': '{}' must be a profile name, found {}",
                    name,
                    INHERITS_KEY,
                    value_kind(&other)
                )))
            }
        };

        Ok(Self {
            name,
            inherits,
            settings,
        })
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.inherits = Some(parent.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }
}

/// Resolve `name` against `profiles`, merging its inheritance chain.
///
/// A missing parent is treated as empty. A cycle is an error. The stored
/// profiles are only read.
pub fn resolve_profile(name: &str, profiles: &BTreeMap<String, Profile>) -> Result<Value> {
    let profile = profiles
        .get(name)
        .ok_or_else(|| PalaverError::ProfileNotFound(name.to_string()))?;

    let mut chain = vec![profile];
    let mut seen: HashSet<&str> = HashSet::from([profile.name.as_str()]);
    let mut current = profile;

    while let Some(parent_name) = current.inherits.as_deref() {
        if seen.contains(parent_name) {
            let mut names: Vec<String> = chain.iter().map(|p| p.name.clone()).collect();
            names.push(parent_name.to_string());
            return Err(PalaverError::InheritanceCycle(names));
        }

        match profiles.get(parent_name) {
            Some(parent) => {
                seen.insert(parent.name.as_str());
                chain.push(parent);
                current = parent;
            }
            None => {
                tracing::warn!(
                    profile = %current.name,
                    parent = %parent_name,
                    "Parent profile not found, ignoring inheritance"
                );
                break;
            }
        }
    }

    tracing::debug!(
        chain = ?chain.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        "Resolved profile chain"
    );

    // Root ancestor first, so each descendant overrides it.
    let resolved = chain
        .iter()
        .rev()
        .fold(Value::Object(Map::new()), |acc, p| {
            deep_merge(acc, Value::Object(p.settings.clone()))
        });

    Ok(resolved)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
