// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Config file parsing and discovery
//!
//! The file is YAML with three top-level keys:
//!
//! ```yaml
//! default_profile: work
//! defaults:
//!   model: openai:gpt-4o
//!   session:
//!     name: ${CWD_NAME}
//! profiles:
//!   work:
//!     system_prompt: You are a terse pair programmer.
//!   work-claude:
//!     inherits: work
//!     model: anthropic:claude-sonnet-4-20250514
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::profile::Profile;
use crate::error::{PalaverError, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "PALAVER_CONFIG";

const KNOWN_KEYS: [&str; 3] = ["default_profile", "defaults", "profiles"];

/// A parsed configuration file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Where the file was read from
    pub path: Option<PathBuf>,
    /// Profile used when none is requested
    pub default_profile: Option<String>,
    /// Settings applied under every profile
    pub defaults: Map<String, Value>,
    /// Named profiles
    pub profiles: BTreeMap<String, Profile>,
}

impl ConfigFile {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PalaverError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut file = Self::parse(&content).map_err(|e| match e {
            PalaverError::Yaml(err) => PalaverError::Config(format!(
                "Invalid YAML in {}: {}",
                path.display(),
                err
            )),
            other => other,
        })?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    /// Parse config file contents.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: Value = if content.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(content)?
        };

        let mut root = match raw {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            _ => {
                return Err(PalaverError::Config(
                    "Config file must be a mapping with default_profile, defaults and profiles"
                        .to_string(),
                ))
            }
        };

        for key in root.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "Ignoring unknown top-level config key");
            }
        }

        let default_profile = match root.remove("default_profile") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name),
            Some(_) => {
                return Err(PalaverError::Config(
                    "default_profile must be a profile name".to_string(),
                ))
            }
        };

        let defaults = match root.remove("defaults") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(PalaverError::Config(
                    "defaults must be a mapping".to_string(),
                ))
            }
        };

        let profiles = match root.remove("profiles") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(name, value)| Profile::from_value(name.clone(), value).map(|p| (name, p)))
                .collect::<Result<BTreeMap<_, _>>>()?,
            Some(_) => {
                return Err(PalaverError::Config(
                    "profiles must be a mapping of profile name to settings".to_string(),
                ))
            }
        };

        Ok(Self {
            path: None,
            default_profile,
            defaults,
            profiles,
        })
    }

    /// Names of all profiles, sorted
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}

/// Candidate config locations, in search order.
pub fn candidate_paths(cwd: &Path, home: &Path) -> Vec<PathBuf> {
    vec![
        cwd.join(".palaver.yaml"),
        cwd.join(".palaver.yml"),
        home.join("config.yaml"),
        home.join("config.yml"),
    ]
}

/// Find the config file to load.
///
/// An explicit path (flag or `PALAVER_CONFIG`) must exist. Otherwise the
/// first existing candidate under `cwd` or the palaver `home` is used, or none.
pub fn discover(
    explicit: Option<&Path>,
    env_path: Option<&str>,
    cwd: &Path,
    home: &Path,
) -> Result<Option<PathBuf>> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| env_path.filter(|p| !p.is_empty()).map(PathBuf::from));

    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(PalaverError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    let found = candidate_paths(cwd, home).into_iter().find(|p| p.is_file());
    match &found {
        Some(path) => tracing::debug!(path = %path.display(), "Discovered config file"),
        None => tracing::debug!("No config file found, using built-in defaults"),
    }
    Ok(found)
}
