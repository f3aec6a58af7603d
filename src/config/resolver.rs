// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Layered configuration assembly
//!
//! Layers, lowest priority first:
//! 1. built-in defaults
//! 2. the config file's `defaults`
//! 3. the selected profile (inheritance resolved)
//! 4. CLI flag overrides
//! 5. `PALAVER_*` environment overrides
//!
//! `${NAME}` substitution runs over layers 2 and 3 once they are merged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::file::{self, ConfigFile, CONFIG_ENV};
use super::merge::{deep_merge, merge_all};
use super::profile::resolve_profile;
use super::settings::{palaver_home_from, AppConfig, ConversationManagerKind, HOME_ENV};
use super::template::{substitute, Bindings};
use crate::error::{PalaverError, Result};

/// Environment variable selecting the profile
pub const PROFILE_ENV: &str = "PALAVER_PROFILE";

#[derive(Debug, Clone, Copy)]
enum EnvKind {
    Str,
    Int,
    Float,
    Bool,
}

/// Environment overrides: variable, config path, value kind
const ENV_OVERRIDES: &[(&str, &[&str], EnvKind)] = &[
    ("PALAVER_MODEL", &["model"], EnvKind::Str),
    ("PALAVER_SYSTEM_PROMPT", &["system_prompt"], EnvKind::Str),
    ("PALAVER_SESSION", &["session", "name"], EnvKind::Str),
    ("PALAVER_WINDOW_SIZE", &["conversation", "window_size"], EnvKind::Int),
    (
        "PALAVER_TRUNCATE_RESULTS",
        &["conversation", "should_truncate_results"],
        EnvKind::Bool,
    ),
    ("PALAVER_MAX_TOKENS", &["model_params", "max_tokens"], EnvKind::Int),
    ("PALAVER_TEMPERATURE", &["model_params", "temperature"], EnvKind::Float),
    ("PALAVER_PROMPT", &["ui", "prompt"], EnvKind::Str),
    ("PALAVER_DEBUG", &["debug"], EnvKind::Bool),
];

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub session: Option<String>,
    pub conversation_manager: Option<ConversationManagerKind>,
    pub window_size: Option<usize>,
    pub truncate_results: Option<bool>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub tools_paths: Vec<PathBuf>,
    pub prompt: Option<String>,
    pub assistant_prefix: Option<String>,
    pub no_color: bool,
    pub debug: bool,
}

impl ConfigOverrides {
    /// The override layer; unset values are null and ignored by the merge.
    pub fn to_layer(&self) -> Value {
        let tools_paths = (!self.tools_paths.is_empty()).then_some(&self.tools_paths);
        let color = self.no_color.then_some(false);
        let debug = self.debug.then_some(true);

        serde_json::json!({
            "model": self.model,
            "system_prompt": self.system_prompt,
            "session": { "name": self.session },
            "conversation": {
                "manager": self.conversation_manager,
                "window_size": self.window_size,
                "should_truncate_results": self.truncate_results,
            },
            "model_params": {
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
            },
            "tools": { "paths": tools_paths },
            "ui": {
                "prompt": self.prompt,
                "assistant_prefix": self.assistant_prefix,
                "color": color,
            },
            "debug": debug,
        })
    }
}

/// Inputs to config resolution
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// `--config` flag
    pub config_path: Option<PathBuf>,
    /// `--profile` flag
    pub profile: Option<String>,
    /// Other CLI flags
    pub overrides: ConfigOverrides,
    /// Environment snapshot
    pub env: HashMap<String, String>,
    /// Working directory for discovery and `${CWD}`
    pub cwd: PathBuf,
    /// Home directory for `${HOME}` and the default palaver home
    pub home: Option<PathBuf>,
}

impl ResolveOptions {
    /// Options reading the real process environment
    pub fn from_process(
        config_path: Option<PathBuf>,
        profile: Option<String>,
        overrides: ConfigOverrides,
    ) -> Self {
        Self {
            config_path,
            profile,
            overrides,
            env: std::env::vars().collect(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            home: dirs::home_dir(),
        }
    }

    /// Palaver home from the snapshot: `PALAVER_HOME`, else `<home>/.palaver`.
    pub fn palaver_home(&self) -> PathBuf {
        palaver_home_from(
            self.env.get(HOME_ENV).map(String::as_str),
            self.home.as_deref(),
        )
    }

    fn bindings(&self) -> Bindings {
        Bindings::computed(self.home.as_deref(), Some(&self.cwd))
            .with_vars(self.env.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

/// The final configuration for this process
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Typed view
    pub config: AppConfig,
    /// Merged mapping the typed view was built from
    pub merged: Value,
    /// Selected profile
    pub profile: Option<String>,
    /// The parsed config file (empty when none was found)
    pub file: ConfigFile,
}

impl ResolvedConfig {
    /// Config file the settings came from
    pub fn source(&self) -> Option<&Path> {
        self.file.path.as_deref()
    }

    /// The merged mapping as YAML, with provider API keys masked
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&redact_secrets(&self.merged))?)
    }
}

/// Resolve configuration from every layer.
pub fn resolve(options: &ResolveOptions) -> Result<ResolvedConfig> {
    let path = file::discover(
        options.config_path.as_deref(),
        options.env.get(CONFIG_ENV).map(String::as_str),
        &options.cwd,
        &options.palaver_home(),
    )?;

    let file = match path {
        Some(path) => ConfigFile::load(&path)?,
        None => ConfigFile::default(),
    };

    resolve_with_file(file, options)
}

/// Resolve configuration against an already parsed file.
pub fn resolve_with_file(file: ConfigFile, options: &ResolveOptions) -> Result<ResolvedConfig> {
    let profile = select_profile(&file, options)?;

    let profile_layer = match &profile {
        Some(name) => resolve_profile(name, &file.profiles)?,
        None => Value::Object(Map::new()),
    };

    let file_layer = substitute(
        deep_merge(Value::Object(file.defaults.clone()), profile_layer),
        &options.bindings(),
    );

    let builtin = serde_json::to_value(AppConfig::builtin(&options.palaver_home()))?;
    let merged = merge_all([
        builtin.clone(),
        file_layer,
        options.overrides.to_layer(),
        env_layer(&options.env)?,
    ]);
    for key in unknown_keys(&merged, &builtin) {
        tracing::warn!(key = %key, "Ignoring unknown config key");
    }

    let config: AppConfig = serde_json::from_value(merged.clone())
        .map_err(|e| PalaverError::Config(format!("Invalid configuration: {}", e)))?;
    config.validate()?;

    tracing::debug!(
        profile = ?profile,
        source = ?file.path,
        model = %config.model,
        "Configuration resolved"
    );

    Ok(ResolvedConfig {
        config,
        merged,
        profile,
        file,
    })
}

/// Pick the profile: env var, then flag, then the file's default.
fn select_profile(file: &ConfigFile, options: &ResolveOptions) -> Result<Option<String>> {
    let requested = options
        .env
        .get(PROFILE_ENV)
        .filter(|p| !p.is_empty())
        .cloned()
        .or_else(|| options.profile.clone());

    if let Some(name) = requested {
        if !file.profiles.contains_key(&name) {
            return Err(PalaverError::ProfileNotFound(name));
        }
        return Ok(Some(name));
    }

    match &file.default_profile {
        Some(name) if file.profiles.contains_key(name) => Ok(Some(name.clone())),
        Some(name) => {
            tracing::warn!(profile = %name, "default_profile does not exist, using defaults only");
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Dotted paths of keys in `merged` with no counterpart in `known`.
fn unknown_keys(merged: &Value, known: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_unknown(merged, known, "", &mut found);
    found
}

fn collect_unknown(merged: &Value, known: &Value, prefix: &str, found: &mut Vec<String>) {
    let (Value::Object(merged), Value::Object(known)) = (merged, known) else {
        return;
    };
    for (key, value) in merged {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match known.get(key) {
            Some(expected) => collect_unknown(value, expected, &path, found),
            None => found.push(path),
        }
    }
}

const REDACTED: &str = "<redacted>";

/// Copy of `merged` with every `providers.*.api_key` masked.
fn redact_secrets(merged: &Value) -> Value {
    let mut out = merged.clone();
    if let Some(Value::Object(providers)) = out.get_mut("providers") {
        for provider in providers.values_mut() {
            if let Some(key) = provider.get_mut("api_key") {
                if !key.is_null() {
                    *key = Value::String(REDACTED.to_string());
                }
            }
        }
    }
    out
}

/// Build the environment override layer.
fn env_layer(env: &HashMap<String, String>) -> Result<Value> {
    let mut layer = Value::Object(Map::new());

    for (var, path, kind) in ENV_OVERRIDES {
        let Some(raw) = env.get(*var) else {
            continue;
        };
        let value = parse_env_value(var, raw, *kind)?;
        set_path(&mut layer, path, value);
    }

    Ok(layer)
}

fn parse_env_value(var: &str, raw: &str, kind: EnvKind) -> Result<Value> {
    let trimmed = raw.trim();
    let invalid = |expected: &str| {
        PalaverError::InvalidInput(format!(
            "{} must be {}, got '{}'",
            var, expected, raw
        ))
    };

    match kind {
        EnvKind::Str => Ok(Value::String(raw.to_string())),
        EnvKind::Int => trimmed
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| invalid("a non-negative integer")),
        EnvKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid("a number")),
        EnvKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Value::Bool(true)),
            "0" | "false" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(invalid("a boolean")),
        },
    }
}

fn set_path(root: &mut Value, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *root = value;
        return;
    };

    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
        let child = map.entry(first.to_string()).or_insert(Value::Null);
        set_path(child, rest, value);
    }
}
