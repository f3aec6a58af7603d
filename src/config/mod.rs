// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Configuration module for Palaver
//!
//! Loads the YAML config file, resolves profile inheritance, substitutes
//! `${NAME}` placeholders and layers CLI flags and environment overrides on
//! top of the built-in defaults.

pub mod file;
pub mod merge;
pub mod profile;
pub mod resolver;
pub mod settings;
pub mod template;

pub use file::{ConfigFile, CONFIG_ENV};
pub use merge::{deep_merge, merge_all};
pub use profile::{resolve_profile, Profile};
pub use resolver::{resolve, resolve_with_file, ConfigOverrides, ResolveOptions, ResolvedConfig};
pub use settings::*;
pub use template::{substitute, substitute_str, Bindings};
