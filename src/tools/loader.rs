// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool discovery and loading
//!
//! Each configured path is either a `*.tools.json` file or a directory
//! scanned (non-recursively) for such files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::manifest::{expand_tilde, ToolManifest};

/// Manifest file suffix
pub const MANIFEST_SUFFIX: &str = ".tools.json";

/// Loader for external tool manifests
pub struct ToolLoader {
    paths: Vec<PathBuf>,
}

impl ToolLoader {
    /// Create a loader over files or directories.
    pub fn new(paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Self {
        let paths = paths
            .into_iter()
            .map(|p| PathBuf::from(expand_tilde(&p.as_ref().to_string_lossy())))
            .collect();
        Self { paths }
    }

    /// Configured search paths, `~` expanded
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Discover manifest files, sorted within each configured path.
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();

        for path in &self.paths {
            let mut files = if path.is_dir() {
                scan_dir(path)
            } else if path.is_file() && is_manifest(path) {
                vec![path.clone()]
            } else {
                if path.exists() {
                    tracing::debug!(path = %path.display(), "Ignoring non-manifest tool path");
                }
                Vec::new()
            };

            files.sort();
            for file in files {
                if seen.insert(file.clone()) {
                    found.push(file);
                }
            }
        }

        found
    }

    /// Load all valid tool manifests.
    ///
    /// Invalid files are logged and skipped. When two manifests share a
    /// name the first one wins.
    pub fn load_all(&self) -> Vec<ToolManifest> {
        let mut manifests: Vec<ToolManifest> = Vec::new();

        for path in self.discover() {
            match ToolManifest::from_file(&path) {
                Ok(loaded) => {
                    for manifest in loaded {
                        if manifests.iter().any(|m| m.name == manifest.name) {
                            tracing::warn!(
                                tool = %manifest.name,
                                path = %path.display(),
                                "Duplicate tool name, keeping the first definition"
                            );
                            continue;
                        }
                        tracing::debug!(tool = %manifest.name, path = %path.display(), "Loaded tool manifest");
                        manifests.push(manifest);
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping invalid tool manifest");
                }
            }
        }

        manifests
    }
}

fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(MANIFEST_SUFFIX) && n.len() > MANIFEST_SUFFIX.len())
}

fn scan_dir(dir: &Path) -> Vec<PathBuf> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!("{}/*{}", escaped.trim_end_matches('/'), MANIFEST_SUFFIX);

    match glob::glob(&pattern) {
        Ok(entries) => entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable entry while scanning tools");
                    None
                }
            })
            .filter(|p| p.is_file())
            .collect(),
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "Invalid tools glob");
            Vec::new()
        }
    }
}
