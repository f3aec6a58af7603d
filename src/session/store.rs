// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! File-based session store
//!
//! Each session lives in `<dir>/<id>.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PalaverError, Result};
use crate::llm::message::{Message, Role};

const SESSION_EXT: &str = "json";

/// A persisted conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    /// Session ID (also the file stem)
    pub id: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last saved
    pub updated_at: DateTime<Utc>,
    /// Model spec used for the last turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Conversation history
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl SessionRecord {
    /// Create an empty record
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            model: None,
            messages: Vec::new(),
        }
    }

    /// Listing view of this record
    pub fn info(&self) -> SessionInfo {
        let summary = self
            .messages
            .iter()
            .find(|m| m.role == Role::User && !m.is_tool_result())
            .map(|m| summarize(&m.text()));

        SessionInfo {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            model: self.model.clone(),
            message_count: self.messages.len(),
            summary,
        }
    }
}

/// Information about a stored session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub model: Option<String>,
    pub message_count: usize,
    /// First user message, shortened
    pub summary: Option<String>,
}

fn summarize(text: &str) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() > 60 {
        let short: String = line.chars().take(57).collect();
        format!("{}...", short)
    } else {
        line.to_string()
    }
}

/// Check that a session id is usable as a file name.
pub fn validate_session_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(PalaverError::Session("Session id cannot be empty".to_string()));
    }
    if id.starts_with('.') {
        return Err(PalaverError::Session(format!(
            "Session id '{}' may not start with '.'",
            id
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(PalaverError::Session(format!(
            "Session id '{}' may only contain letters, digits, '_', '-' and '.'",
            id
        )));
    }
    Ok(())
}

/// Directory of session files
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a session file
    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_session_id(id)?;
        Ok(self.dir.join(format!("{}.{}", id, SESSION_EXT)))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).is_ok_and(|p| p.is_file())
    }

    /// Load a session, or `None` if it has never been saved.
    pub fn load(&self, id: &str) -> Result<Option<SessionRecord>> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let record: SessionRecord = serde_json::from_str(&content).map_err(|e| {
            PalaverError::Session(format!("Corrupt session file {}: {}", path.display(), e))
        })?;
        Ok(Some(record))
    }

    /// Write a record, replacing the file atomically.
    pub fn write(&self, record: &SessionRecord) -> Result<()> {
        let path = self.path_for(&record.id)?;
        std::fs::create_dir_all(&self.dir)?;

        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(record)?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(session = %record.id, path = %path.display(), "Saved session");
        Ok(())
    }

    /// List sessions, most recently updated first.
    pub fn list(&self) -> Result<Vec<SessionInfo>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SESSION_EXT) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(id) {
                Ok(Some(record)) => sessions.push(record.info()),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable session"),
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    /// Delete a session. Returns false if it did not exist.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// The active session plus the store it belongs to
#[derive(Debug)]
pub struct FileSessionManager {
    store: SessionStore,
    current: SessionRecord,
}

impl FileSessionManager {
    /// Open a session, loading it if it exists.
    pub fn open(dir: impl Into<PathBuf>, id: &str) -> Result<Self> {
        let store = SessionStore::new(dir);
        let current = Self::load_or_new(&store, id)?;
        Ok(Self { store, current })
    }

    fn load_or_new(store: &SessionStore, id: &str) -> Result<SessionRecord> {
        Ok(match store.load(id)? {
            Some(record) => {
                tracing::debug!(session = %id, messages = record.messages.len(), "Loaded session");
                record
            }
            None => SessionRecord::new(id),
        })
    }

    pub fn id(&self) -> &str {
        &self.current.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.current.messages
    }

    pub fn record(&self) -> &SessionRecord {
        &self.current
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Whether the active session has been written at least once
    pub fn is_persisted(&self) -> bool {
        self.store.exists(&self.current.id)
    }

    /// Persist the conversation into the active session.
    pub fn save(&mut self, messages: &[Message], model: &str) -> Result<()> {
        self.current.messages = messages.to_vec();
        self.current.model = Some(model.to_string());
        self.current.updated_at = Utc::now();
        self.store.write(&self.current)
    }

    /// Persist the active session, then make `id` active and return its history.
    pub fn switch_to(&mut self, id: &str) -> Result<Vec<Message>> {
        validate_session_id(id)?;
        if id == self.current.id {
            return Ok(self.current.messages.clone());
        }

        if !self.current.messages.is_empty() || self.is_persisted() {
            self.current.updated_at = Utc::now();
            self.store.write(&self.current)?;
        }

        let previous = std::mem::replace(&mut self.current, Self::load_or_new(&self.store, id)?);
        tracing::info!(from = %previous.id, to = %id, "Switched session");
        Ok(self.current.messages.clone())
    }

    pub fn list(&self) -> Result<Vec<SessionInfo>> {
        self.store.list()
    }

    /// Delete a stored session. The active session cannot be deleted.
    pub fn delete(&self, id: &str) -> Result<bool> {
        if id == self.current.id {
            return Err(PalaverError::Session(format!(
                "Cannot delete the active session '{}'",
                id
            )));
        }
        self.store.delete(id)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.store.exists(id)
    }
}
