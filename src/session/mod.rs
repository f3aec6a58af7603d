// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Session persistence for Palaver
//!
//! Conversations are stored one file per session so they can be resumed
//! with `--session <id>` or switched with `/session <id>`.

pub mod store;

pub use store::{validate_session_id, FileSessionManager, SessionInfo, SessionRecord, SessionStore};
