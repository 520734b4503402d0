// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile model for storage.

use serde::{Deserialize, Serialize};

use crate::time_utils::now_rfc3339;

/// Local record of one end-user's connection to Instagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Generated identifier (also used as document ID)
    pub id: String,
    /// Unique local username
    pub username: String,
    /// Cached media count, refreshed independently of the feed
    #[serde(default)]
    pub media_count: u32,
    /// Single-use token correlating an authorization callback to this profile
    #[serde(default)]
    pub identity_token: Option<String>,
    /// When the profile was created (RFC3339)
    pub created_at: String,
    /// Last time the profile was written (RFC3339)
    pub updated_at: String,
}

impl Profile {
    /// Build a new, unsaved profile with a freshly generated ID.
    pub fn new(username: impl Into<String>) -> Self {
        let now = now_rfc3339();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            username: username.into(),
            media_count: 0,
            identity_token: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Stamp `updated_at` before a write.
    pub fn touch(&mut self) {
        self.updated_at = now_rfc3339();
    }
}
