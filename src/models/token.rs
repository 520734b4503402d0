// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token model for storage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::services::instagram::UserDetails;
use crate::time_utils::now_rfc3339;

/// One exchanged credential plus the Instagram user fields fetched with it.
///
/// The most recently created token of a profile is its active credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Generated identifier (time-ordered, also used as document ID)
    pub id: String,
    /// Owning profile
    pub profile_id: String,
    /// Long-lived Instagram access token
    pub access_code: String,
    /// Instagram user ID
    #[serde(default)]
    pub user_id: Option<String>,
    /// Instagram username
    pub username: String,
    /// Display name, when Instagram provides one
    #[serde(default)]
    pub user_fullname: Option<String>,
    /// Avatar URL, when Instagram provides one
    #[serde(default)]
    pub user_profile_picture: Option<String>,
    /// Any further user detail fields returned by Instagram
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
    /// Creation time (RFC3339), used for "latest" ordering
    pub created_at: String,
}

impl AccessToken {
    /// Build a token record from a long-lived access token and user details.
    pub fn from_response(profile_id: &str, access_code: &str, details: &UserDetails) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            profile_id: profile_id.to_string(),
            access_code: access_code.to_string(),
            user_id: details.id.clone(),
            username: details.username.clone(),
            user_fullname: details.fullname.clone(),
            user_profile_picture: details.avatar.clone(),
            extra: details.extra.clone(),
            created_at: now_rfc3339(),
        }
    }
}
