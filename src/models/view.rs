// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Display projection of a profile and its credential state.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{AccessToken, Profile};

/// Read-only display record for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export))]
pub struct ProfileView {
    /// Local profile username
    pub name: String,
    pub media_count: u32,
    /// Instagram username ("" when not connected)
    pub username: String,
    pub fullname: String,
    pub avatar: String,
    /// Whether the profile currently has an active token
    pub has_auth: bool,
    /// Authorization URL for (re)connecting the profile
    pub auth_url: String,
}

impl ProfileView {
    /// Project a profile, its first associated token, and auth state.
    pub fn project(
        profile: &Profile,
        first_token: Option<&AccessToken>,
        has_auth: bool,
        auth_url: String,
    ) -> Self {
        Self {
            name: profile.username.clone(),
            media_count: profile.media_count,
            username: first_token.map(|t| t.username.clone()).unwrap_or_default(),
            fullname: first_token
                .and_then(|t| t.user_fullname.clone())
                .unwrap_or_default(),
            avatar: first_token
                .and_then(|t| t.user_profile_picture.clone())
                .unwrap_or_default(),
            has_auth,
            auth_url,
        }
    }
}
