// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: profile and token persistence.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AccessToken, Profile};

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "instagram_profiles";
    pub const TOKENS: &str = "instagram_tokens";
    pub const FEED_CACHE: &str = "instagram_feed_cache";
}

/// Storage for profiles and their access tokens.
///
/// Token lists are returned newest first. The newest token is the profile's
/// active credential; there is no separate "active" flag.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert a new profile. Fails with `ProfileExists` on a duplicate username.
    async fn insert_profile(&self, profile: &Profile) -> Result<()>;

    /// Store `media_count` on the profile. No other field is written.
    async fn set_media_count(&self, profile_id: &str, media_count: u32) -> Result<()>;

    /// Store `candidate` as the profile's identity token unless one is
    /// already stored, and return the stored token.
    async fn issue_identity_token_if_absent(
        &self,
        profile_id: &str,
        candidate: &str,
    ) -> Result<String>;

    async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>>;

    async fn find_profile_by_username(&self, username: &str) -> Result<Option<Profile>>;

    /// Find the profile holding `token` and clear its identity token in the
    /// same step, so a token resolves at most once.
    async fn take_profile_by_identity_token(&self, token: &str) -> Result<Option<Profile>>;

    async fn list_profiles(&self) -> Result<Vec<Profile>>;

    /// All tokens of a profile, ordered by creation descending.
    async fn tokens_for_profile(&self, profile_id: &str) -> Result<Vec<AccessToken>>;

    /// Replace every token of the profile with `token`.
    ///
    /// Readers never observe the profile with zero tokens in between.
    async fn replace_tokens(&self, profile_id: &str, token: &AccessToken) -> Result<()>;

    /// Update the access code of one token in place.
    async fn update_access_code(&self, token_id: &str, access_code: &str) -> Result<()>;

    async fn delete_tokens(&self, profile_id: &str) -> Result<()>;

    /// The most recently created token.
    async fn latest_token(&self, profile_id: &str) -> Result<Option<AccessToken>> {
        Ok(self.tokens_for_profile(profile_id).await?.into_iter().next())
    }

    /// The earliest created token (the profile's first association).
    async fn first_token(&self, profile_id: &str) -> Result<Option<AccessToken>> {
        Ok(self.tokens_for_profile(profile_id).await?.into_iter().last())
    }
}

/// Newest-first ordering shared by the implementations.
///
/// `created_at` is fixed-width RFC3339 and IDs are UUID v7, so both compare
/// chronologically as strings.
pub(crate) fn sort_newest_first(tokens: &mut [AccessToken]) {
    tokens.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
