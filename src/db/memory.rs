// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process repository for tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{sort_newest_first, ProfileRepository};
use crate::error::{FeedError, Result};
use crate::models::{AccessToken, Profile};

#[derive(Default)]
struct State {
    profiles: HashMap<String, Profile>,
    tokens: HashMap<String, AccessToken>,
}

/// Repository held entirely in memory.
///
/// Every mutation runs under a single write lock, which makes multi-step
/// changes such as token replacement atomic for readers.
#[derive(Clone, Default)]
pub struct MemoryDb {
    state: Arc<RwLock<State>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a token without removing existing ones.
    ///
    /// Lets tests and migrations reproduce historical data holding several
    /// tokens per profile.
    pub async fn insert_token(&self, token: &AccessToken) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.profiles.contains_key(&token.profile_id) {
            return Err(FeedError::NotFound(format!("Profile {}", token.profile_id)));
        }
        state.tokens.insert(token.id.clone(), token.clone());
        Ok(())
    }

    /// Total number of stored tokens across all profiles.
    pub async fn token_count(&self) -> usize {
        self.state.read().await.tokens.len()
    }
}

#[async_trait]
impl ProfileRepository for MemoryDb {
    async fn insert_profile(&self, profile: &Profile) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .profiles
            .values()
            .any(|p| p.username == profile.username)
        {
            return Err(FeedError::ProfileExists(profile.username.clone()));
        }
        state.profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn set_media_count(&self, profile_id: &str, media_count: u32) -> Result<()> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .get_mut(profile_id)
            .ok_or_else(|| FeedError::NotFound(format!("Profile {}", profile_id)))?;
        profile.media_count = media_count;
        profile.touch();
        Ok(())
    }

    async fn issue_identity_token_if_absent(
        &self,
        profile_id: &str,
        candidate: &str,
    ) -> Result<String> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .get_mut(profile_id)
            .ok_or_else(|| FeedError::NotFound(format!("Profile {}", profile_id)))?;
        if let Some(stored) = &profile.identity_token {
            return Ok(stored.clone());
        }
        profile.identity_token = Some(candidate.to_string());
        profile.touch();
        Ok(candidate.to_string())
    }

    async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>> {
        Ok(self.state.read().await.profiles.get(profile_id).cloned())
    }

    async fn find_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
        Ok(self
            .state
            .read()
            .await
            .profiles
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn take_profile_by_identity_token(&self, token: &str) -> Result<Option<Profile>> {
        let mut state = self.state.write().await;
        let Some(profile) = state
            .profiles
            .values_mut()
            .find(|p| p.identity_token.as_deref() == Some(token))
        else {
            return Ok(None);
        };

        profile.identity_token = None;
        profile.touch();
        Ok(Some(profile.clone()))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let mut profiles: Vec<Profile> =
            self.state.read().await.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(profiles)
    }

    async fn tokens_for_profile(&self, profile_id: &str) -> Result<Vec<AccessToken>> {
        let mut tokens: Vec<AccessToken> = self
            .state
            .read()
            .await
            .tokens
            .values()
            .filter(|t| t.profile_id == profile_id)
            .cloned()
            .collect();
        sort_newest_first(&mut tokens);
        Ok(tokens)
    }

    async fn replace_tokens(&self, profile_id: &str, token: &AccessToken) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.profiles.contains_key(profile_id) {
            return Err(FeedError::NotFound(format!("Profile {}", profile_id)));
        }
        state.tokens.retain(|_, t| t.profile_id != profile_id);
        state.tokens.insert(token.id.clone(), token.clone());
        Ok(())
    }

    async fn update_access_code(&self, token_id: &str, access_code: &str) -> Result<()> {
        let mut state = self.state.write().await;
        match state.tokens.get_mut(token_id) {
            Some(token) => {
                token.access_code = access_code.to_string();
                Ok(())
            }
            None => Err(FeedError::NotFound(format!("Access token {}", token_id))),
        }
    }

    async fn delete_tokens(&self, profile_id: &str) -> Result<()> {
        self.state
            .write()
            .await
            .tokens
            .retain(|_, t| t.profile_id != profile_id);
        Ok(())
    }
}
