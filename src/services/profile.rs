// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile lifecycle: authorization handshake, token exchange and refresh,
//! and cached feed retrieval.
//!
//! Failure policy:
//! - Handshake failures are typed (`AuthorizationDenied`, `TokenAcquisitionFailed`).
//! - Token refresh and explicit feed refresh propagate provider errors as-is.
//! - Lazy feed reads never fail; they degrade to [`Feed::empty`].

use futures_util::{stream, StreamExt};
use std::sync::Arc;

use crate::config::DEFAULT_MAINTENANCE_CONCURRENCY;
use crate::db::ProfileRepository;
use crate::error::{FeedError, Result};
use crate::models::{AccessToken, Feed, FeedPayload, Profile, ProfileView};
use crate::services::cache::{cache_key, FeedCache};
use crate::services::identity::TokenGenerator;
use crate::services::instagram::{CallbackParams, ProviderClient, UserDetails};

/// Outcome of a maintenance sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
    /// Profiles without an access token
    pub skipped: usize,
}

/// Orchestrates a profile's credentials and feed.
#[derive(Clone)]
pub struct ProfileService {
    db: Arc<dyn ProfileRepository>,
    provider: Arc<dyn ProviderClient>,
    cache: Arc<dyn FeedCache>,
    tokens: Arc<dyn TokenGenerator>,
    maintenance_concurrency: usize,
}

impl ProfileService {
    pub fn new(
        db: Arc<dyn ProfileRepository>,
        provider: Arc<dyn ProviderClient>,
        cache: Arc<dyn FeedCache>,
        tokens: Arc<dyn TokenGenerator>,
    ) -> Self {
        Self {
            db,
            provider,
            cache,
            tokens,
            maintenance_concurrency: DEFAULT_MAINTENANCE_CONCURRENCY,
        }
    }

    /// Set how many profiles the maintenance sweeps process at once.
    pub fn with_maintenance_concurrency(mut self, concurrency: usize) -> Self {
        self.maintenance_concurrency = concurrency.max(1);
        self
    }

    // ─── Profiles ────────────────────────────────────────────────────────────

    /// Create and persist a profile for `username`.
    pub async fn create_profile(&self, username: &str) -> Result<Profile> {
        let username = username.trim();
        if username.is_empty() {
            return Err(FeedError::BadRequest("username must not be empty".to_string()));
        }

        let profile = Profile::new(username);
        self.db.insert_profile(&profile).await?;

        tracing::info!(profile_id = %profile.id, username, "Profile created");
        Ok(profile)
    }

    /// Look up a profile by username. Absence is not an error.
    pub async fn find_profile(&self, username: &str) -> Result<Option<Profile>> {
        self.db.find_profile_by_username(username).await
    }

    // ─── Authorization Handshake ─────────────────────────────────────────────

    /// Authorization URL for `profile`, issuing an identity token first if
    /// the stored profile has none.
    ///
    /// Repeated calls reuse the stored token until it is consumed. The stored
    /// token wins over whatever `profile` carries, so a stale copy never
    /// resurrects a consumed token.
    pub async fn auth_url(&self, profile: &mut Profile) -> Result<String> {
        let candidate = self.tokens.generate();
        let stored = self
            .db
            .issue_identity_token_if_absent(&profile.id, &candidate)
            .await?;
        if stored == candidate {
            tracing::debug!(profile_id = %profile.id, "Identity token issued");
        }
        profile.identity_token = Some(stored);

        self.provider.auth_url_for_profile(profile)
    }

    /// Resolve the profile an authorization callback belongs to.
    ///
    /// The identity token is cleared on success, so each token resolves once.
    pub async fn resolve_by_identity_token(&self, token: &str) -> Result<Option<Profile>> {
        if token.is_empty() {
            return Ok(None);
        }
        self.db.take_profile_by_identity_token(token).await
    }

    // ─── Token Exchange ──────────────────────────────────────────────────────

    /// Complete the handshake: exchange the callback's code for a long-lived
    /// token and make it the profile's only token.
    pub async fn request_token(
        &self,
        profile: &Profile,
        params: &CallbackParams,
    ) -> Result<AccessToken> {
        let code = params.authorization_code().inspect_err(|e| {
            tracing::warn!(profile_id = %profile.id, error = %e, "Authorization denied");
        })?;

        let (long_lived, details) = self
            .acquire_token(profile, code)
            .await
            .map_err(|e| {
                tracing::warn!(profile_id = %profile.id, error = %e, "Token acquisition failed");
                FeedError::TokenAcquisitionFailed(e.to_string())
            })?;

        let token = AccessToken::from_response(&profile.id, &long_lived, &details);
        self.db.replace_tokens(&profile.id, &token).await?;
        self.forget_feed(profile).await;

        tracing::info!(
            profile_id = %profile.id,
            instagram_user = %token.username,
            "Access token stored"
        );
        Ok(token)
    }

    /// Provider calls of the exchange; any failure here is a
    /// `TokenAcquisitionFailed` to the caller.
    async fn acquire_token(
        &self,
        profile: &Profile,
        code: &str,
    ) -> Result<(String, UserDetails)> {
        let short_lived = self
            .provider
            .request_token_for_profile(profile, code)
            .await?;
        let details = self
            .provider
            .fetch_user_details(&short_lived.access_token)
            .await?;
        let long_lived = self.provider.exchange_token(&short_lived).await?;
        Ok((long_lived.access_token, details))
    }

    // ─── Token State ─────────────────────────────────────────────────────────

    /// The profile's active (most recently created) token.
    pub async fn latest_token(&self, profile: &Profile) -> Result<Option<AccessToken>> {
        self.db.latest_token(&profile.id).await
    }

    pub async fn has_access(&self, profile: &Profile) -> Result<bool> {
        Ok(self.latest_token(profile).await?.is_some())
    }

    /// Access code of the active token.
    pub async fn access_code(&self, profile: &Profile) -> Result<Option<String>> {
        Ok(self.latest_token(profile).await?.map(|t| t.access_code))
    }

    async fn require_latest_token(&self, profile: &Profile) -> Result<AccessToken> {
        self.latest_token(profile)
            .await?
            .ok_or_else(|| FeedError::NotFound(format!("Access token for profile {}", profile.id)))
    }

    /// Extend the active token, updating its access code in place.
    ///
    /// Provider failures propagate unchanged.
    pub async fn refresh_token(&self, profile: &Profile) -> Result<()> {
        let token = self.require_latest_token(profile).await?;
        let refreshed = self.provider.refresh_token(&token.access_code).await?;
        self.db
            .update_access_code(&token.id, &refreshed.access_token)
            .await?;

        tracing::info!(profile_id = %profile.id, "Access token refreshed");
        Ok(())
    }

    /// Re-read the media count from Instagram (0 if not reported).
    pub async fn refresh_media_count(&self, profile: &mut Profile) -> Result<()> {
        let token = self.require_latest_token(profile).await?;
        let details = self.provider.fetch_user_details(&token.access_code).await?;

        let media_count = details.media_count.unwrap_or(0);
        self.db.set_media_count(&profile.id, media_count).await?;
        profile.media_count = media_count;
        profile.touch();

        tracing::debug!(
            profile_id = %profile.id,
            media_count = profile.media_count,
            "Media count refreshed"
        );
        Ok(())
    }

    /// Delete every token of the profile and drop its cached feed.
    pub async fn clear_tokens(&self, profile: &Profile) -> Result<()> {
        self.db.delete_tokens(&profile.id).await?;
        self.forget_feed(profile).await;
        tracing::info!(profile_id = %profile.id, "Access tokens cleared");
        Ok(())
    }

    // ─── Feed ────────────────────────────────────────────────────────────────

    /// The profile's feed, served from cache when present.
    ///
    /// Never fails: profiles without access and failed fetches yield
    /// [`Feed::empty`], and a failed fetch leaves the cache untouched.
    pub async fn feed(&self, profile: &Profile, limit: usize) -> Feed {
        let token = match self.latest_token(profile).await {
            Ok(Some(token)) => token,
            Ok(None) => return Feed::empty(),
            Err(e) => {
                tracing::warn!(profile_id = %profile.id, error = %e, "Token lookup failed, serving empty feed");
                return Feed::empty();
            }
        };

        let key = cache_key(&profile.id);
        match self.cached_feed(&key).await {
            Ok(Some(payload)) => {
                tracing::debug!(profile_id = %profile.id, "Feed cache hit");
                return Feed::new(profile.id.clone(), payload);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(profile_id = %profile.id, error = %e, "Feed cache read failed");
            }
        }

        let payload = match self.provider.fetch_media(&token.access_code, limit).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(profile_id = %profile.id, error = %e, "Feed fetch failed, serving empty feed");
                return Feed::empty();
            }
        };

        if let Err(e) = self.cache.forever(&key, &payload).await {
            tracing::warn!(profile_id = %profile.id, error = %e, "Failed to cache feed");
        } else {
            tracing::info!(profile_id = %profile.id, items = payload.len(), "Feed cached");
        }

        Feed::new(profile.id.clone(), payload)
    }

    async fn cached_feed(&self, key: &str) -> Result<Option<FeedPayload>> {
        if !self.cache.has(key).await? {
            return Ok(None);
        }
        self.cache.get(key).await
    }

    /// Fetch fresh media, refresh the media count, and replace the cached feed.
    ///
    /// Unlike [`feed`](Self::feed), failures propagate.
    pub async fn refresh_feed(&self, profile: &mut Profile, limit: usize) -> Result<Feed> {
        let token = self.require_latest_token(profile).await?;
        let payload = self.provider.fetch_media(&token.access_code, limit).await?;
        self.refresh_media_count(profile).await?;

        let key = cache_key(&profile.id);
        self.cache.forget(&key).await?;
        self.cache.forever(&key, &payload).await?;

        tracing::info!(profile_id = %profile.id, items = payload.len(), "Feed refreshed");
        Ok(self.feed(profile, limit).await)
    }

    async fn forget_feed(&self, profile: &Profile) {
        if let Err(e) = self.cache.forget(&cache_key(&profile.id)).await {
            tracing::warn!(profile_id = %profile.id, error = %e, "Failed to evict cached feed");
        }
    }

    // ─── View Projection ─────────────────────────────────────────────────────

    /// Display record for a profile.
    ///
    /// Identity fields come from the profile's first associated token while
    /// `has_auth` reflects the latest one; with a single token they coincide.
    /// Issues an identity token if the profile has none.
    pub async fn view(&self, profile: &mut Profile) -> Result<ProfileView> {
        let first = self.db.first_token(&profile.id).await?;
        let has_auth = self.has_access(profile).await?;
        let auth_url = self.auth_url(profile).await?;

        Ok(ProfileView::project(profile, first.as_ref(), has_auth, auth_url))
    }

    // ─── Maintenance ─────────────────────────────────────────────────────────

    /// Refresh the token of every profile with access.
    pub async fn refresh_authorized_tokens(&self) -> Result<RefreshSummary> {
        let profiles = self.db.list_profiles().await?;

        let outcomes: Vec<Option<bool>> = stream::iter(profiles)
            .map(|profile| async move {
                match self.has_access(&profile).await {
                    Ok(false) => return None,
                    Ok(true) => {}
                    Err(e) => {
                        tracing::warn!(profile_id = %profile.id, error = %e, "Token lookup failed");
                        return Some(false);
                    }
                }
                match self.refresh_token(&profile).await {
                    Ok(()) => Some(true),
                    Err(e) => {
                        tracing::warn!(
                            profile_id = %profile.id,
                            token_error = e.is_instagram_token_error(),
                            error = %e,
                            "Token refresh failed"
                        );
                        Some(false)
                    }
                }
            })
            .buffer_unordered(self.maintenance_concurrency)
            .collect()
            .await;

        let summary = summarize(&outcomes);
        tracing::info!(
            refreshed = summary.refreshed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Token refresh sweep complete"
        );
        Ok(summary)
    }

    /// Refresh the cached feed of every profile with access.
    pub async fn refresh_authorized_feeds(&self, limit: usize) -> Result<RefreshSummary> {
        let profiles = self.db.list_profiles().await?;

        let outcomes: Vec<Option<bool>> = stream::iter(profiles)
            .map(|mut profile| async move {
                match self.has_access(&profile).await {
                    Ok(false) => return None,
                    Ok(true) => {}
                    Err(e) => {
                        tracing::warn!(profile_id = %profile.id, error = %e, "Token lookup failed");
                        return Some(false);
                    }
                }
                match self.refresh_feed(&mut profile, limit).await {
                    Ok(_) => Some(true),
                    Err(e) => {
                        tracing::warn!(profile_id = %profile.id, error = %e, "Feed refresh failed");
                        Some(false)
                    }
                }
            })
            .buffer_unordered(self.maintenance_concurrency)
            .collect()
            .await;

        let summary = summarize(&outcomes);
        tracing::info!(
            refreshed = summary.refreshed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Feed refresh sweep complete"
        );
        Ok(summary)
    }
}

/// `None` = skipped, `Some(ok)` = attempted.
fn summarize(outcomes: &[Option<bool>]) -> RefreshSummary {
    outcomes
        .iter()
        .fold(RefreshSummary::default(), |mut acc, outcome| {
            match outcome {
                Some(true) => acc.refreshed += 1,
                Some(false) => acc.failed += 1,
                None => acc.skipped += 1,
            }
            acc
        })
}
