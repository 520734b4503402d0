// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (identity token lookups included)
//! - Access tokens (replaced atomically per profile)
//! - Feed cache entries

use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{paths, FirestoreResult, FirestoreWritePrecondition};
use serde::{Deserialize, Serialize};

use super::{collections, sort_newest_first, ProfileRepository};
use crate::error::{FeedError, Result};
use crate::models::{AccessToken, FeedPayload, Profile};
use crate::services::cache::FeedCache;
use crate::time_utils::now_rfc3339;

/// Cached feed document. The payload is stored as JSON text so Firestore
/// never reshapes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedFeed {
    key: String,
    payload_json: String,
    stored_at: String,
}

/// Field-masked media count write.
#[derive(Debug, Serialize, Deserialize)]
struct MediaCountUpdate {
    media_count: u32,
    updated_at: String,
}

/// Field-masked identity token write. `None` clears the stored token.
#[derive(Debug, Serialize, Deserialize)]
struct IdentityTokenUpdate {
    #[serde(default)]
    identity_token: Option<String>,
    updated_at: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| FeedError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            FeedError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| FeedError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Document ID for a cache key (`/` is not allowed in IDs).
    fn cache_doc_id(key: &str) -> String {
        urlencoding::encode(key).into_owned()
    }

    /// Tokens of a profile, read through `client`. Inside
    /// `run_transaction` the read is part of the transaction.
    async fn query_tokens(
        client: &firestore::FirestoreDb,
        profile_id: &str,
    ) -> FirestoreResult<Vec<AccessToken>> {
        client
            .fluent()
            .select()
            .from(collections::TOKENS)
            .filter(|q| q.for_all([q.field("profile_id").eq(profile_id)]))
            .obj()
            .query()
            .await
    }

    async fn get_cached_feed(&self, key: &str) -> Result<Option<CachedFeed>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FEED_CACHE)
            .obj()
            .one(&Self::cache_doc_id(key))
            .await
            .map_err(|e| FeedError::Cache(e.to_string()))
    }
}

#[async_trait]
impl ProfileRepository for FirestoreDb {
    async fn insert_profile(&self, profile: &Profile) -> Result<()> {
        // Uniqueness is checked before the write; Firestore has no unique indexes.
        if self
            .find_profile_by_username(&profile.username)
            .await?
            .is_some()
        {
            return Err(FeedError::ProfileExists(profile.username.clone()));
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&profile.id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| FeedError::Database(e.to_string()))?;
        Ok(())
    }

    async fn set_media_count(&self, profile_id: &str, media_count: u32) -> Result<()> {
        let update = MediaCountUpdate {
            media_count,
            updated_at: now_rfc3339(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(MediaCountUpdate::{media_count, updated_at}))
            .in_col(collections::PROFILES)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(profile_id)
            .object(&update)
            .execute()
            .await
            .map_err(|e| FeedError::Database(e.to_string()))?;
        Ok(())
    }

    async fn issue_identity_token_if_absent(
        &self,
        profile_id: &str,
        candidate: &str,
    ) -> Result<String> {
        let owner = profile_id.to_string();
        let candidate = candidate.to_string();

        let stored = self
            .get_client()?
            .run_transaction::<Option<String>, _, FirestoreError>(move |db, transaction| {
                let owner = owner.clone();
                let candidate = candidate.clone();
                Box::pin(async move {
                    let Some(profile) = db
                        .fluent()
                        .select()
                        .by_id_in(collections::PROFILES)
                        .obj::<Profile>()
                        .one(&owner)
                        .await?
                    else {
                        return Ok(None);
                    };

                    if let Some(existing) = profile.identity_token {
                        return Ok(Some(existing));
                    }

                    let update = IdentityTokenUpdate {
                        identity_token: Some(candidate.clone()),
                        updated_at: now_rfc3339(),
                    };
                    db.fluent()
                        .update()
                        .fields(paths!(IdentityTokenUpdate::{identity_token, updated_at}))
                        .in_col(collections::PROFILES)
                        .document_id(&owner)
                        .object(&update)
                        .add_to_transaction(transaction)?;

                    Ok(Some(candidate))
                })
            })
            .await
            .map_err(|e| FeedError::Database(format!("Identity token issue failed: {}", e)))?;

        stored.ok_or_else(|| FeedError::NotFound(format!("Profile {}", profile_id)))
    }

    async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(profile_id)
            .await
            .map_err(|e| FeedError::Database(e.to_string()))
    }

    async fn find_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let profiles: Vec<Profile> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .filter(|q| q.for_all([q.field("username").eq(username)]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| FeedError::Database(e.to_string()))?;
        Ok(profiles.into_iter().next())
    }

    async fn take_profile_by_identity_token(&self, token: &str) -> Result<Option<Profile>> {
        let token = token.to_string();

        // The lookup is a transactional read, so a concurrent consumer of the
        // same token conflicts at commit and re-runs to find nothing.
        let taken = self
            .get_client()?
            .run_transaction::<Option<Profile>, _, FirestoreError>(move |db, transaction| {
                let token = token.clone();
                Box::pin(async move {
                    let found: Vec<Profile> = db
                        .fluent()
                        .select()
                        .from(collections::PROFILES)
                        .filter(|q| q.for_all([q.field("identity_token").eq(token.as_str())]))
                        .limit(1)
                        .obj()
                        .query()
                        .await?;

                    let Some(mut profile) = found.into_iter().next() else {
                        return Ok(None);
                    };

                    profile.identity_token = None;
                    profile.updated_at = now_rfc3339();

                    let update = IdentityTokenUpdate {
                        identity_token: None,
                        updated_at: profile.updated_at.clone(),
                    };
                    db.fluent()
                        .update()
                        .fields(paths!(IdentityTokenUpdate::{identity_token, updated_at}))
                        .in_col(collections::PROFILES)
                        .document_id(&profile.id)
                        .object(&update)
                        .add_to_transaction(transaction)?;

                    Ok(Some(profile))
                })
            })
            .await
            .map_err(|e| FeedError::Database(format!("Identity token consumption failed: {}", e)))?;

        if let Some(profile) = &taken {
            tracing::debug!(profile_id = %profile.id, "Identity token consumed");
        }
        Ok(taken)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| FeedError::Database(e.to_string()))
    }

    async fn tokens_for_profile(&self, profile_id: &str) -> Result<Vec<AccessToken>> {
        // Sorted client-side to avoid needing a composite index
        let mut tokens = Self::query_tokens(self.get_client()?, profile_id)
            .await
            .map_err(|e| FeedError::Database(e.to_string()))?;
        sort_newest_first(&mut tokens);
        Ok(tokens)
    }

    async fn replace_tokens(&self, profile_id: &str, token: &AccessToken) -> Result<()> {
        let owner = profile_id.to_string();
        let token = token.clone();

        // Reading the old set inside the transaction makes concurrent
        // replacements conflict, so exactly one token survives.
        let replaced = self
            .get_client()?
            .run_transaction::<usize, _, FirestoreError>(move |db, transaction| {
                let owner = owner.clone();
                let token = token.clone();
                Box::pin(async move {
                    let existing = Self::query_tokens(&db, &owner).await?;

                    for old in &existing {
                        db.fluent()
                            .delete()
                            .from(collections::TOKENS)
                            .document_id(&old.id)
                            .add_to_transaction(transaction)?;
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::TOKENS)
                        .document_id(&token.id)
                        .object(&token)
                        .add_to_transaction(transaction)?;

                    Ok(existing.len())
                })
            })
            .await
            .map_err(|e| FeedError::Database(format!("Token replacement failed: {}", e)))?;

        tracing::info!(profile_id, replaced, "Access tokens replaced atomically");
        Ok(())
    }

    async fn update_access_code(&self, token_id: &str, access_code: &str) -> Result<()> {
        let mut token: AccessToken = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TOKENS)
            .obj::<AccessToken>()
            .one(token_id)
            .await
            .map_err(|e| FeedError::Database(e.to_string()))?
            .ok_or_else(|| FeedError::NotFound(format!("Access token {}", token_id)))?;

        token.access_code = access_code.to_string();

        // Only the code is written; a replaced token is not recreated
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(AccessToken::{access_code}))
            .in_col(collections::TOKENS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(token_id)
            .object(&token)
            .execute()
            .await
            .map_err(|e| FeedError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_tokens(&self, profile_id: &str) -> Result<()> {
        let owner = profile_id.to_string();

        let deleted = self
            .get_client()?
            .run_transaction::<usize, _, FirestoreError>(move |db, transaction| {
                let owner = owner.clone();
                Box::pin(async move {
                    let existing = Self::query_tokens(&db, &owner).await?;
                    for token in &existing {
                        db.fluent()
                            .delete()
                            .from(collections::TOKENS)
                            .document_id(&token.id)
                            .add_to_transaction(transaction)?;
                    }
                    Ok(existing.len())
                })
            })
            .await
            .map_err(|e| FeedError::Database(format!("Failed to delete tokens: {}", e)))?;

        tracing::debug!(profile_id, count = deleted, "Deleted access tokens");
        Ok(())
    }
}

#[async_trait]
impl FeedCache for FirestoreDb {
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get_cached_feed(key).await?.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<FeedPayload>> {
        match self.get_cached_feed(key).await? {
            Some(entry) => serde_json::from_str(&entry.payload_json)
                .map(Some)
                .map_err(|e| FeedError::Cache(format!("Corrupt cache entry {}: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn forever(&self, key: &str, payload: &FeedPayload) -> Result<()> {
        let entry = CachedFeed {
            key: key.to_string(),
            payload_json: serde_json::to_string(payload)
                .map_err(|e| FeedError::Cache(e.to_string()))?,
            stored_at: now_rfc3339(),
        };

        // Single document write: concurrent writers are last-writer-wins
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FEED_CACHE)
            .document_id(Self::cache_doc_id(key))
            .object(&entry)
            .execute()
            .await
            .map_err(|e| FeedError::Cache(e.to_string()))?;
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<()> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::FEED_CACHE)
            .document_id(Self::cache_doc_id(key))
            .execute()
            .await
            .map_err(|e| FeedError::Cache(e.to_string()))?;
        Ok(())
    }
}
