// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use instagram_feed::db::{FirestoreDb, MemoryDb};
use instagram_feed::error::{FeedError, Result};
use instagram_feed::models::{FeedPayload, Profile};
use instagram_feed::services::instagram::{LongLivedToken, ShortLivedToken, UserDetails};
use instagram_feed::services::{MemoryFeedCache, ProfileService, ProviderClient, TokenGenerator};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Identity tokens `ident-0001`, `ident-0002`, ...
#[derive(Default)]
pub struct SequenceTokenGenerator {
    next: AtomicUsize,
}

impl TokenGenerator for SequenceTokenGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("ident-{:04}", n)
    }
}

/// Which fake provider call should fail.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    RequestToken,
    UserDetails,
    Exchange,
    Refresh,
    Media,
}

/// Recording stand-in for the Instagram API.
#[derive(Default)]
pub struct FakeProvider {
    pub calls: Mutex<Vec<&'static str>>,
    pub fail: Mutex<Vec<FailAt>>,
    pub media: Mutex<FeedPayload>,
    pub media_count: Mutex<Option<u32>>,
    refreshes: AtomicUsize,
    tag_each_fetch: AtomicBool,
    fetches: AtomicUsize,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new() -> Self {
        let provider = Self::default();
        *provider.media.lock().unwrap() = sample_media("a");
        *provider.media_count.lock().unwrap() = Some(42);
        provider
    }

    pub fn fail_at(&self, step: FailAt) {
        self.fail.lock().unwrap().push(step);
    }

    pub fn recover(&self) {
        self.fail.lock().unwrap().clear();
    }

    pub fn set_media(&self, media: FeedPayload) {
        *self.media.lock().unwrap() = media;
    }

    /// Return `sample_media("fetch-N")` from the N-th media fetch on.
    pub fn tag_each_fetch(&self) {
        self.tag_each_fetch.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| **c == name).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, name: &'static str, step: FailAt) -> Result<()> {
        self.calls.lock().unwrap().push(name);
        if self.fail.lock().unwrap().contains(&step) {
            return Err(FeedError::InstagramApi(format!("{} failed: HTTP 500", name)));
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    fn auth_url_for_profile(&self, profile: &Profile) -> Result<String> {
        let state = profile
            .identity_token
            .as_deref()
            .ok_or_else(|| FeedError::BadRequest("no identity token".to_string()))?;
        Ok(format!(
            "https://api.instagram.com/oauth/authorize?client_id=test&state={}",
            state
        ))
    }

    async fn request_token_for_profile(
        &self,
        _profile: &Profile,
        code: &str,
    ) -> Result<ShortLivedToken> {
        self.record("request_token", FailAt::RequestToken)?;
        Ok(ShortLivedToken {
            access_token: format!("short-{}", code),
            user_id: Some("1789".to_string()),
        })
    }

    async fn fetch_user_details(&self, _access_token: &str) -> Result<UserDetails> {
        self.record("user_details", FailAt::UserDetails)?;
        let mut details: UserDetails = serde_json::from_value(json!({
            "id": "1789",
            "username": "insta_jane",
            "name": "Jane Doe",
            "profile_picture_url": "https://cdn.example/jane.jpg",
            "account_type": "PERSONAL"
        }))
        .unwrap();
        details.media_count = *self.media_count.lock().unwrap();
        Ok(details)
    }

    async fn exchange_token(&self, short_lived: &ShortLivedToken) -> Result<LongLivedToken> {
        self.record("exchange", FailAt::Exchange)?;
        Ok(LongLivedToken {
            access_token: short_lived.access_token.replace("short-", "long-"),
            token_type: Some("bearer".to_string()),
            expires_in: Some(5_184_000),
        })
    }

    async fn refresh_token(&self, access_token: &str) -> Result<LongLivedToken> {
        self.record("refresh", FailAt::Refresh)?;
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(LongLivedToken {
            access_token: format!("{}-r{}", access_token, n),
            token_type: Some("bearer".to_string()),
            expires_in: Some(5_184_000),
        })
    }

    async fn fetch_media(&self, _access_token: &str, limit: usize) -> Result<FeedPayload> {
        self.record("media", FailAt::Media)?;
        if self.tag_each_fetch.load(Ordering::SeqCst) {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            let media = sample_media(&format!("fetch-{}", n));
            return Ok(media.into_iter().take(limit).collect());
        }
        Ok(self.media.lock().unwrap().iter().take(limit).cloned().collect())
    }
}

/// Media items tagged with `tag` so tests can tell payloads apart.
#[allow(dead_code)]
pub fn sample_media(tag: &str) -> FeedPayload {
    (1..=3)
        .map(|i| {
            json!({
                "id": format!("{}-{}", tag, i),
                "media_type": "IMAGE",
                "media_url": format!("https://cdn.example/{}/{}.jpg", tag, i),
                "caption": null,
                "children": {"data": []}
            })
        })
        .collect()
}

/// Service wired to in-memory collaborators.
#[allow(dead_code)]
pub struct TestHarness {
    pub service: ProfileService,
    pub provider: Arc<FakeProvider>,
    pub db: Arc<MemoryDb>,
    pub cache: Arc<MemoryFeedCache>,
}

#[allow(dead_code)]
pub fn harness() -> TestHarness {
    let provider = Arc::new(FakeProvider::new());
    let db = Arc::new(MemoryDb::new());
    let cache = Arc::new(MemoryFeedCache::new());
    let tokens = Arc::new(SequenceTokenGenerator::default());

    let service = ProfileService::new(db.clone(), provider.clone(), cache.clone(), tokens);

    TestHarness {
        service,
        provider,
        db,
        cache,
    }
}

/// Create a profile and connect it with a successful handshake.
#[allow(dead_code)]
pub async fn connected_profile(h: &TestHarness, username: &str) -> Profile {
    use instagram_feed::services::CallbackParams;

    let profile = h.service.create_profile(username).await.unwrap();
    h.service
        .request_token(&profile, &CallbackParams::with_code("code-1"))
        .await
        .unwrap();
    h.provider.clear_calls();
    profile
}
