// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance sweep tests.

use instagram_feed::db::ProfileRepository;
use instagram_feed::services::{cache_key, FeedCache, RefreshSummary};

mod common;
use common::{connected_profile, harness, sample_media, FailAt};

#[tokio::test]
async fn test_refresh_authorized_tokens_skips_unconnected() {
    let h = harness();
    let jane = connected_profile(&h, "jane").await;
    let john = connected_profile(&h, "john").await;
    h.service.create_profile("nobody").await.unwrap();

    let summary = h.service.refresh_authorized_tokens().await.unwrap();

    assert_eq!(
        summary,
        RefreshSummary {
            refreshed: 2,
            failed: 0,
            skipped: 1
        }
    );
    for profile in [&jane, &john] {
        let code = h.service.access_code(profile).await.unwrap().unwrap();
        assert!(code.starts_with("long-code-1-r"), "refreshed: {}", code);
    }
}

#[tokio::test]
async fn test_refresh_authorized_tokens_counts_failures() {
    let h = harness();
    connected_profile(&h, "jane").await;
    h.provider.fail_at(FailAt::Refresh);

    let summary = h.service.refresh_authorized_tokens().await.unwrap();

    assert_eq!(summary.refreshed, 0);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_refresh_authorized_feeds() {
    let mut h = harness();
    h.service = h.service.clone().with_maintenance_concurrency(1);
    let jane = connected_profile(&h, "jane").await;
    h.service.create_profile("nobody").await.unwrap();
    h.provider.set_media(sample_media("sweep"));

    let summary = h.service.refresh_authorized_feeds(20).await.unwrap();

    assert_eq!(summary.refreshed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        h.cache.get(&cache_key(&jane.id)).await.unwrap(),
        Some(sample_media("sweep"))
    );
    let stored = h.db.get_profile(&jane.id).await.unwrap().unwrap();
    assert_eq!(stored.media_count, 42);
}

#[tokio::test]
async fn test_refresh_authorized_feeds_continues_after_failure() {
    let h = harness();
    connected_profile(&h, "jane").await;
    connected_profile(&h, "john").await;
    h.provider.fail_at(FailAt::Media);

    let summary = h.service.refresh_authorized_feeds(20).await.unwrap();

    assert_eq!(summary.failed, 2);
    assert!(h.cache.is_empty());
}
