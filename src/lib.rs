// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Instagram feed: per-profile Instagram credentials and a cached media feed.
//!
//! This crate manages the OAuth handshake, token exchange and refresh for
//! local profiles, and serves each profile's Instagram media through a cache
//! that only changes on explicit refresh or credential replacement.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::FirestoreDb;
use error::Result;
use services::{InstagramClient, ProfileService, RandomTokenGenerator};

/// Build the production service: Firestore for profiles, tokens and the feed
/// cache, and the real Instagram client.
pub async fn build_service(config: &Config) -> Result<ProfileService> {
    let db = Arc::new(FirestoreDb::new(&config.gcp_project_id).await?);
    let instagram = Arc::new(InstagramClient::from_config(config)?);
    let tokens = Arc::new(RandomTokenGenerator::new(config.identity_token_length));

    Ok(
        ProfileService::new(db.clone(), instagram, db, tokens)
            .with_maintenance_concurrency(config.maintenance_concurrency),
    )
}
