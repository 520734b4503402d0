// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cache;
pub mod identity;
pub mod instagram;
pub mod profile;

pub use cache::{cache_key, FeedCache, MemoryFeedCache};
pub use identity::{RandomTokenGenerator, TokenGenerator};
pub use instagram::{CallbackParams, InstagramClient, ProviderClient};
pub use profile::{ProfileService, RefreshSummary};
