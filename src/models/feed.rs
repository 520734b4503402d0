// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feed view over a cached media payload.

use serde::Serialize;

/// Raw media items as returned by Instagram. Not reshaped by this crate.
pub type FeedPayload = Vec<serde_json::Value>;

/// A profile's media feed.
///
/// `Feed::empty()` is the "no data" value returned for profiles without
/// access and for failed lazy fetches; it is never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Feed {
    profile_id: Option<String>,
    items: FeedPayload,
}

impl Feed {
    /// Wrap a payload belonging to `profile_id`.
    pub fn new(profile_id: impl Into<String>, items: FeedPayload) -> Self {
        Self {
            profile_id: Some(profile_id.into()),
            items,
        }
    }

    /// The empty feed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Profile the feed was loaded for; `None` for the empty feed.
    pub fn profile_id(&self) -> Option<&str> {
        self.profile_id.as_deref()
    }

    pub fn items(&self) -> &[serde_json::Value] {
        &self.items
    }

    pub fn into_items(self) -> FeedPayload {
        self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, serde_json::Value> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Feed {
    type Item = &'a serde_json::Value;
    type IntoIter = std::slice::Iter<'a, serde_json::Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
