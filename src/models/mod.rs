// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod feed;
pub mod profile;
pub mod token;
pub mod view;

pub use feed::{Feed, FeedPayload};
pub use profile::Profile;
pub use token::AccessToken;
pub use view::ProfileView;
