// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the profile lifecycle and its collaborators.

/// Crate error type.
///
/// `AuthorizationDenied` and `TokenAcquisitionFailed` are the two expected
/// outcomes of the authorization handshake; callers render distinct states
/// for them. Everything else is an operational failure.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Unable to acquire access token: {0}")]
    TokenAcquisitionFailed(String),

    #[error("Instagram API error: {0}")]
    InstagramApi(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Profile already exists: {0}")]
    ProfileExists(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl FeedError {
    /// Message used when Instagram rejects the access token.
    pub const INSTAGRAM_TOKEN_ERROR: &'static str = "Instagram access token invalid or expired";

    /// Message used when Instagram rate limits the app.
    pub const INSTAGRAM_RATE_LIMIT: &'static str = "Instagram rate limit exceeded";

    /// True when an Instagram error indicates the token itself is unusable.
    pub fn is_instagram_token_error(&self) -> bool {
        match self {
            FeedError::InstagramApi(msg) => {
                msg == Self::INSTAGRAM_TOKEN_ERROR
                    || msg.contains("OAuthException")
                    || msg.contains("expired")
                    || msg.contains("Invalid")
                    || msg.contains("invalid")
            }
            _ => false,
        }
    }

    /// True for the recoverable handshake failures (user should retry auth).
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            FeedError::AuthorizationDenied(_) | FeedError::TokenAcquisitionFailed(_)
        )
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedError>;
