// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use instagram_feed::error::FeedError;

#[test]
fn test_is_instagram_token_error_matches() {
    let err = FeedError::InstagramApi("Error validating access token: Session has expired".to_string());
    assert!(err.is_instagram_token_error());

    let err = FeedError::InstagramApi("Invalid OAuth access token".to_string());
    assert!(err.is_instagram_token_error());

    let err = FeedError::InstagramApi("HTTP 400: {\"error\":{\"type\":\"OAuthException\"}}".to_string());
    assert!(err.is_instagram_token_error());

    let err = FeedError::InstagramApi(FeedError::INSTAGRAM_TOKEN_ERROR.to_string());
    assert!(err.is_instagram_token_error());
}

#[test]
fn test_is_instagram_token_error_no_match() {
    let err = FeedError::InstagramApi(FeedError::INSTAGRAM_RATE_LIMIT.to_string());
    assert!(!err.is_instagram_token_error());

    let err = FeedError::InstagramApi("HTTP 500 Internal Server Error: ".to_string());
    assert!(!err.is_instagram_token_error());

    let err = FeedError::TokenAcquisitionFailed("expired code".to_string());
    assert!(!err.is_instagram_token_error());
}

#[test]
fn test_auth_failures_are_distinct() {
    assert!(FeedError::AuthorizationDenied("user_denied".to_string()).is_auth_failure());
    assert!(FeedError::TokenAcquisitionFailed("HTTP 400".to_string()).is_auth_failure());
    assert!(!FeedError::InstagramApi("HTTP 400".to_string()).is_auth_failure());
    assert!(!FeedError::NotFound("profile".to_string()).is_auth_failure());
}

#[test]
fn test_token_acquisition_message_carries_cause() {
    let err = FeedError::TokenAcquisitionFailed("Token exchange failed: timed out".to_string());
    assert_eq!(
        err.to_string(),
        "Unable to acquire access token: Token exchange failed: timed out"
    );
}
