// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Instagram Basic Display API client.
//!
//! Handles:
//! - Authorization URL construction
//! - Code-for-token exchange and long-lived token exchange
//! - Token refresh
//! - User detail and media fetches (with paging)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::models::{FeedPayload, Profile};

const API_BASE_URL: &str = "https://api.instagram.com";
const GRAPH_BASE_URL: &str = "https://graph.instagram.com";

const USER_FIELDS: &str = "id,username,account_type,media_count";
const MEDIA_FIELDS: &str =
    "caption,id,media_type,media_url,thumbnail_url,permalink,children{media_type,media_url},timestamp";

/// Upstream operations the profile lifecycle depends on.
///
/// Implemented by [`InstagramClient`]; tests substitute a recording fake.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Authorization URL carrying the profile's identity token as `state`.
    fn auth_url_for_profile(&self, profile: &Profile) -> Result<String>;

    /// Exchange an authorization code for a short-lived token.
    async fn request_token_for_profile(
        &self,
        profile: &Profile,
        code: &str,
    ) -> Result<ShortLivedToken>;

    /// Fetch the Instagram user behind an access token.
    async fn fetch_user_details(&self, access_token: &str) -> Result<UserDetails>;

    /// Exchange a short-lived token for a long-lived one.
    async fn exchange_token(&self, short_lived: &ShortLivedToken) -> Result<LongLivedToken>;

    /// Extend a long-lived token.
    async fn refresh_token(&self, access_token: &str) -> Result<LongLivedToken>;

    /// Fetch up to `limit` media items.
    async fn fetch_media(&self, access_token: &str, limit: usize) -> Result<FeedPayload>;
}

/// Query parameters Instagram sends to the authorization callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_reason: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Callback carrying an authorization code.
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Callback carrying an error (e.g. the user pressed "Cancel").
    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// The authorization code, or `AuthorizationDenied` when the callback
    /// reports an error or carries no code.
    pub fn authorization_code(&self) -> Result<&str> {
        if let Some(error) = &self.error {
            let reason = self
                .error_description
                .as_deref()
                .or(self.error_reason.as_deref())
                .unwrap_or(error);
            return Err(FeedError::AuthorizationDenied(reason.to_string()));
        }

        match self.code.as_deref() {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(FeedError::AuthorizationDenied(
                "callback did not include an authorization code".to_string(),
            )),
        }
    }
}

/// Short-lived token returned by the code exchange.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShortLivedToken {
    pub access_token: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub user_id: Option<String>,
}

/// Long-lived token returned by the exchange and refresh endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LongLivedToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until expiry
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Instagram user fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UserDetails {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "name", alias = "full_name")]
    pub fullname: Option<String>,
    #[serde(default, alias = "profile_picture_url", alias = "profile_picture")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub media_count: Option<u32>,
    /// Remaining fields (e.g. `account_type`)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Instagram returns user IDs as numbers from some endpoints and strings from others.
fn de_opt_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// One page of the media listing.
#[derive(Debug, Deserialize)]
struct MediaPage {
    #[serde(default)]
    data: FeedPayload,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<String>,
}

/// Append a page to `items` and return the next page URL, if paging should
/// continue. Stops at `limit` items, on the last page, or on an empty page.
fn collect_page(items: &mut FeedPayload, page: MediaPage, limit: usize) -> Option<String> {
    if page.data.is_empty() {
        return None;
    }
    items.extend(page.data);
    if items.len() >= limit {
        return None;
    }
    page.paging.and_then(|p| p.next)
}

/// Instagram API client.
#[derive(Clone)]
pub struct InstagramClient {
    http: reqwest::Client,
    api_base_url: String,
    graph_base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl InstagramClient {
    /// Create a new client with OAuth credentials and a request timeout.
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            api_base_url: API_BASE_URL.to_string(),
            graph_base_url: GRAPH_BASE_URL.to_string(),
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// Create a client from application config.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.instagram_client_id.clone(),
            config.instagram_client_secret.clone(),
            config.instagram_redirect_uri.clone(),
            config.request_timeout,
        )
    }

    /// Point the client at other hosts (local stubs).
    pub fn with_base_urls(mut self, api_base_url: &str, graph_base_url: &str) -> Self {
        self.api_base_url = api_base_url.trim_end_matches('/').to_string();
        self.graph_base_url = graph_base_url.trim_end_matches('/').to_string();
        self
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FeedError::InstagramApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Instagram rate limit hit (429)");
                return Err(FeedError::InstagramApi(
                    FeedError::INSTAGRAM_RATE_LIMIT.to_string(),
                ));
            }

            // Instagram reports bad or expired tokens as OAuthException (400 or 401)
            if status.as_u16() == 401 || (status.as_u16() == 400 && body.contains("OAuthException"))
            {
                tracing::debug!(status = %status, body = %body, "Instagram rejected token");
                return Err(FeedError::InstagramApi(
                    FeedError::INSTAGRAM_TOKEN_ERROR.to_string(),
                ));
            }

            return Err(FeedError::InstagramApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| FeedError::InstagramApi(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl ProviderClient for InstagramClient {
    fn auth_url_for_profile(&self, profile: &Profile) -> Result<String> {
        let state = profile.identity_token.as_deref().ok_or_else(|| {
            FeedError::BadRequest(format!(
                "profile {} has no identity token to use as state",
                profile.id
            ))
        })?;

        Ok(format!(
            "{}/oauth/authorize?client_id={}&redirect_uri={}&scope=user_profile,user_media&response_type=code&state={}",
            self.api_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state),
        ))
    }

    async fn request_token_for_profile(
        &self,
        profile: &Profile,
        code: &str,
    ) -> Result<ShortLivedToken> {
        tracing::debug!(profile_id = %profile.id, "Exchanging authorization code");

        let response = self
            .http
            .post(format!("{}/oauth/access_token", self.api_base_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| FeedError::InstagramApi(format!("Token exchange failed: {}", e)))?;

        self.check_response_json(response).await
    }

    async fn fetch_user_details(&self, access_token: &str) -> Result<UserDetails> {
        let url = format!("{}/me", self.graph_base_url);
        self.get_json(&url, &[("fields", USER_FIELDS), ("access_token", access_token)])
            .await
    }

    async fn exchange_token(&self, short_lived: &ShortLivedToken) -> Result<LongLivedToken> {
        let url = format!("{}/access_token", self.graph_base_url);
        self.get_json(
            &url,
            &[
                ("grant_type", "ig_exchange_token"),
                ("client_secret", self.client_secret.as_str()),
                ("access_token", short_lived.access_token.as_str()),
            ],
        )
        .await
    }

    async fn refresh_token(&self, access_token: &str) -> Result<LongLivedToken> {
        let url = format!("{}/refresh_access_token", self.graph_base_url);
        self.get_json(
            &url,
            &[
                ("grant_type", "ig_refresh_token"),
                ("access_token", access_token),
            ],
        )
        .await
    }

    async fn fetch_media(&self, access_token: &str, limit: usize) -> Result<FeedPayload> {
        let limit_param = limit.to_string();
        let first_url = format!("{}/me/media", self.graph_base_url);
        let mut page: MediaPage = self
            .get_json(
                &first_url,
                &[
                    ("fields", MEDIA_FIELDS),
                    ("limit", limit_param.as_str()),
                    ("access_token", access_token),
                ],
            )
            .await?;

        let mut items = Vec::with_capacity(limit);
        // `next` already carries fields, limit and token
        while let Some(url) = collect_page(&mut items, page, limit) {
            page = self.get_json(&url, &[]).await?;
        }

        items.truncate(limit);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> InstagramClient {
        InstagramClient::new(
            "client id".to_string(),
            "secret".to_string(),
            "https://example.com/instagram/callback".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_auth_url_embeds_identity_token() {
        let mut profile = Profile::new("jane");
        profile.identity_token = Some("AbC123xyz0987654".to_string());

        let url = client().auth_url_for_profile(&profile).unwrap();

        assert!(url.starts_with("https://api.instagram.com/oauth/authorize?"));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.com%2Finstagram%2Fcallback"));
        assert!(url.contains("scope=user_profile,user_media"));
        assert!(url.contains("response_type=code"));
        assert!(url.ends_with("state=AbC123xyz0987654"));
    }

    #[test]
    fn test_auth_url_follows_base_url() {
        let mut profile = Profile::new("jane");
        profile.identity_token = Some("tok".to_string());

        let url = client()
            .with_base_urls("http://localhost:9000/", "http://localhost:9001")
            .auth_url_for_profile(&profile)
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/oauth/authorize?"));
    }

    #[test]
    fn test_auth_url_requires_identity_token() {
        let profile = Profile::new("jane");
        let err = client().auth_url_for_profile(&profile).unwrap_err();
        assert!(matches!(err, FeedError::BadRequest(_)));
    }

    #[test]
    fn test_callback_params_code() {
        let params = CallbackParams::with_code("AQD-code");
        assert_eq!(params.authorization_code().unwrap(), "AQD-code");
    }

    #[test]
    fn test_callback_params_error_wins_over_code() {
        let params = CallbackParams {
            code: Some("AQD-code".to_string()),
            error: Some("access_denied".to_string()),
            error_reason: Some("user_denied".to_string()),
            ..CallbackParams::default()
        };
        let err = params.authorization_code().unwrap_err();
        assert!(matches!(err, FeedError::AuthorizationDenied(ref r) if r == "user_denied"));
    }

    #[test]
    fn test_callback_params_missing_or_blank_code() {
        assert!(matches!(
            CallbackParams::default().authorization_code(),
            Err(FeedError::AuthorizationDenied(_))
        ));
        assert!(matches!(
            CallbackParams::with_code("").authorization_code(),
            Err(FeedError::AuthorizationDenied(_))
        ));
    }

    #[test]
    fn test_short_lived_token_numeric_user_id() {
        let token: ShortLivedToken =
            serde_json::from_value(json!({"access_token": "short", "user_id": 17841400000000000u64}))
                .unwrap();
        assert_eq!(token.user_id.as_deref(), Some("17841400000000000"));
    }

    #[test]
    fn test_user_details_defaults() {
        let details: UserDetails =
            serde_json::from_value(json!({"id": "1", "username": "jane"})).unwrap();
        assert_eq!(details.media_count, None);
        assert_eq!(details.fullname, None);
        assert!(details.extra.is_empty());
    }

    #[test]
    fn test_media_page_parsing() {
        let page: MediaPage = serde_json::from_value(json!({
            "data": [{"id": "1"}, {"id": "2"}],
            "paging": {"cursors": {"after": "x"}, "next": "https://graph.instagram.com/next"}
        }))
        .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(
            page.paging.and_then(|p| p.next).as_deref(),
            Some("https://graph.instagram.com/next")
        );

        let last: MediaPage = serde_json::from_value(json!({"data": []})).unwrap();
        assert!(last.paging.is_none());
    }

    fn page(value: serde_json::Value) -> MediaPage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_collect_page_follows_next_until_limit() {
        let mut items = Vec::new();

        let next = collect_page(
            &mut items,
            page(json!({"data": [{"id": "1"}], "paging": {"next": "https://next/2"}})),
            3,
        );
        assert_eq!(next.as_deref(), Some("https://next/2"));

        let next = collect_page(
            &mut items,
            page(json!({"data": [{"id": "2"}, {"id": "3"}], "paging": {"next": "https://next/3"}})),
            3,
        );
        assert_eq!(next, None);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_collect_page_stops_on_empty_page() {
        let mut items = vec![json!({"id": "1"})];

        let next = collect_page(
            &mut items,
            page(json!({"data": [], "paging": {"next": "https://next/forever"}})),
            20,
        );

        assert_eq!(next, None);
        assert_eq!(items.len(), 1);
    }
}
