//! REST client
//!
//! Thin reqwest wrapper around the backend's JSON API. Construction is
//! explicit: the caller owns the token store and hands an `Arc` in, so tests
//! and multiple accounts can run side by side without global state.

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use super::types::{AccessResponse, TextbookPage, TokenResponse, UserProfile};
use crate::auth::TokenStore;
use crate::conversation::Message;
use crate::query::FilterQuery;

/// REST errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Client for the marketplace REST backend
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(base: &str, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let base = Url::parse(base).map_err(|_| ApiError::InvalidBaseUrl(base.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|_| ApiError::InvalidBaseUrl(path.to_string()))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Send an authorized request; on 401, refresh the access token once and
    /// retry. A failed refresh clears the stored session.
    async fn execute(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let response = self.authorize(build()).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check(response).await;
        }
        if self.tokens.refresh_token().is_none() {
            return Err(ApiError::Unauthorized);
        }
        match self.refresh_access().await {
            Ok(_) => {
                debug!("Access token refreshed, retrying request");
                let retry = self.authorize(build()).send().await?;
                if retry.status() == StatusCode::UNAUTHORIZED {
                    return Err(ApiError::Unauthorized);
                }
                Self::check(retry).await
            }
            Err(e) => {
                warn!("Token refresh failed, clearing session: {}", e);
                self.tokens.clear();
                Err(ApiError::Unauthorized)
            }
        }
    }

    /// Obtain a token pair, persist it, and fetch the account profile
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, ApiError> {
        let url = self.endpoint("/token/")?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({"username": username, "password": password}))
            .send()
            .await?;
        let pair: TokenResponse = Self::check(response).await?.json().await?;
        self.tokens.set_tokens(pair.access, pair.refresh);

        let me = self.endpoint("/users/me/")?;
        let response = self.execute(|| self.http.get(me.clone())).await?;
        Ok(response.json().await?)
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh_access(&self) -> Result<String, ApiError> {
        let refresh = self.tokens.refresh_token().ok_or(ApiError::Unauthorized)?;
        let url = self.endpoint("/token/refresh/")?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({"refresh": refresh}))
            .send()
            .await?;
        let body: AccessResponse = Self::check(response).await?.json().await?;
        self.tokens.set_access_token(body.access.clone());
        Ok(body.access)
    }

    /// Full message history with one peer, oldest first
    pub async fn conversation(&self, peer: &str) -> Result<Vec<Message>, ApiError> {
        let url = self.endpoint(&format!("/api/chat/conversation/{}/", peer))?;
        let response = self.execute(|| self.http.get(url.clone())).await?;
        Ok(response.json().await?)
    }

    /// Batch-mark messages as seen; the response body is ignored
    pub async fn mark_seen(&self, ids: &[i64]) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Ok(());
        }
        let url = self.endpoint("/api/chat/mark/")?;
        self.execute(|| {
            self.http
                .post(url.clone())
                .json(&serde_json::json!({"ids_to_mark": ids}))
        })
        .await?;
        Ok(())
    }

    /// Search listings with the given filter/sort/offset state
    pub async fn textbooks(&self, query: &FilterQuery) -> Result<TextbookPage, ApiError> {
        let mut url = self.endpoint("/api/textbooks/")?;
        let encoded = query.encode("");
        if !encoded.is_empty() {
            url.set_query(Some(&encoded));
        }
        let response = self.execute(|| self.http.get(url.clone())).await?;
        Ok(response.json().await?)
    }

    /// All listings by one seller (profile page)
    pub async fn textbooks_by_seller(&self, seller: &str) -> Result<TextbookPage, ApiError> {
        let mut url = self.endpoint("/api/textbooks/")?;
        url.query_pairs_mut().append_pair("seller", seller);
        let response = self.execute(|| self.http.get(url.clone())).await?;
        Ok(response.json().await?)
    }

    /// One listing's detail page payload
    pub async fn textbook(&self, id: i64) -> Result<super::types::Textbook, ApiError> {
        let url = self.endpoint(&format!("/api/textbook/{}/", id))?;
        let response = self.execute(|| self.http.get(url.clone())).await?;
        Ok(response.json().await?)
    }
}
