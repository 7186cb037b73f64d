//! OAuth2 client-credentials token exchange.
//!
//! One exchange per (token URL, client id) pair per run; tokens are cached
//! until shortly before expiry so per-client lookups reuse the global token
//! when clients share credentials.

use crate::types::{AppError, AppResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Refresh this long before the reported expiry.
const EXPIRY_SLACK: Duration = Duration::from_secs(5);

/// Assumed lifetime when the token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct TokenProvider {
    http: reqwest::Client,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Bearer token for the given credentials, from cache or a fresh exchange.
    pub async fn token(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        scope: &str,
    ) -> AppResult<String> {
        let cache_key = format!("{token_url}|{client_id}");

        if let Some(token) = self.cached(&cache_key) {
            debug!(client_id, "Reusing cached access token");
            return Ok(token);
        }

        let response = self.exchange(token_url, client_id, client_secret, scope).await?;
        let lifetime = response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = Instant::now() + Duration::from_secs(lifetime);

        let mut cache = self.cache.lock().unwrap();
        cache.insert(
            cache_key,
            CachedToken {
                token: response.access_token.clone(),
                expires_at,
            },
        );

        Ok(response.access_token)
    }

    fn cached(&self, key: &str) -> Option<String> {
        let cache = self.cache.lock().unwrap();
        cache.get(key).and_then(|entry| {
            if entry.expires_at.saturating_duration_since(Instant::now()) > EXPIRY_SLACK {
                Some(entry.token.clone())
            } else {
                None
            }
        })
    }

    async fn exchange(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        scope: &str,
    ) -> AppResult<TokenResponse> {
        info!(client_id, "Exchanging client credentials for access token");

        let response = self
            .http
            .post(token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("scope", scope),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::TokenExchange(format!(
                "{token_url} returned {status}"
            )));
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn provider() -> TokenProvider {
        TokenProvider::new(reqwest::Client::new())
    }

    #[tokio::test]
    async fn exchanges_credentials_for_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "abc".into()),
                Matcher::UrlEncoded("scope".into(), "dex/trigger:all".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "tok-1", "expires_in": 3600}"#)
            .create_async()
            .await;

        let url = format!("{}/token", server.url());
        let token = provider()
            .token(&url, "abc", "secret", "dex/trigger:all")
            .await
            .unwrap();

        assert_eq!(token, "tok-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn caches_token_until_expiry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "tok-1", "expires_in": 3600}"#)
            .expect(1)
            .create_async()
            .await;

        let url = format!("{}/token", server.url());
        let provider = provider();
        let first = provider.token(&url, "abc", "secret", "s").await.unwrap();
        let second = provider.token(&url, "abc", "secret", "s").await.unwrap();

        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn distinct_clients_get_distinct_exchanges() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "tok", "expires_in": 3600}"#)
            .expect(2)
            .create_async()
            .await;

        let url = format!("{}/token", server.url());
        let provider = provider();
        provider.token(&url, "abc", "s1", "s").await.unwrap();
        provider.token(&url, "xyz", "s2", "s").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(401)
            .with_body(r#"{"error": "invalid_client"}"#)
            .create_async()
            .await;

        let url = format!("{}/token", server.url());
        let err = provider()
            .token(&url, "abc", "bad", "s")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TokenExchange(_)));
    }
}
