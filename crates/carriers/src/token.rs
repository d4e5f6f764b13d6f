//! Access tokens for carriers that authenticate with OAuth2.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::TokenError;

/// A cached token is re-fetched once it is this close to expiring.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when a token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

/// Issuer-reported lifetimes are capped to this.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// A bearer token together with its lifetime as reported by the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Duration,
}

/// Hands out bearer tokens for carrier APIs.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_access_token(&self, carrier: &str) -> Result<String, TokenError>;

    /// Drops any cached token, forcing the next call to fetch a new one.
    async fn invalidate(&self, carrier: &str);
}

/// Obtains fresh tokens from an issuer. No caching.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self, carrier: &str) -> Result<AccessToken, TokenError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    /// Served from cache strictly before this instant.
    fresh_until: Instant,
}

/// [`TokenProvider`] caching tokens per carrier until shortly before expiry.
///
/// The cache lock is never held across a fetch. Two callers that miss at the
/// same time both fetch and the later write wins, which is harmless.
#[derive(Clone)]
pub struct CachedTokenProvider<S> {
    source: Arc<S>,
    safety_margin: Duration,
    cache: Arc<RwLock<HashMap<String, CachedToken>>>,
}

impl<S: TokenSource> CachedTokenProvider<S> {
    pub fn new(source: S) -> Self {
        Self::with_safety_margin(source, DEFAULT_SAFETY_MARGIN)
    }

    pub fn with_safety_margin(source: S, safety_margin: Duration) -> Self {
        Self {
            source: Arc::new(source),
            safety_margin,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    async fn cached(&self, carrier: &str) -> Option<String> {
        let cache = self.cache.read().await;
        cache
            .get(carrier)
            .filter(|entry| Instant::now() < entry.fresh_until)
            .map(|entry| entry.token.clone())
    }

    /// How long a token with the issuer's `expires_in` may be served.
    ///
    /// The lifetime is capped at [`MAX_TOKEN_LIFETIME`]. A token that
    /// expires within the safety margin is served for half its lifetime.
    fn reuse_window(&self, carrier: &str, expires_in: Duration) -> Duration {
        let lifetime = expires_in.min(MAX_TOKEN_LIFETIME);
        match lifetime.checked_sub(self.safety_margin) {
            Some(window) if !window.is_zero() => window,
            _ => {
                tracing::warn!(
                    carrier,
                    expires_in_secs = expires_in.as_secs(),
                    safety_margin_secs = self.safety_margin.as_secs(),
                    "Carrier token lifetime is within the safety margin"
                );
                lifetime / 2
            }
        }
    }
}

#[async_trait]
impl<S: TokenSource> TokenProvider for CachedTokenProvider<S> {
    async fn get_access_token(&self, carrier: &str) -> Result<String, TokenError> {
        if let Some(token) = self.cached(carrier).await {
            return Ok(token);
        }

        let fetched = self.source.fetch_token(carrier).await?;
        metrics::counter!("carrier_token_refresh_total", "carrier" => carrier.to_string())
            .increment(1);
        tracing::debug!(
            carrier,
            expires_in_secs = fetched.expires_in.as_secs(),
            "Fetched carrier access token"
        );

        let window = self.reuse_window(carrier, fetched.expires_in);
        if let Some(fresh_until) = Instant::now().checked_add(window) {
            let mut cache = self.cache.write().await;
            cache.insert(
                carrier.to_string(),
                CachedToken {
                    token: fetched.token.clone(),
                    fresh_until,
                },
            );
        }
        Ok(fetched.token)
    }

    async fn invalidate(&self, carrier: &str) {
        let mut cache = self.cache.write().await;
        if cache.remove(carrier).is_some() {
            tracing::info!(carrier, "Invalidated cached carrier access token");
        }
    }
}

/// OAuth2 client-credentials configuration for one carrier.
#[derive(Clone, Default)]
pub struct OAuthCredentials {
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
}

impl OAuthCredentials {
    /// Returns the id/secret pair if both are present and non-blank.
    fn pair(&self) -> Option<(&str, &str)> {
        let id = self.client_id.as_deref().filter(|s| !s.trim().is_empty())?;
        let secret = self
            .client_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())?;
        Some((id, secret))
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// [`TokenSource`] performing the OAuth2 client-credentials grant.
#[derive(Debug, Clone)]
pub struct ClientCredentialsSource {
    client: reqwest::Client,
    credentials: HashMap<String, OAuthCredentials>,
}

impl ClientCredentialsSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            credentials: HashMap::new(),
        }
    }

    /// Registers credentials for `carrier`.
    pub fn with_carrier(mut self, carrier: impl Into<String>, credentials: OAuthCredentials) -> Self {
        self.credentials.insert(carrier.into(), credentials);
        self
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsSource {
    #[tracing::instrument(skip(self))]
    async fn fetch_token(&self, carrier: &str) -> Result<AccessToken, TokenError> {
        let not_configured = || TokenError::CredentialsNotConfigured(carrier.to_string());
        let credentials = self.credentials.get(carrier).ok_or_else(not_configured)?;
        let (client_id, client_secret) = credentials.pair().ok_or_else(not_configured)?;

        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        if let Some(scope) = credentials.scope.as_deref() {
            form.push(("scope", scope));
        }

        let response = self
            .client
            .post(&credentials.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| TokenError::Transport {
                carrier: carrier.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(TokenError::Rejected {
                    carrier: carrier.to_string(),
                    status: status.as_u16(),
                });
            }
            s if !s.is_success() => {
                return Err(TokenError::Transport {
                    carrier: carrier.to_string(),
                    reason: format!("HTTP {}", s.as_u16()),
                });
            }
            _ => {}
        }

        let body: TokenResponse = response.json().await.map_err(|e| TokenError::Decode {
            carrier: carrier.to_string(),
            reason: e.to_string(),
        })?;

        Ok(AccessToken {
            token: body.access_token,
            expires_in: body
                .expires_in
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TOKEN_LIFETIME),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
        lifetime: Duration,
    }

    impl CountingSource {
        fn with_lifetime(lifetime: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                lifetime,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self, carrier: &str) -> Result<AccessToken, TokenError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AccessToken {
                token: format!("{carrier}-token-{n}"),
                expires_in: self.lifetime,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_reused_until_safety_margin() {
        let provider =
            CachedTokenProvider::new(CountingSource::with_lifetime(Duration::from_secs(600)));

        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-1");
        tokio::time::advance(Duration::from_secs(500)).await;
        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-1");
        assert_eq!(provider.source().calls(), 1);

        // 560s elapsed: within 60s of expiry.
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-2");
        assert_eq!(provider.source().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_are_cached_per_carrier() {
        let provider =
            CachedTokenProvider::new(CountingSource::with_lifetime(Duration::from_secs(3600)));

        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-1");
        assert_eq!(provider.get_access_token("DPD").await.unwrap(), "DPD-token-2");
        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-1");
        assert_eq!(provider.source().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_lifetime_is_capped() {
        let provider =
            CachedTokenProvider::new(CountingSource::with_lifetime(Duration::from_secs(u64::MAX)));

        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-1");
        tokio::time::advance(Duration::from_secs(23 * 60 * 60)).await;
        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-1");

        tokio::time::advance(Duration::from_secs(60 * 60)).await;
        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-2");
        assert_eq!(provider.source().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifetime_within_safety_margin_is_still_reused() {
        let provider =
            CachedTokenProvider::new(CountingSource::with_lifetime(Duration::from_secs(30)));

        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-1");
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-1");
        assert_eq!(provider.source().calls(), 1);

        // Half of the 30s lifetime has passed.
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let provider =
            CachedTokenProvider::new(CountingSource::with_lifetime(Duration::from_secs(3600)));

        provider.get_access_token("PPL").await.unwrap();
        provider.invalidate("PPL").await;
        assert_eq!(provider.get_access_token("PPL").await.unwrap(), "PPL-token-2");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_network() {
        let source = ClientCredentialsSource::new(reqwest::Client::new()).with_carrier(
            "PPL",
            OAuthCredentials {
                token_url: "http://127.0.0.1:9/token".to_string(),
                client_id: Some("id".to_string()),
                client_secret: Some("  ".to_string()),
                scope: None,
            },
        );

        assert_eq!(
            source.fetch_token("PPL").await.unwrap_err(),
            TokenError::CredentialsNotConfigured("PPL".to_string())
        );
        assert_eq!(
            source.fetch_token("GLS").await.unwrap_err(),
            TokenError::CredentialsNotConfigured("GLS".to_string())
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credentials = OAuthCredentials {
            token_url: "https://example.test/token".to_string(),
            client_id: Some("id".to_string()),
            client_secret: Some("hunter2".to_string()),
            scope: None,
        };
        let printed = format!("{credentials:?}");
        assert!(!printed.contains("hunter2"));
    }
}
