//! Cached OAuth client-credentials token.
//!
//! The whole process shares one token slot. `TokenCache::get_token` holds the
//! slot mutex across a refresh, so concurrent callers during an expiry window
//! trigger exactly one exchange and all observe either the still-valid token
//! or the freshly issued one.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::AppConfig;

use super::DataverseError;

/// Bearer token plus its absolute expiry. Valid strictly before the expiry
/// instant, never served at or after it.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Performs the actual token exchange. Split out as a trait so tests can
/// count exchanges and simulate slow or failing identity providers.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self) -> Result<AccessToken, DataverseError>;
}

/// Exchanger hitting the Azure AD v2.0 token endpoint.
pub struct ClientCredentialsExchanger {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

impl ClientCredentialsExchanger {
    pub fn new(http: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            http,
            endpoint: config.token_endpoint(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.token_scope(),
        }
    }
}

#[async_trait]
impl TokenExchanger for ClientCredentialsExchanger {
    async fn exchange(&self) -> Result<AccessToken, DataverseError> {
        log::info!("Requesting access token for scope {}", self.scope);

        let response = self
            .http
            .post(&self.endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("scope", &self.scope),
            ])
            .send()
            .await
            .map_err(DataverseError::Unavailable)?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) if !err.error_description.is_empty() => {
                    format!("{}: {}", err.error, err.error_description)
                }
                _ => body,
            };
            log::error!("Token exchange rejected: {message}");
            return Err(DataverseError::AuthenticationFailed { message });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DataverseError::BadResponse(format!("token response: {e}")))?;

        let expires_at = Utc::now() + Duration::seconds(token.expires_in);
        log::info!("Access token obtained, expires at {expires_at}");

        Ok(AccessToken {
            token: token.access_token,
            expires_at,
        })
    }
}

/// Single-slot, expiry-aware token cache.
pub struct TokenCache<E: TokenExchanger> {
    exchanger: E,
    slot: Mutex<Option<AccessToken>>,
}

impl<E: TokenExchanger> TokenCache<E> {
    pub fn new(exchanger: E) -> Self {
        Self {
            exchanger,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached token, refreshing it first if it is missing or has
    /// reached its expiry instant. Provider rejections propagate; no retry
    /// happens here.
    pub async fn get_token(&self) -> Result<AccessToken, DataverseError> {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref() {
            if token.is_valid_at(Utc::now()) {
                log::debug!("Using cached access token");
                return Ok(token.clone());
            }
        }

        // Slot lock is held through the exchange: single-flight refresh.
        let fresh = self.exchanger.exchange().await?;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingExchanger {
        calls: AtomicU32,
        in_flight: AtomicU32,
        max_in_flight: AtomicU32,
        ttl_seconds: i64,
        delay_ms: u64,
    }

    impl CountingExchanger {
        fn new(ttl_seconds: i64) -> Self {
            Self {
                calls: AtomicU32::new(0),
                in_flight: AtomicU32::new(0),
                max_in_flight: AtomicU32::new(0),
                ttl_seconds,
                delay_ms: 0,
            }
        }

        fn slow(ttl_seconds: i64, delay_ms: u64) -> Self {
            Self {
                delay_ms,
                ..Self::new(ttl_seconds)
            }
        }
    }

    #[async_trait]
    impl TokenExchanger for CountingExchanger {
        async fn exchange(&self) -> Result<AccessToken, DataverseError> {
            let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(active, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(AccessToken {
                token: format!("token-{n}"),
                expires_at: Utc::now() + Duration::seconds(self.ttl_seconds),
            })
        }
    }

    #[tokio::test]
    async fn second_call_within_validity_is_a_cache_hit() {
        let cache = TokenCache::new(CountingExchanger::new(3600));
        let first = cache.get_token().await.unwrap();
        let second = cache.get_token().await.unwrap();
        assert_eq!(first.token, second.token);
        assert_eq!(cache.exchanger.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_triggers_exactly_one_fresh_exchange() {
        let cache = TokenCache::new(CountingExchanger::new(-1));
        let first = cache.get_token().await.unwrap();
        let second = cache.get_token().await.unwrap();
        // Already expired when issued, so each call exchanges anew.
        assert_ne!(first.token, second.token);
        assert_eq!(cache.exchanger.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn token_at_expiry_instant_is_not_served() {
        let token = AccessToken {
            token: "t".into(),
            expires_at: Utc::now(),
        };
        assert!(!token.is_valid_at(token.expires_at));
        assert!(token.is_valid_at(token.expires_at - Duration::seconds(1)));
    }

    #[tokio::test]
    async fn concurrent_callers_share_a_single_refresh() {
        let cache = Arc::new(TokenCache::new(CountingExchanger::slow(3600, 50)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_token().await.unwrap().token })
            })
            .collect();

        let mut tokens = Vec::new();
        for task in tasks {
            tokens.push(task.await.unwrap());
        }

        assert_eq!(cache.exchanger.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.exchanger.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(tokens.iter().all(|t| t == "token-1"));
    }

    #[tokio::test]
    async fn provider_rejection_is_not_retried() {
        struct Rejecting {
            calls: AtomicU32,
        }

        #[async_trait]
        impl TokenExchanger for Rejecting {
            async fn exchange(&self) -> Result<AccessToken, DataverseError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(DataverseError::AuthenticationFailed {
                    message: "AADSTS7000215: invalid client secret".into(),
                })
            }
        }

        let cache = TokenCache::new(Rejecting {
            calls: AtomicU32::new(0),
        });
        let err = cache.get_token().await.unwrap_err();
        assert!(matches!(err, DataverseError::AuthenticationFailed { .. }));
        assert_eq!(cache.exchanger.calls.load(Ordering::SeqCst), 1);
    }
}
