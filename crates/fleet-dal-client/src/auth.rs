use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::DalError;

/// How the client authenticates against the DAL.
///
/// Kept as a sum type rather than an "is this real or anonymous" flag
/// on the client itself, so a caller can never construct a client that
/// is half-configured for auth. Token *validation* stays out of scope
/// (the DAL enforces that side); this is only the calling side's
/// client-credentials acquisition and attachment.
#[derive(Clone)]
pub enum Credential {
    Anonymous,
    UserPassword {
        token_url: String,
        client_id: String,
        client_secret: String,
    },
}

impl Credential {
    pub fn from_env() -> Self {
        match (
            std::env::var("FLEET_SA_TOKEN_URL"),
            std::env::var("FLEET_SA_CLIENT_ID"),
            std::env::var("FLEET_SA_CLIENT_SECRET"),
        ) {
            (Ok(token_url), Ok(client_id), Ok(client_secret)) => Credential::UserPassword {
                token_url,
                client_id,
                client_secret,
            },
            _ => Credential::Anonymous,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    exp: Option<u64>,
}

/// A decoded access token, cached until shortly before it expires.
/// Decoding here never verifies the signature — the DAL is the one
/// that enforces authorization; this side only reads the expiry so it
/// knows when to re-acquire.
pub struct AccessToken {
    pub raw: String,
    expires_at: u64,
}

/// Seconds of slack subtracted from a token's reported expiry, so a
/// request in flight doesn't race a token that expires mid-call.
const EXPIRY_SLACK_SECS: u64 = 30;

impl AccessToken {
    fn from_response(response: TokenResponse, acquired_at: u64) -> Self {
        let ttl = response.expires_in.unwrap_or(300);
        let exp_from_claims = Self::decode_exp(&response.access_token);
        let expires_at = exp_from_claims.unwrap_or(acquired_at + ttl);
        Self {
            raw: response.access_token,
            expires_at,
        }
    }

    fn decode_exp(raw: &str) -> Option<u64> {
        let mut validation = jsonwebtoken::Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        let decoding_key = jsonwebtoken::DecodingKey::from_secret(&[]);
        let claims = jsonwebtoken::decode::<TokenClaims>(raw, &decoding_key, &validation).ok()?.claims;
        claims.exp
    }

    fn is_expired(&self, now_epoch_secs: u64) -> bool {
        now_epoch_secs + EXPIRY_SLACK_SECS >= self.expires_at
    }
}

fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Caches one `AccessToken` behind a lock, re-acquiring a fresh one via
/// the client-credentials grant whenever it's missing or close to
/// expiry. Shared by every `DalClient` request on a non-anonymous
/// credential.
pub struct TokenCache {
    http: reqwest::Client,
    credential: Credential,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(http: reqwest::Client, credential: Credential) -> Self {
        Self {
            http,
            credential,
            cached: Mutex::new(None),
        }
    }

    /// Returns `None` for an anonymous credential; otherwise a valid
    /// bearer token, acquiring one if the cache is empty or stale.
    pub async fn token(&self) -> Option<Result<String, DalError>> {
        let Credential::UserPassword {
            token_url,
            client_id,
            client_secret,
        } = &self.credential
        else {
            return None;
        };

        let mut cached = self.cached.lock().await;
        let now = now_epoch_secs();
        if let Some(token) = cached.as_ref() {
            if !token.is_expired(now) {
                return Some(Ok(token.raw.clone()));
            }
        }

        match self.acquire(token_url, client_id, client_secret).await {
            Ok(token) => {
                let raw = token.raw.clone();
                *cached = Some(token);
                Some(Ok(raw))
            }
            Err(err) => {
                warn!(error = %err, "failed to acquire an access token for the dal");
                Some(Err(err))
            }
        }
    }

    async fn acquire(&self, token_url: &str, client_id: &str, client_secret: &str) -> Result<AccessToken, DalError> {
        let response = self
            .http
            .post(token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(DalError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DalError::from_status(status, body));
        }

        let body: TokenResponse = response.json().await.map_err(DalError::Request)?;
        Ok(AccessToken::from_response(body, now_epoch_secs()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anonymous_credential_never_acquires_a_token() {
        let cache = TokenCache::new(reqwest::Client::new(), Credential::Anonymous);
        assert!(cache.token().await.is_none());
    }

    #[test]
    fn token_is_expired_once_within_the_slack_window() {
        let token = AccessToken {
            raw: "abc".to_string(),
            expires_at: 1_000,
        };
        assert!(!token.is_expired(900));
        assert!(token.is_expired(971));
        assert!(token.is_expired(1_000));
    }

    #[test]
    fn response_without_expires_in_defaults_to_a_five_minute_ttl() {
        let token = AccessToken::from_response(
            TokenResponse {
                access_token: "abc".to_string(),
                expires_in: None,
            },
            1_000,
        );
        assert_eq!(token.expires_at, 1_300);
    }
}
