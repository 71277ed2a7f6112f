//! Bearer token verification
//!
//! Tokens are HMAC-signed claims, so no server-side session storage is
//! needed. Token format: base64(claims).base64(hmac_sha256(base64(claims))).

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Verified caller identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: String,
}

/// Maps a bearer token to the caller's user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Unauthorized` for any malformed, forged or expired token
    async fn verify(&self, token: &str) -> Result<Subject, AppError>;
}

/// Signed token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

impl Claims {
    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }
}

/// Identity provider backed by HMAC-SHA256 signed tokens
pub struct HmacIdentityProvider {
    secret: String,
    max_age: Duration,
}

impl HmacIdentityProvider {
    pub fn new(secret: impl Into<String>, max_age_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            max_age: Duration::seconds(max_age_seconds),
        }
    }

    fn mac(&self) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::Encryption(e.to_string()))
    }

    /// Create a signed token for `user_id`
    pub fn issue_token(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.max_age).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        let payload = serde_json::to_string(claims)?;
        let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

        let mut mac = self.mac()?;
        mac.update(payload_b64.as_bytes());
        let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", payload_b64, signature_b64))
    }

    /// Verify the signature and decode the claims
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(AppError::Unauthorized)?;

        let signature = general_purpose::URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AppError::Unauthorized)?;
        let mut mac = self.mac()?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AppError::Unauthorized)?;

        let payload = general_purpose::URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AppError::Unauthorized)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| AppError::Unauthorized)?;

        if claims.is_expired() || claims.sub.is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(claims)
    }
}

#[async_trait]
impl IdentityProvider for HmacIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Subject, AppError> {
        let claims = self.decode(token)?;
        Ok(Subject {
            user_id: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> HmacIdentityProvider {
        HmacIdentityProvider::new("s".repeat(32), 3600)
    }

    #[tokio::test]
    async fn issued_token_verifies() {
        let provider = provider();
        let token = provider.issue_token("alice").unwrap();
        let subject = provider.verify(&token).await.unwrap();
        assert_eq!(subject.user_id, "alice");
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let provider = provider();
        let token = provider.issue_token("alice").unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = Claims {
            sub: "mallory".to_string(),
            iat: 0,
            exp: i64::MAX,
        };
        let forged_payload = general_purpose::URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(
            provider.verify(&forged).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            provider.verify("not-a-token").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn other_secret_is_rejected() {
        let token = provider().issue_token("alice").unwrap();
        let other = HmacIdentityProvider::new("t".repeat(32), 3600);
        assert!(other.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let provider = provider();
        let token = provider
            .sign(&Claims {
                sub: "alice".to_string(),
                iat: 0,
                exp: Utc::now().timestamp() - 10,
            })
            .unwrap();
        assert!(matches!(
            provider.verify(&token).await,
            Err(AppError::Unauthorized)
        ));
    }
}
