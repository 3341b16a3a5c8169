//! JWT access / refresh tokens.
//!
//! Both kinds are HS256 JWTs signed with `JWT_SECRET`; the `typ` claim keeps
//! a refresh token from being replayed as a bearer credential and vice versa.
//! Refresh tokens are additionally tracked server-side (see `db::token_repo`)
//! so they can be rotated and revoked.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{config::Settings, error::ApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    /// Unique per token, so two refreshes within one second never collide.
    pub jti: Uuid,
    pub typ: TokenType,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
}

/// A freshly minted refresh token and what the server stores about it.
#[derive(Debug)]
pub struct IssuedRefresh {
    pub token: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        TokenKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        TokenKeys::new(
            &settings.jwt_secret,
            Duration::minutes(settings.access_token_expire_minutes),
            Duration::days(settings.refresh_token_expire_days),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    fn sign(&self, user_id: Uuid, typ: TokenType, ttl: Duration) -> Result<(String, DateTime<Utc>), ApiError> {
        let now = Utc::now();
        let exp = now + ttl;
        let claims = Claims {
            sub: user_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            typ,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("JWT encode failed: {e}")))?;
        Ok((token, exp))
    }

    pub fn issue_access(&self, user_id: Uuid) -> Result<String, ApiError> {
        self.sign(user_id, TokenType::Access, self.access_ttl)
            .map(|(token, _)| token)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<IssuedRefresh, ApiError> {
        let (token, expires_at) = self.sign(user_id, TokenType::Refresh, self.refresh_ttl)?;
        Ok(IssuedRefresh {
            token_hash: fingerprint(&token),
            token,
            expires_at,
        })
    }

    /// Signature, expiry and token-kind check.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| ApiError::unauthorized("Could not validate credentials"))?;
        if data.claims.typ != expected {
            return Err(ApiError::unauthorized("Could not validate credentials"));
        }
        Ok(data.claims)
    }
}

/// What `refresh_tokens.token_hash` stores: hex SHA-256 of the raw token.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
