//! HS256 bearer tokens.
//!
//! Tokens are stateless: a token is valid while its signature checks out and
//! `exp` has not passed. There is no revocation list.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct JwtConfig {
    issuer: String,
    secret: SecretString,
    ttl_hours: u32,
}

impl JwtConfig {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            issuer: env!("CARGO_PKG_NAME").to_string(),
            secret,
            ttl_hours: 24,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    #[must_use]
    pub fn with_ttl_hours(mut self, ttl_hours: u32) -> Self {
        self.ttl_hours = ttl_hours;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn ttl_hours(&self) -> u32 {
        self.ttl_hours
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtIssuer {
    issuer: String,
    ttl: Duration,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtIssuer {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        // Only the HMAC family is accepted; anything else (including `none`)
        // fails before the signature is looked at.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;

        Self {
            issuer: config.issuer.clone(),
            ttl: Duration::hours(i64::from(config.ttl_hours)),
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// # Errors
    /// `Internal` if signing fails.
    pub fn issue(&self, account_id: Uuid) -> Result<String> {
        self.issue_at(account_id, Utc::now())
    }

    pub(crate) fn issue_at(&self, account_id: Uuid, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: account_id,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|err| {
            error!("Failed to sign token: {err}");
            Error::internal("Failed to generate token")
        })
    }

    /// # Errors
    /// `Unauthorized` for a bad signature, unexpected algorithm, malformed
    /// token or passed expiry.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                debug!("Rejected bearer token: {err}");
                Error::unauthorized("Invalid or expired JWT")
            })
    }
}
