//! Bearer-token issuance and validation.
//!
//! Access tokens are HS256-signed JWTs. The confirmation-code exchange in the
//! account service is the only place that mints them; the API middleware
//! validates them and resolves the subject against the database.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::entities::users;

/// Claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: i32,
    /// The user's role name at issuance time.
    pub role: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    expiry_mins: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expiry_mins: config.token_expiry_mins,
        }
    }

    pub fn issue(&self, user: &users::Model) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            role: user.role.clone(),
            exp: now + self.expiry_mins * 60,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(), // HS256
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    /// Validates signature and expiry, returning the embedded [`Claims`].
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}
