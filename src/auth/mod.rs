use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::services::session::SessionGrant;

/// Claims the credential service embeds in issued tokens. `authorities` is the
/// caller's effective authority-name set at login time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "roleIds", default)]
    pub role_ids: Vec<i64>,
    #[serde(default)]
    pub authorities: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        sub: Uuid,
        email: String,
        user_id: i64,
        role_ids: Vec<i64>,
        authorities: Vec<String>,
        security: &SecurityConfig,
    ) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(security.jwt_expiry_hours as i64)).timestamp();

        Self {
            sub,
            email,
            user_id,
            role_ids,
            authorities,
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn for_grant(grant: &SessionGrant, security: &SecurityConfig) -> Self {
        Self::new(
            grant.uuid,
            grant.email.clone(),
            grant.user_id,
            grant.role_ids.clone(),
            grant.authorities.clone(),
            security,
        )
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    let secret = &security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    let secret = &security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}
