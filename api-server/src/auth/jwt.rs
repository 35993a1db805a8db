use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::auth::responses::Role;
use crate::auth::{AuthConfig, AuthError, AuthResult};
use crate::models::User;

/// Identity carried by a bearer token. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenClaims {
    pub id: i32,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 signer and verifier sharing one symmetric secret.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let secret_bytes = secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation,
            access_token_ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_secs)
    }

    pub fn issue_access_token(&self, user: &User) -> AuthResult<SignedAccessToken> {
        let now = Utc::now();
        let expires_at = now + self.access_token_ttl;

        let claims = AccessTokenClaims {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(SignedAccessToken { token, expires_at })
    }

    /// Verify signature and expiry. Every rejection is either `TokenExpired` or `TokenInvalid`.
    pub fn decode_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }
}
