use crate::auth::{AuthError, AuthResult};

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
pub const DEFAULT_HASH_ROUNDS: u32 = 10;
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;

/// Authentication configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub hash_rounds: u32,
    pub hash_memory_kib: u32,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AuthError::Config("JWT_SECRET is required".into()))?;
        let token_ttl_secs = std::env::var("JWT_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let hash_rounds = std::env::var("PASSWORD_HASH_ROUNDS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_HASH_ROUNDS);
        let hash_memory_kib = std::env::var("PASSWORD_HASH_MEMORY_KIB")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_HASH_MEMORY_KIB);

        Ok(Self {
            jwt_secret,
            token_ttl_secs,
            hash_rounds,
            hash_memory_kib,
        })
    }

    /// Settings for tests: known secret, cheap hashing.
    pub fn for_tests(secret: &str) -> Self {
        Self {
            jwt_secret: secret.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            hash_rounds: 1,
            hash_memory_kib: 1024,
        }
    }
}
