//! Authentication module: configuration, credential handling, token minting,
//! Rocket request guards, and HTTP route handlers.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod passwords;
pub mod responses;
pub mod routes;
pub mod service;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::{AuthUser, Authenticated, Authorized, RequireAdmin, RequireUser};
pub use jwt::JwtService;
pub use passwords::PasswordService;
pub use service::AuthService;

use crate::store::UserRepository;

/// Shared state the request guards read: token verification plus the user
/// lookup that confirms a token's subject still exists.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_service: Arc<JwtService>,
    pub users: Arc<dyn UserRepository>,
}

impl AuthState {
    pub fn new(jwt_service: Arc<JwtService>, users: Arc<dyn UserRepository>) -> Self {
        Self { jwt_service, users }
    }
}
