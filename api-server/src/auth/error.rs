use rocket::http::Status;
use thiserror::Error;

use crate::error::ApiError;
use crate::store::StoreError;
use crate::validation::ValidationError;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email not found")]
    EmailNotFound,
    #[error("User with ID {0} not found")]
    UserNotFound(i32),
    #[error("User not found")]
    TokenSubjectMissing,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token")]
    TokenInvalid,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden, insufficient role for this action")]
    Forbidden,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("argon2 parameter error: {0}")]
    Argon2(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::Unauthorized => Status::Unauthorized,
            AuthError::Forbidden => Status::Forbidden,
            AuthError::EmailNotFound
            | AuthError::UserNotFound(_)
            | AuthError::TokenSubjectMissing => Status::NotFound,
            AuthError::Validation(_) => Status::BadRequest,
            AuthError::Config(_)
            | AuthError::Store(_)
            | AuthError::Jwt(_)
            | AuthError::Argon2(_)
            | AuthError::PasswordHash(_) => Status::InternalServerError,
        }
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::Argon2(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::Validation(_) => ApiError::Validation(message),
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::Unauthorized => ApiError::Unauthorized(message),
            AuthError::Forbidden => ApiError::Forbidden(message),
            AuthError::EmailNotFound
            | AuthError::UserNotFound(_)
            | AuthError::TokenSubjectMissing => ApiError::NotFound(message),
            AuthError::Config(_)
            | AuthError::Store(_)
            | AuthError::Jwt(_)
            | AuthError::Argon2(_)
            | AuthError::PasswordHash(_) => ApiError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_client_messages() {
        let api: ApiError = AuthError::EmailNotFound.into();
        assert_eq!(api.status(), Status::NotFound);
        assert_eq!(api.message(), "Email not found");

        let api: ApiError = AuthError::UserNotFound(5).into();
        assert_eq!(api.message(), "User with ID 5 not found");

        let api: ApiError = AuthError::InvalidCredentials.into();
        assert_eq!(api.status(), Status::Unauthorized);
        assert_eq!(api.message(), "Invalid credentials");

        let api: ApiError = AuthError::TokenSubjectMissing.into();
        assert_eq!(api.status(), Status::NotFound);
        assert_eq!(api.message(), "User not found");

        let api: ApiError = AuthError::Forbidden.into();
        assert_eq!(api.status(), Status::Forbidden);

        let api: ApiError = AuthError::from(ValidationError::new("Invalid ID")).into();
        assert_eq!(api.status(), Status::BadRequest);
        assert_eq!(api.message(), "Invalid ID");
    }

    #[test]
    fn conversion_agrees_with_status() {
        let errors = [
            AuthError::InvalidCredentials,
            AuthError::EmailNotFound,
            AuthError::UserNotFound(1),
            AuthError::TokenSubjectMissing,
            AuthError::TokenExpired,
            AuthError::TokenInvalid,
            AuthError::Unauthorized,
            AuthError::Forbidden,
            AuthError::Validation(ValidationError::new("bad")),
            AuthError::Config("missing".into()),
        ];
        for err in errors {
            let status = err.status();
            let api: ApiError = err.into();
            assert_eq!(api.status(), status);
        }
    }

    #[test]
    fn internal_failures_do_not_leak() {
        let api: ApiError = AuthError::Config("JWT_SECRET is required".into()).into();
        assert_eq!(api.status(), Status::InternalServerError);
        assert_eq!(api.message(), "Internal server error");
    }
}
