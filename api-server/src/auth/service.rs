//! Registration, login and password change over the user and credential stores.

use std::sync::Arc;

use crate::auth::responses::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, Role,
};
use crate::auth::{AuthError, AuthResult, JwtService, PasswordService};
use crate::logging::LogContext;
use crate::models::NewUser;
use crate::store::{CredentialRepository, Repositories, UserRepository};
use crate::validation::{self, ValidationError};

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialRepository>,
    passwords: Arc<PasswordService>,
    tokens: Arc<JwtService>,
    log: LogContext,
}

impl AuthService {
    pub fn new(
        repositories: &Repositories,
        passwords: Arc<PasswordService>,
        tokens: Arc<JwtService>,
        log: LogContext,
    ) -> Self {
        Self {
            users: repositories.users.clone(),
            credentials: repositories.credentials.clone(),
            passwords,
            tokens,
            log,
        }
    }

    /// Create a USER account and its credential.
    ///
    /// The two inserts are not wrapped in a transaction: if the credential
    /// insert fails the user row stays behind and can never log in.
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<RegisterResponse> {
        validation::require_non_empty("fullName", &request.full_name)?;
        let email = validation::normalize_email(&request.email)?;
        validation::check_password(&request.password)?;

        self.log.info(format_args!("registering user {email}"));
        let password_hash = self.passwords.hash_password(&request.password)?;

        let user = self
            .users
            .create(NewUser {
                full_name: request.full_name.trim().to_string(),
                email,
                role: Role::User,
            })
            .await
            .inspect_err(|err| self.log.error(format_args!("user insert failed: {err}")))?;

        self.credentials
            .create(user.id, &password_hash)
            .await
            .inspect_err(|err| {
                self.log.error(format_args!(
                    "credential insert failed for user {}: {err}",
                    user.id
                ))
            })?;

        self.log
            .info(format_args!("user {} registered as {}", user.id, user.email));
        Ok(RegisterResponse {
            message: "User registered successfully".to_string(),
            user,
        })
    }

    /// Unknown email and wrong password are reported differently.
    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginResponse> {
        let email = validation::normalize_email(&request.email)?;
        validation::require_non_empty("password", &request.password)?;

        self.log.info(format_args!("login attempt for {email}"));
        let Some(user) = self.users.find_by_email(&email).await? else {
            self.log.warn(format_args!("login for unknown email {email}"));
            return Err(AuthError::EmailNotFound);
        };

        let verified = match self.credentials.find_by_user_id(user.id).await? {
            Some(credential) => self
                .passwords
                .verify_password(&request.password, &credential.password_hash)?,
            None => false,
        };
        if !verified {
            self.log.warn(format_args!("invalid credentials for {email}"));
            return Err(AuthError::InvalidCredentials);
        }

        let signed = self.tokens.issue_access_token(&user)?;
        self.log.info(format_args!(
            "user {} authenticated as {}",
            user.id,
            user.role.as_str()
        ));
        Ok(LoginResponse {
            access_token: signed.token,
        })
    }

    /// Replace the stored hash after checking the current password.
    /// Tokens issued before the change remain valid until they expire.
    pub async fn change_password(
        &self,
        user_id: i32,
        request: ChangePasswordRequest,
    ) -> AuthResult<()> {
        if request.is_empty() {
            return Err(ValidationError::empty_body().into());
        }
        if user_id <= 0 {
            return Err(ValidationError::new("Invalid ID").into());
        }
        let old_password = request
            .old_password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ValidationError::new("oldPassword is required"))?;
        let new_password = request.new_password.unwrap_or_default();
        validation::check_password(&new_password)?;

        self.log
            .info(format_args!("password change requested for user {user_id}"));
        let Some(credential) = self.credentials.find_by_user_id(user_id).await? else {
            self.log
                .warn(format_args!("no credential for user {user_id}"));
            return Err(AuthError::UserNotFound(user_id));
        };

        if !self
            .passwords
            .verify_password(&old_password, &credential.password_hash)?
        {
            self.log.warn(format_args!(
                "password change rejected for user {user_id}: invalid credentials"
            ));
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = self.passwords.hash_password(&new_password)?;
        if !self
            .credentials
            .update_hash(credential.id, &new_hash)
            .await?
        {
            return Err(AuthError::UserNotFound(user_id));
        }

        self.log
            .info(format_args!("password updated for user {user_id}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::store::MemoryStore;

    const SECRET: &str = "auth-service-test-secret";

    fn service() -> (AuthService, Repositories, Arc<JwtService>) {
        let config = AuthConfig::for_tests(SECRET);
        let repositories = Repositories::memory(MemoryStore::new());
        let passwords = Arc::new(PasswordService::from_config(&config).expect("password service"));
        let tokens = Arc::new(JwtService::from_config(&config));
        let service = AuthService::new(
            &repositories,
            passwords,
            tokens.clone(),
            LogContext::new("auth_service"),
        );
        (service, repositories, tokens)
    }

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: "Jane".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    fn change_request(old: &str, new: &str) -> ChangePasswordRequest {
        ChangePasswordRequest {
            old_password: Some(old.into()),
            new_password: Some(new.into()),
        }
    }

    #[tokio::test]
    async fn register_then_login_yields_matching_claims() {
        let (service, repositories, tokens) = service();

        let registered = service
            .register(register_request("jane@x.com", "secret1"))
            .await
            .expect("register");
        assert_eq!(registered.message, "User registered successfully");
        assert_eq!(registered.user.role, Role::User);

        let credential = repositories
            .credentials
            .find_by_user_id(registered.user.id)
            .await
            .unwrap()
            .expect("credential stored");
        assert_ne!(credential.password_hash, "secret1");

        let login = service
            .login(login_request("jane@x.com", "secret1"))
            .await
            .expect("login");
        let claims = tokens.decode_access_token(&login.access_token).unwrap();
        assert_eq!(claims.id, registered.user.id);
        assert_eq!(claims.email, "jane@x.com");
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn register_rejects_short_passwords_and_bad_emails() {
        let (service, _, _) = service();

        let err = service
            .register(register_request("jane@x.com", "12345"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters long");

        let err = service
            .register(register_request("jane-at-x", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_registration_is_an_internal_failure() {
        let (service, _, _) = service();
        service
            .register(register_request("jane@x.com", "secret1"))
            .await
            .unwrap();

        let err = service
            .register(register_request("JANE@x.com", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_email_from_wrong_password() {
        let (service, _, _) = service();
        service
            .register(register_request("jane@x.com", "secret1"))
            .await
            .unwrap();

        let err = service
            .login(login_request("nobody@x.com", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailNotFound));

        let err = service
            .login(login_request("jane@x.com", "wrong-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn user_without_credential_cannot_log_in() {
        let (service, repositories, _) = service();
        repositories
            .users
            .create(NewUser {
                full_name: "Orphan".into(),
                email: "orphan@x.com".into(),
                role: Role::User,
            })
            .await
            .unwrap();

        let err = service
            .login(login_request("orphan@x.com", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn change_password_swaps_which_password_authenticates() {
        let (service, _, _) = service();
        let user = service
            .register(register_request("jane@x.com", "secret1"))
            .await
            .unwrap()
            .user;

        service
            .change_password(user.id, change_request("secret1", "secret2"))
            .await
            .expect("change password");

        assert!(matches!(
            service.login(login_request("jane@x.com", "secret1")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(service.login(login_request("jane@x.com", "secret2")).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_old_password_leaves_hash_untouched() {
        let (service, repositories, _) = service();
        let user = service
            .register(register_request("jane@x.com", "secret1"))
            .await
            .unwrap()
            .user;
        let before = repositories
            .credentials
            .find_by_user_id(user.id)
            .await
            .unwrap()
            .unwrap();

        let err = service
            .change_password(user.id, change_request("not-it", "secret2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let after = repositories
            .credentials
            .find_by_user_id(user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.password_hash, after.password_hash);
    }

    #[tokio::test]
    async fn empty_change_request_fails_before_touching_the_store() {
        let (service, _, _) = service();
        // No user 7 exists, so reaching the store would yield UserNotFound.
        let err = service
            .change_password(7, ChangePasswordRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Body cannot be empty");
    }

    #[tokio::test]
    async fn change_password_for_missing_user_is_not_found() {
        let (service, _, _) = service();
        let err = service
            .change_password(7, change_request("secret1", "secret2"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User with ID 7 not found");
    }
}
