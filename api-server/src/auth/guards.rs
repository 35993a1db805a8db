use std::marker::PhantomData;
use std::ops::Deref;

use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};

use crate::auth::responses::Role;
use crate::auth::{AuthError, AuthResult, AuthState};
use crate::error::GuardRejection;

/// Identity resolved from a verified bearer token. Any role is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub role: Role,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match extract_user(request).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => reject(request, err),
        }
    }
}

/// Roles a route accepts. An empty set admits any authenticated identity.
pub trait RolePolicy: Send + Sync + 'static {
    const ALLOWED: &'static [Role];
}

#[derive(Debug)]
pub struct AnyRole;

#[derive(Debug)]
pub struct AdminOnly;

#[derive(Debug)]
pub struct UserOnly;

impl RolePolicy for AnyRole {
    const ALLOWED: &'static [Role] = &[];
}

impl RolePolicy for AdminOnly {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

impl RolePolicy for UserOnly {
    const ALLOWED: &'static [Role] = &[Role::User];
}

/// An authenticated caller whose token role is in `P::ALLOWED`.
pub struct Authorized<P: RolePolicy> {
    pub user: AuthUser,
    policy: PhantomData<fn() -> P>,
}

pub type Authenticated = Authorized<AnyRole>;
pub type RequireAdmin = Authorized<AdminOnly>;
pub type RequireUser = Authorized<UserOnly>;

impl<P: RolePolicy> Authorized<P> {
    pub fn into_inner(self) -> AuthUser {
        self.user
    }
}

impl<P: RolePolicy> Deref for Authorized<P> {
    type Target = AuthUser;

    fn deref(&self) -> &AuthUser {
        &self.user
    }
}

impl<P: RolePolicy> std::fmt::Debug for Authorized<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorized")
            .field("user", &self.user)
            .field("allowed", &P::ALLOWED)
            .finish()
    }
}

#[rocket::async_trait]
impl<'r, P: RolePolicy> FromRequest<'r> for Authorized<P> {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthUser::from_request(request).await {
            Outcome::Success(user) => match authorize(&user, P::ALLOWED) {
                Ok(()) => Outcome::Success(Authorized {
                    user,
                    policy: PhantomData,
                }),
                Err(err) => reject(request, err),
            },
            Outcome::Error(err) => Outcome::Error(err),
            Outcome::Forward(_) => reject(request, AuthError::Unauthorized),
        }
    }
}

/// Role check against the role carried in the token, not the stored one.
pub fn authorize(user: &AuthUser, allowed: &[Role]) -> AuthResult<()> {
    if allowed.is_empty() || allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

fn reject<T>(request: &Request<'_>, err: AuthError) -> Outcome<T, AuthError> {
    let status = err.status();
    if status == Status::InternalServerError {
        log::error!("authentication failed: {}", err);
    } else {
        log::debug!("rejected {} {}: {}", request.method(), request.uri(), err);
        GuardRejection::record(request, err.to_string());
    }
    Outcome::Error((status, err))
}

async fn extract_user(request: &Request<'_>) -> AuthResult<AuthUser> {
    let token = bearer_token_from_request(request)?;

    let auth_state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    let claims = auth_state.jwt_service.decode_access_token(token)?;

    if auth_state.users.find_by_id(claims.id).await?.is_none() {
        return Err(AuthError::TokenSubjectMissing);
    }

    Ok(AuthUser {
        id: claims.id,
        email: claims.email,
        role: claims.role,
    })
}

fn bearer_token_from_request<'a>(request: &'a Request<'_>) -> AuthResult<&'a str> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::Unauthorized)?;
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Ok(token)
    } else {
        Err(AuthError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            id: 1,
            email: "jane@x.com".into(),
            role,
        }
    }

    #[test]
    fn empty_policy_admits_any_role() {
        assert!(authorize(&caller(Role::User), AnyRole::ALLOWED).is_ok());
        assert!(authorize(&caller(Role::Admin), AnyRole::ALLOWED).is_ok());
    }

    #[test]
    fn admin_only_rejects_users() {
        assert!(authorize(&caller(Role::Admin), AdminOnly::ALLOWED).is_ok());
        assert!(matches!(
            authorize(&caller(Role::User), AdminOnly::ALLOWED),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn user_only_rejects_admins() {
        assert!(authorize(&caller(Role::User), UserOnly::ALLOWED).is_ok());
        assert!(authorize(&caller(Role::Admin), UserOnly::ALLOWED).is_err());
    }
}
