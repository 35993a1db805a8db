//! User directory operations behind the `/users` routes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::responses::Role;
use crate::error::{ApiError, ApiResult};
use crate::logging::LogContext;
use crate::models::{User, UserChanges};
use crate::store::UserRepository;
use crate::validation::{self, ValidationError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    log: LogContext,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, log: LogContext) -> Self {
        Self { users, log }
    }

    pub async fn profile(&self, id: i32) -> ApiResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn update_profile(&self, id: i32, request: UpdateProfileRequest) -> ApiResult<User> {
        let full_name = match request.full_name {
            Some(name) => {
                validation::require_non_empty("fullName", &name)?;
                Some(name.trim().to_string())
            }
            None => None,
        };
        let email = request
            .email
            .as_deref()
            .map(validation::normalize_email)
            .transpose()?;

        let changes = UserChanges {
            full_name,
            email,
            role: None,
        };
        if changes.is_empty() {
            return Err(ValidationError::empty_body().into());
        }
        self.apply(id, changes).await
    }

    pub async fn update_role(&self, id: i32, role: Role) -> ApiResult<User> {
        let user = self
            .apply(
                id,
                UserChanges {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await?;
        self.log
            .info(format_args!("user {} is now {}", user.id, role.as_str()));
        Ok(user)
    }

    async fn apply(&self, id: i32, changes: UserChanges) -> ApiResult<User> {
        match self.users.update(id, changes).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                self.log.warn(format_args!("update for missing user {id}"));
                Err(not_found(id))
            }
            Err(err) => {
                self.log
                    .error(format_args!("updating user {id} failed: {err}"));
                Err(err.into())
            }
        }
    }
}

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("User with ID {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::MemoryStore;

    async fn service_with_jane() -> (UserService, User) {
        let store = Arc::new(MemoryStore::new());
        let jane = UserRepository::create(
            &*store,
            NewUser {
                full_name: "Jane".into(),
                email: "jane@x.com".into(),
                role: Role::User,
            },
        )
        .await
        .unwrap();
        (UserService::new(store, LogContext::new("user_service")), jane)
    }

    #[tokio::test]
    async fn empty_profile_update_is_rejected() {
        let (service, jane) = service_with_jane().await;
        match service
            .update_profile(jane.id, UpdateProfileRequest::default())
            .await
        {
            Err(ApiError::Validation(msg)) => assert_eq!(msg, "Body cannot be empty"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn profile_update_normalizes_email() {
        let (service, jane) = service_with_jane().await;
        let updated = service
            .update_profile(
                jane.id,
                UpdateProfileRequest {
                    full_name: None,
                    email: Some(" Jane.Doe@X.com ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "jane.doe@x.com");
        assert_eq!(updated.full_name, "Jane");
    }

    #[tokio::test]
    async fn role_update_for_missing_user_is_not_found() {
        let (service, _) = service_with_jane().await;
        match service.update_role(99, Role::Admin).await {
            Err(ApiError::NotFound(msg)) => assert_eq!(msg, "User with ID 99 not found"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn role_update_promotes_user() {
        let (service, jane) = service_with_jane().await;
        let promoted = service.update_role(jane.id, Role::Admin).await.unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert_eq!(service.profile(jane.id).await.unwrap().role, Role::Admin);
    }

    #[test]
    fn profile_request_rejects_unknown_fields() {
        let result = serde_json::from_str::<UpdateProfileRequest>(r#"{"role":1}"#);
        assert!(result.is_err());
    }
}
