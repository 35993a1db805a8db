use rocket::serde::json::Json;
use rocket::{State, get, patch};

use crate::auth::{AuthUser, RequireAdmin};
use crate::error::ApiResult;
use crate::models::User;
use crate::routes::helpers::parse_id;
use crate::users::{UpdateProfileRequest, UpdateRoleRequest, UserService};

#[get("/users/profile")]
pub async fn get_profile(user: AuthUser, service: &State<UserService>) -> ApiResult<Json<User>> {
    Ok(Json(service.profile(user.id).await?))
}

#[patch("/users/profile", data = "<payload>")]
pub async fn update_profile(
    user: AuthUser,
    service: &State<UserService>,
    payload: Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(
        service
            .update_profile(user.id, payload.into_inner())
            .await?,
    ))
}

#[patch("/users/<id>/role", data = "<payload>")]
pub async fn update_role(
    _admin: RequireAdmin,
    id: &str,
    service: &State<UserService>,
    payload: Json<UpdateRoleRequest>,
) -> ApiResult<Json<User>> {
    let id = parse_id(id)?;
    Ok(Json(service.update_role(id, payload.role).await?))
}
