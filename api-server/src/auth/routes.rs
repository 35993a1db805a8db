use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, patch, post};

use crate::auth::AuthService;
use crate::auth::guards::AuthUser;
use crate::auth::responses::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
};
use crate::error::ApiResult;

#[post("/auth/signup", data = "<payload>")]
pub async fn signup(
    service: &State<AuthService>,
    payload: Json<RegisterRequest>,
) -> ApiResult<(Status, Json<RegisterResponse>)> {
    let response = service.register(payload.into_inner()).await?;
    Ok((Status::Created, Json(response)))
}

#[post("/auth/login", data = "<payload>")]
pub async fn login(
    service: &State<AuthService>,
    payload: Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let response = service.login(payload.into_inner()).await?;
    Ok(Json(response))
}

#[patch("/auth/password", data = "<payload>")]
pub async fn change_password(
    user: AuthUser,
    service: &State<AuthService>,
    payload: Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    service.change_password(user.id, payload.into_inner()).await?;
    Ok(())
}
