use chrono::{SecondsFormat, Utc};
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::{Catcher, Request, Response};
use serde::Serialize;
use std::io::Cursor;

use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failure an HTTP handler can surface. Internal details never reach the client.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    /// Message shown to the client.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg) => msg,
            ApiError::Internal(_) => "Internal server error",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status_code: status.code,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        match &self {
            ApiError::Internal(detail) => log::error!("internal error: {}", detail),
            other => log::debug!("{} {}", status.code, other.message()),
        }

        let body = ErrorResponse::new(status, self.message());
        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"statusCode":500,"message":"Internal server error"}"#.to_string()
        });

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Message a request guard left behind when it rejected the request.
#[derive(Debug, Default)]
pub struct GuardRejection(pub Option<String>);

impl GuardRejection {
    pub fn record(request: &Request<'_>, message: impl Into<String>) {
        let message = message.into();
        request.local_cache(|| GuardRejection(Some(message)));
    }

    fn message<'a>(request: &'a Request<'_>) -> Option<&'a str> {
        request
            .local_cache(GuardRejection::default)
            .0
            .as_deref()
    }
}

#[catch(400)]
fn bad_request(request: &Request<'_>) -> ApiError {
    ApiError::Validation(
        GuardRejection::message(request)
            .unwrap_or("Invalid request")
            .to_string(),
    )
}

#[catch(401)]
fn unauthorized(request: &Request<'_>) -> ApiError {
    ApiError::Unauthorized(
        GuardRejection::message(request)
            .unwrap_or("Unauthorized")
            .to_string(),
    )
}

#[catch(403)]
fn forbidden(request: &Request<'_>) -> ApiError {
    ApiError::Forbidden(
        GuardRejection::message(request)
            .unwrap_or("Forbidden, insufficient role for this action")
            .to_string(),
    )
}

#[catch(404)]
fn not_found(request: &Request<'_>) -> ApiError {
    match GuardRejection::message(request) {
        Some(message) => ApiError::NotFound(message.to_string()),
        None => ApiError::NotFound(format!("Cannot {} {}", request.method(), request.uri().path())),
    }
}

/// Body deserialization failures (missing or unknown fields) are client errors.
#[catch(422)]
fn unprocessable() -> ApiError {
    ApiError::Validation("Invalid request body".into())
}

#[catch(500)]
fn internal(request: &Request<'_>) -> ApiError {
    ApiError::Internal(format!("unhandled failure on {} {}", request.method(), request.uri()))
}

#[catch(default)]
fn fallback(status: Status, request: &Request<'_>) -> (Status, rocket::serde::json::Json<ErrorResponse>) {
    let message = GuardRejection::message(request)
        .map(str::to_string)
        .unwrap_or_else(|| status.reason_lossy().to_string());
    (status, rocket::serde::json::Json(ErrorResponse::new(status, message)))
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal,
        fallback
    ]
}
