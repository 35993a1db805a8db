use movie_api::routes::health::{HealthResponse, health_check};
use movie_api::test_support::TestRocketBuilder;
use rocket::http::Status;
use rocket::routes;

#[test]
fn health_endpoint_returns_ok() {
    let client = TestRocketBuilder::new()
        .mount_api_routes(routes![health_check])
        .blocking_client();

    let response = client.get("/health").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let payload: HealthResponse = response.into_json().expect("valid JSON payload");
    assert_eq!(payload.status, "ok");
}

#[test]
fn unknown_route_uses_error_envelope() {
    let client = TestRocketBuilder::new()
        .mount_api_routes(routes![health_check])
        .blocking_client();

    let response = client.get("/nowhere").dispatch();
    assert_eq!(response.status(), Status::NotFound);

    let body: serde_json::Value = response.into_json().expect("valid JSON payload");
    assert_eq!(body["statusCode"], 404);
    assert_eq!(body["message"], "Cannot GET /nowhere");
    assert!(body["timestamp"].is_string());
}
