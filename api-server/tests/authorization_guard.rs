use movie_api::api_routes;
use movie_api::auth::JwtService;
use movie_api::auth::responses::Role;
use movie_api::models::{NewUser, User};
use movie_api::store::Repositories;
use movie_api::test_support::{TestRocketBuilder, bearer_for};
use rocket::http::{Header, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use serde_json::Value;

async fn seed(repositories: &Repositories, email: &str, role: Role) -> User {
    repositories
        .users
        .create(NewUser {
            full_name: "Guard Test".into(),
            email: email.into(),
            role,
        })
        .await
        .expect("seed user")
}

async fn setup() -> (Client, Repositories, User, User) {
    let builder = TestRocketBuilder::new().mount_api_routes(api_routes());
    let repositories = builder.repositories();
    let user = seed(&repositories, "user@x.com", Role::User).await;
    let admin = seed(&repositories, "admin@x.com", Role::Admin).await;
    (builder.async_client().await, repositories, user, admin)
}

async fn error_body(response: LocalResponse<'_>) -> Value {
    response.into_json().await.expect("json error body")
}

#[rocket::async_test]
async fn missing_or_malformed_header_is_unauthorized() {
    let (client, _, _, _) = setup().await;

    let response = client.get("/users/profile").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    let body = error_body(response).await;
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["message"], "Unauthorized");

    let response = client
        .get("/users/profile")
        .header(Header::new("Authorization", "Token abc"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .get("/users/profile")
        .header(Header::new("Authorization", "Bearer not.a.jwt"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(error_body(response).await["message"], "Invalid token");
}

#[rocket::async_test]
async fn expired_token_is_unauthorized() {
    let (client, _, user, _) = setup().await;

    let response = client
        .get("/users/profile")
        .header(Header::new("Authorization", bearer_for(&user, -3600)))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(error_body(response).await["message"], "Token expired");
}

#[rocket::async_test]
async fn token_signed_with_another_secret_is_rejected() {
    let (client, _, user, _) = setup().await;
    let forged = JwtService::new("some-other-secret", 3600)
        .issue_access_token(&user)
        .expect("issue token");

    let response = client
        .get("/users/profile")
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", forged.token),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn wrong_role_is_forbidden() {
    let (client, _, user, admin) = setup().await;

    let response = client
        .delete("/movies/1")
        .header(Header::new("Authorization", bearer_for(&user, 3600)))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    let body = error_body(response).await;
    assert_eq!(body["statusCode"], 403);
    assert_eq!(
        body["message"],
        "Forbidden, insufficient role for this action"
    );

    // Single-movie reads are reserved for USER accounts.
    let response = client
        .get("/movies/1")
        .header(Header::new("Authorization", bearer_for(&admin, 3600)))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
}

#[rocket::async_test]
async fn any_role_may_list_movies() {
    let (client, _, user, admin) = setup().await;

    for caller in [&user, &admin] {
        let response = client
            .get("/movies")
            .header(Header::new("Authorization", bearer_for(caller, 3600)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
    }
}

#[rocket::async_test]
async fn deleted_subject_is_not_found() {
    let (client, repositories, user, _) = setup().await;
    let token = bearer_for(&user, 3600);

    assert!(repositories.users.delete(user.id).await.expect("delete user"));

    let response = client
        .get("/users/profile")
        .header(Header::new("Authorization", token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
    assert_eq!(error_body(response).await["message"], "User not found");
}

#[rocket::async_test]
async fn role_is_read_from_the_token() {
    let (client, repositories, user, _) = setup().await;
    let stale_user_token = bearer_for(&user, 3600);

    repositories
        .users
        .update(
            user.id,
            movie_api::models::UserChanges {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .expect("promote user");

    let response = client
        .delete("/movies/1")
        .header(Header::new("Authorization", stale_user_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
}
