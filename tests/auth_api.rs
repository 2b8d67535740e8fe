use std::sync::Arc;

use actix_web::{test, web, App};
use account_auth_server::{
    configure_routes, AppState, InMemoryUserRepository, JwtTokenService, Role, Settings, TokenService,
    UserRepository,
};
use serde_json::{json, Value};

fn test_state() -> (AppState, Arc<InMemoryUserRepository>) {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let repo = Arc::new(InMemoryUserRepository::new());
    let state = AppState::with_repository(config, repo.clone()).expect("Failed to build state");
    (state, repo)
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(|cfg| configure_routes(cfg, &$state)),
        )
        .await
    };
}

fn sign_up_body(email: &str) -> Value {
    json!({
        "email": email,
        "password": "secret123",
        "firstName": "Test",
        "lastName": "User"
    })
}

#[actix_web::test]
async fn test_register_and_login() {
    let (state, _) = test_state();
    let app = init_app!(state);

    let register_response = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(sign_up_body("a@x.com"))
        .send_request(&app)
        .await;

    assert_eq!(register_response.status(), 201);
    let register_body: Value = test::read_body_json(register_response).await;
    assert!(register_body["accessToken"].as_str().is_some());
    assert!(register_body["refreshToken"].as_str().is_some());
    assert_eq!(register_body["user"]["email"], "a@x.com");
    assert_eq!(register_body["user"]["firstName"], "Test");
    assert!(register_body["user"].get("password").is_none());
    assert!(register_body["user"].get("tokens").is_none());

    let login_response = test::TestRequest::post()
        .uri("/sign-in")
        .set_json(json!({ "email": "a@x.com", "password": "secret123" }))
        .send_request(&app)
        .await;

    assert_eq!(login_response.status(), 200);
    let login_body: Value = test::read_body_json(login_response).await;
    assert_eq!(login_body["message"], "Login successful");
    assert!(login_body["user"].get("password").is_none());
    assert!(login_body["user"].get("tokens").is_none());
}

#[actix_web::test]
async fn test_duplicate_registration() {
    let (state, _) = test_state();
    let app = init_app!(state);

    for expected in [201, 409] {
        let response = test::TestRequest::post()
            .uri("/sign-up")
            .set_json(sign_up_body("a@x.com"))
            .send_request(&app)
            .await;
        assert_eq!(response.status(), expected);
    }
}

#[actix_web::test]
async fn test_invalid_login() {
    let (state, _) = test_state();
    let app = init_app!(state);

    test::TestRequest::post()
        .uri("/sign-up")
        .set_json(sign_up_body("a@x.com"))
        .send_request(&app)
        .await;

    let mut bodies = Vec::new();
    for (email, password) in [("a@x.com", "wrongpassword"), ("nonexistent@x.com", "secret123")] {
        let response = test::TestRequest::post()
            .uri("/sign-in")
            .set_json(json!({ "email": email, "password": password }))
            .send_request(&app)
            .await;
        assert_eq!(response.status(), 401);
        let body: Value = test::read_body_json(response).await;
        bodies.push(body);
    }

    assert_eq!(bodies[0], bodies[1]);
}

#[actix_web::test]
async fn test_invalid_registration() {
    let (state, _) = test_state();
    let app = init_app!(state);

    let response = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(json!({ "email": "a@x.com", "password": "" }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 400);
}

#[actix_web::test]
async fn test_overlong_password_registration() {
    let (state, repo) = test_state();
    let app = init_app!(state);

    let response = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(json!({ "email": "a@x.com", "password": "a".repeat(73) }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 400);
    assert_eq!(repo.len().await, 0);
}

#[actix_web::test]
async fn test_logout() {
    let (state, repo) = test_state();
    let app = init_app!(state);

    let register_response = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(sign_up_body("a@x.com"))
        .send_request(&app)
        .await;
    let register_body: Value = test::read_body_json(register_response).await;
    let token = register_body["accessToken"].as_str().unwrap().to_string();

    let logout_response = test::TestRequest::post()
        .uri("/sign-out")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(logout_response.status(), 200);
    let body: Value = test::read_body_json(logout_response).await;
    assert_eq!(body["message"], "Logout successful");

    let stored = repo.find_user_by_email("a@x.com").await.unwrap().unwrap();
    assert!(stored.tokens.is_empty());

    // The cleared token can no longer sign out
    let second = test::TestRequest::post()
        .uri("/sign-out")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(second.status(), 401);
}

#[actix_web::test]
async fn test_logout_requires_bearer() {
    let (state, _) = test_state();
    let app = init_app!(state);

    let response = test::TestRequest::post().uri("/sign-out").send_request(&app).await;
    assert_eq!(response.status(), 401);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"]["message"], "Authentication error: Authorization header required");

    let response = test::TestRequest::post()
        .uri("/sign-out")
        .insert_header(("Authorization", "Token abc"))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
}

#[actix_web::test]
async fn test_logout_with_expired_bearer() {
    let (state, repo) = test_state();
    let app = init_app!(state);

    let response = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(sign_up_body("a@x.com"))
        .send_request(&app)
        .await;
    let session: Value = test::read_body_json(response).await;
    let account_id = session["user"]["id"].as_str().unwrap().parse().unwrap();

    // Same signing secret as the test config, but already past its expiry
    let expired = JwtTokenService::with_lifetimes(
        "test_secret",
        chrono::Duration::minutes(-60),
        chrono::Duration::days(7),
    )
    .issue_tokens(account_id, "a@x.com", Role::User)
    .unwrap();

    let response = test::TestRequest::post()
        .uri("/sign-out")
        .insert_header(("Authorization", format!("Bearer {}", expired.access_token)))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
    let body: Value = test::read_body_json(response).await;
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("expired"), "unexpected message: {}", message);

    // The gate rejected it before sign-out ran
    let stored = repo.find_user_by_id(account_id).await.unwrap().unwrap();
    assert_eq!(stored.tokens.len(), 1);
}

#[actix_web::test]
async fn test_refresh_after_logout() {
    let (state, _) = test_state();
    let app = init_app!(state);

    let response = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(sign_up_body("a@x.com"))
        .send_request(&app)
        .await;
    let session: Value = test::read_body_json(response).await;

    let response = test::TestRequest::post()
        .uri("/sign-out")
        .insert_header(("Authorization", format!("Bearer {}", session["accessToken"].as_str().unwrap())))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let response = test::TestRequest::post()
        .uri("/refresh")
        .set_json(json!({ "refreshToken": session["refreshToken"] }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
    let body: Value = test::read_body_json(response).await;
    assert!(body.get("accessToken").is_none());
}

#[actix_web::test]
async fn test_promote_route() {
    let (state, repo) = test_state();
    let app = init_app!(state);

    let mut sessions = Vec::new();
    for email in ["admin@x.com", "user@x.com"] {
        let response = test::TestRequest::post()
            .uri("/sign-up")
            .set_json(sign_up_body(email))
            .send_request(&app)
            .await;
        let body: Value = test::read_body_json(response).await;
        sessions.push(body);
    }
    let admin_id = sessions[0]["user"]["id"].as_str().unwrap().to_string();
    let admin_token = sessions[0]["accessToken"].as_str().unwrap().to_string();
    let user_id = sessions[1]["user"]["id"].as_str().unwrap().to_string();

    // No token at all
    let response = test::TestRequest::post()
        .uri(&format!("/promote/{}", user_id))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);

    // Authenticated but not an admin yet
    let response = test::TestRequest::post()
        .uri(&format!("/promote/{}", user_id))
        .insert_header(("Authorization", format!("Bearer {}", admin_token)))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 403);

    repo.update_user_role(admin_id.parse().unwrap(), Role::Admin).await.unwrap();

    let response = test::TestRequest::post()
        .uri(&format!("/promote/{}", user_id))
        .insert_header(("Authorization", format!("Bearer {}", admin_token)))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let raw = test::read_body(response).await;
    let body: Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("tokens").is_none());
    let raw = String::from_utf8(raw.to_vec()).unwrap();
    assert!(!raw.contains(sessions[1]["accessToken"].as_str().unwrap()));
    assert!(!raw.contains(sessions[1]["refreshToken"].as_str().unwrap()));

    let response = test::TestRequest::post()
        .uri(&format!("/promote/{}", uuid::Uuid::new_v4()))
        .insert_header(("Authorization", format!("Bearer {}", admin_token)))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 404);

    let response = test::TestRequest::post()
        .uri("/promote/not-a-uuid")
        .insert_header(("Authorization", format!("Bearer {}", admin_token)))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);
}

#[actix_web::test]
async fn test_refresh_and_whoami() {
    let (state, _) = test_state();
    let app = init_app!(state);

    let response = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(sign_up_body("a@x.com"))
        .send_request(&app)
        .await;
    let session: Value = test::read_body_json(response).await;

    let response = test::TestRequest::post()
        .uri("/refresh")
        .set_json(json!({ "refreshToken": session["refreshToken"] }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let refreshed: Value = test::read_body_json(response).await;
    let access = refreshed["accessToken"].as_str().unwrap();

    let response = test::TestRequest::get()
        .uri("/whoami")
        .insert_header(("Authorization", format!("Bearer {}", access)))
        .send_request(&app)
        .await;
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["accountId"], session["user"]["id"]);

    let response = test::TestRequest::get().uri("/whoami").send_request(&app).await;
    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body, json!({ "authenticated": false }));
}
