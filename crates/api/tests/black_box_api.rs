use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use marketplace_auth::{Claims, Role};
use marketplace_core::UserId;
use marketplace_infra::AppConfig;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    async fn spawn_with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = JWT_SECRET.to_string();
        config.auth.password_cost = 1;
        config.auth.password_memory_kib = 64;
        tweak(&mut config);

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = marketplace_api::app::build_app(config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, user_id: i64, role: Role, ttl: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = Claims {
        user_id: UserId::new(user_id),
        role,
        sub: format!("user{user_id}@example.com"),
        issued_at: now - ChronoDuration::hours(1),
        expires_at: now - ChronoDuration::hours(1) + ttl,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn admin_token() -> String {
    mint_jwt(JWT_SECRET, 1_000, Role::Admin, ChronoDuration::hours(2))
}

async fn register(client: &reqwest::Client, srv: &TestServer, email: &str, password: &str) -> reqwest::Response {
    client
        .post(srv.url("/register"))
        .json(&json!({"name": "Test User", "email": email, "password": password}))
        .send()
        .await
        .unwrap()
}

async fn login(client: &reqwest::Client, srv: &TestServer, email: &str, password: &str) -> String {
    let res = client
        .post(srv.url("/login"))
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Register + login; returns (user id, token).
async fn signed_in_user(client: &reqwest::Client, srv: &TestServer, email: &str) -> (i64, String) {
    let res = register(client, srv, email, "password123").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    let id = body["user"]["id"].as_i64().unwrap();
    (id, login(client, srv, email, "password123").await)
}

#[tokio::test]
async fn health_reports_connected_store() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert!(body["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn register_login_create_product_flow() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv, "test@example.com", "password123").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "user registered successfully");
    assert_eq!(body["user"]["email"], "test@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());
    let user_id = body["user"]["id"].as_i64().unwrap();

    let token = login(&client, &srv, "test@example.com", "password123").await;

    let product = json!({
        "code": "TEST001",
        "name": "Test Product",
        "price": 100,
        "user_id": user_id,
    });

    let res = client
        .post(srv.url("/products"))
        .json(&product)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/products"))
        .bearer_auth(&token)
        .json(&product)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "active");
    assert_eq!(body["code"], "TEST001");
    assert_eq!(body["user_id"], user_id);
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv, "short@example.com", "1234567").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "validation_error");

    let res = register(&client, &srv, "not-an-email", "password123").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/register"))
        .json(&json!({"email": "x@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/register"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    assert_eq!(register(&client, &srv, "dup@example.com", "password123").await.status(), StatusCode::CREATED);
    let res = register(&client, &srv, "dup@example.com", "password456").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv, "me@example.com", "password123").await;

    for (email, password) in [("me@example.com", "wrong-password"), ("nobody@example.com", "password123")] {
        let res = client
            .post(srv.url("/login"))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "invalid credentials");
    }
}

#[tokio::test]
async fn login_fails_without_signing_secret() {
    let srv = TestServer::spawn_with(|c| c.auth.jwt_secret = String::new()).await;
    let client = reqwest::Client::new();
    register(&client, &srv, "me@example.com", "password123").await;

    let res = client
        .post(srv.url("/login"))
        .json(&json!({"email": "me@example.com", "password": "password123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn whoami_reflects_token_identity() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (id, token) = signed_in_user(&client, &srv, "who@example.com").await;

    let res = client
        .get(srv.url("/whoami"))
        .header("authorization", format!("bearer {token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], id);
    assert_eq!(body["email"], "who@example.com");
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn bad_tokens_are_unauthorized() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let expired = mint_jwt(JWT_SECRET, 1, Role::Admin, ChronoDuration::minutes(30));
    let forged = mint_jwt("some-other-secret", 1, Role::Admin, ChronoDuration::hours(2));

    for token in [expired.as_str(), forged.as_str(), "garbage"] {
        let res = client.get(srv.url("/whoami")).bearer_auth(token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    let res = client
        .get(srv.url("/whoami"))
        .header("authorization", format!("Basic {}", admin_token()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_management_requires_admin_role() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, token) = signed_in_user(&client, &srv, "plain@example.com").await;

    let res = client.get(srv.url("/users")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.get(srv.url("/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.url("/users")).bearer_auth(admin_token()).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 10);
}

#[tokio::test]
async fn admin_user_crud() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token();

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({"name": "Boss", "email": "boss@example.com", "password": "password123", "role": "admin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["role"], "admin");
    let id = created["id"].as_i64().unwrap();

    let res = client
        .patch(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .json(&json!({"name": "Big Boss", "password": "new-password-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "Big Boss");
    assert_eq!(updated["email"], "boss@example.com");

    // The new password works, the old one does not.
    login(&client, &srv, "boss@example.com", "new-password-1").await;
    let res = client
        .post(srv.url("/login"))
        .json(&json!({"email": "boss@example.com", "password": "password123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/users?email=boss&page_size=0"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let page: serde_json::Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["page_size"], 10);

    let res = client
        .delete(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/users/abc"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn product_owner_defaults_to_caller_and_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (user_id, token) = signed_in_user(&client, &srv, "seller@example.com").await;

    let res = client
        .post(srv.url("/products"))
        .bearer_auth(&token)
        .json(&json!({"code": "W-1", "name": "Widget", "price": 250, "status": "draft", "description": "blue"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["user_id"], user_id);
    assert_eq!(created["status"], "draft");
    let id = created["id"].as_i64().unwrap();

    let res = client.get(srv.url("/products/code/W-1")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: serde_json::Value = res.json().await.unwrap();
    assert_eq!(fetched["user"]["id"], user_id);
    assert_eq!(fetched["user"]["email"], "seller@example.com");
    assert!(fetched["user"].get("password_hash").is_none());

    let res = client
        .patch(srv.url(&format!("/products/{id}")))
        .bearer_auth(&token)
        .json(&json!({"price": 300}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["price"], 300);
    assert_eq!(updated["name"], "Widget");
    assert_eq!(updated["description"], "blue");

    let res = client
        .patch(srv.url(&format!("/products/{id}")))
        .bearer_auth(&token)
        .json(&json!({"description": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cleared: serde_json::Value = res.json().await.unwrap();
    assert!(cleared["description"].is_null());

    let res = client
        .get(srv.url(&format!("/products?user_id={user_id}&status=draft")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let page: serde_json::Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["total_pages"], 1);
    assert_eq!(page["data"][0]["user"]["email"], "seller@example.com");

    let res = client
        .delete(srv.url(&format!("/products/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/products/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_rules_surface_as_http_errors() {
    let srv = TestServer::spawn_with(|c| c.rules.max_products_per_user = 1).await;
    let client = reqwest::Client::new();
    let (_, token) = signed_in_user(&client, &srv, "rules@example.com").await;

    let create = |body: serde_json::Value| {
        client.post(srv.url("/products")).bearer_auth(&token).json(&body).send()
    };

    let res = create(json!({"code": "NEG", "name": "Negative", "price": -5})).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = create(json!({"code": "ORPHAN", "name": "Orphan", "price": 1, "user_id": 9_999})).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = create(json!({"code": "ONE", "name": "One", "price": 1})).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = create(json!({"code": "TWO", "name": "Two", "price": 1})).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "quota_exceeded");
}
