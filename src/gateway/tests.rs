//! Router tests over the in-memory store and a scripted gateway

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use super::build_router;
use super::state::AppState;
use crate::pricing::PricingCalculator;
use crate::reconcile::{SIGNATURE_HEADER, sign_payload};
use crate::store::{MemoryStore, NewUser, Role, UserStore};
use crate::upstream::{MockGateway, ProviderRegistry};
use crate::user_auth::UserAuthService;
use crate::user_auth::service::hash_password;

const WEBHOOK_SECRET: &str = "whsec_router_test";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    store: Arc<MemoryStore>,
    gateway: Arc<MockGateway>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(MockGateway::new("followiz").with_service(1, dec!(0.90), 10, 10_000));
    let mut providers = ProviderRegistry::new();
    providers.register(gateway.clone());

    let user_auth = UserAuthService::new(store.clone(), "router-test-secret".to_string(), 24);
    let state = Arc::new(AppState::new(
        store.clone(),
        providers,
        PricingCalculator::default(),
        user_auth,
        Some(WEBHOOK_SECRET.to_string()),
    ));
    TestApp {
        router: build_router(state.clone()),
        state,
        store,
        gateway,
    }
}

impl TestApp {
    async fn user(&self, name: &str, role: Role) -> (i64, String) {
        let user = self
            .store
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: hash_password("password123").unwrap(),
                role,
            })
            .await
            .unwrap();
        let token = self.state.user_auth.issue_token(&user).unwrap();
        (user.id, token)
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn webhook(provider: &str, body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/webhooks/{}", provider))
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = app.send(get("/api/v1/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["providers"], json!(["followiz"]));
}

#[tokio::test]
async fn test_catalog_is_marked_up() {
    let app = test_app();
    let (status, body) = app.send(get("/api/v1/services", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["price_per_1000"], "1.37");
    assert_eq!(body["data"][0]["type"], "Default");
}

#[tokio::test]
async fn test_register_login_and_balance() {
    let app = test_app();
    let (status, body) = app
        .send(send_json(
            "POST",
            "/api/v1/auth/register",
            None,
            json!({"username": "erin_1", "email": "Erin@Example.com", "password": "password123"}),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "erin@example.com");
    assert_eq!(body["data"]["balance"], "0.00");

    let (status, body) = app
        .send(send_json(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({"email": "erin@example.com", "password": "password123"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.send(get("/api/v1/wallet/balance", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], "0.00");

    let (status, _) = app
        .send(send_json(
            "POST",
            "/api/v1/auth/register",
            None,
            json!({"username": "erin_1", "email": "other@example.com", "password": "password123"}),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validation() {
    let app = test_app();
    let (status, body) = app
        .send(send_json(
            "POST",
            "/api/v1/auth/register",
            None,
            json!({"username": "bad name!", "email": "x@example.com", "password": "password123"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    let (status, _) = app
        .send(send_json(
            "POST",
            "/api/v1/auth/register",
            None,
            json!({"username": "frank", "email": "frank@example.com", "password": "short"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let app = test_app();
    let (status, body) = app.send(get("/api/v1/orders", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2002);

    let (status, _) = app.send(get("/api/v1/orders", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_need_admin_role() {
    let app = test_app();
    let (_, token) = app.user("grace", Role::User).await;
    let (status, body) = app.send(get("/api/v1/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2003);
}

#[tokio::test]
async fn test_credit_then_order_then_cancel() {
    let app = test_app();
    let (_, admin) = app.user("root", Role::Admin).await;
    let (uid, token) = app.user("heidi", Role::User).await;

    let (status, body) = app
        .send(send_json(
            "POST",
            &format!("/api/v1/admin/users/{}/credit", uid),
            Some(&admin),
            json!({"amount": "5.00"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], "5.00");

    let (status, body) = app
        .send(send_json(
            "POST",
            "/api/v1/orders",
            Some(&token),
            json!({"service_id": 1, "link": "https://instagram.com/heidi", "quantity": 1000}),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "in_progress");
    assert_eq!(body["data"]["total_price"], "1.37");
    let order_id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = app.send(get("/api/v1/wallet/balance", Some(&token))).await;
    assert_eq!(body["data"]["balance"], "3.63");

    let (status, body) = app.send(get("/api/v1/orders?page=1&limit=500", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["limit"], 100);
    assert_eq!(body["data"]["pagination"]["total"], 1);

    let (status, body) = app
        .send(send_json(
            "PUT",
            &format!("/api/v1/orders/{}/cancel", order_id),
            Some(&token),
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (_, body) = app.send(get("/api/v1/wallet/balance", Some(&token))).await;
    assert_eq!(body["data"]["balance"], "5.00");
}

#[tokio::test]
async fn test_credit_rejects_numeric_amount() {
    let app = test_app();
    let (_, admin) = app.user("root", Role::Admin).await;
    let (uid, _) = app.user("ivan", Role::User).await;

    for amount in [json!(5.0), json!("-1.00"), json!("0")] {
        let (status, body) = app
            .send(send_json(
                "POST",
                &format!("/api/v1/admin/users/{}/credit", uid),
                Some(&admin),
                json!({ "amount": amount }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 1001);
    }
}

#[tokio::test]
async fn test_insufficient_balance() {
    let app = test_app();
    let (_, token) = app.user("judy", Role::User).await;
    let (status, body) = app
        .send(send_json(
            "POST",
            "/api/v1/orders",
            Some(&token),
            json!({"service_id": 1, "link": "https://instagram.com/judy", "quantity": 1000}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 1002);
    assert_eq!(app.gateway.create_count(), 0);
}

#[tokio::test]
async fn test_webhook_signed_and_idempotent() {
    let app = test_app();
    let (uid, token) = app.user("mallory", Role::User).await;
    app.store.credit(uid, dec!(5)).await.unwrap();
    let (_, body) = app
        .send(send_json(
            "POST",
            "/api/v1/orders",
            Some(&token),
            json!({"service_id": 1, "link": "https://instagram.com/m", "quantity": 100}),
        ))
        .await;
    let upstream_id = body["data"]["upstream_order_id"].as_i64().unwrap();

    let payload = format!(
        r#"{{"order":{},"status":"Completed","remains":0,"start_count":50}}"#,
        upstream_id
    );
    let sig = sign_payload(WEBHOOK_SECRET.as_bytes(), payload.as_bytes()).unwrap();

    let (status, body) = app.send(webhook("followiz", &payload, &sig)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["current_count"], 100);
    let first = body["data"].clone();

    let (status, body) = app.send(webhook("followiz", &payload, &sig)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], first);

    let (status, _) = app.send(webhook("followiz", &payload, "deadbeef")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_unknown_order() {
    let app = test_app();
    let payload = r#"{"order":424242,"status":"Completed","remains":0}"#;
    let sig = sign_payload(WEBHOOK_SECRET.as_bytes(), payload.as_bytes()).unwrap();
    let (status, body) = app.send(webhook("followiz", payload, &sig)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4001);
}

#[tokio::test]
async fn test_provider_console_batch_cap() {
    let app = test_app();
    let (_, admin) = app.user("root", Role::Admin).await;
    let ids: Vec<i64> = (1..=101).collect();
    let (status, _) = app
        .send(send_json(
            "POST",
            "/api/v1/admin/providers/followiz/orders/cancel",
            Some(&admin),
            json!({ "ids": ids }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.gateway.cancel_count(), 0);

    let (status, body) = app
        .send(get("/api/v1/admin/providers/followiz/balance", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currency"], "USD");

    let (status, _) = app
        .send(get("/api/v1/admin/providers/nope/balance", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_served() {
    let app = test_app();
    let (status, body) = app.send(get("/api-docs/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/orders"].is_object());
}
