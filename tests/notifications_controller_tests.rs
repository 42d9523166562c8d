use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::{header, Request, StatusCode},
    routing::post,
    Router,
};
use http_body_util::BodyExt;
use mongodb::{bson::oid::ObjectId, Client};
use tower::ServiceExt;
use tradejournal::{
    config,
    controllers::notifications_controller,
    error::NotifyError,
    models::CurrentUser,
    services::notifier::{Category, Channel, NotificationGateway},
    AppState,
};

struct NullGateway;

#[async_trait]
impl NotificationGateway for NullGateway {
    async fn subscribe(&self, _channel: Channel, _destination: &str) -> Result<String, NotifyError> {
        Err(NotifyError::NotConfigured)
    }

    async fn unsubscribe(&self, _subscription: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn publish(&self, _message: &str, _subject: &str, _category: Category) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }
}

async fn test_state() -> AppState {
    let settings = config::load();

    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("mongodb client");
    let db = client.database(&settings.mongodb_db);

    AppState {
        db,
        settings,
        notifier: Arc::new(NullGateway),
    }
}

fn current_user() -> CurrentUser {
    CurrentUser {
        id: ObjectId::new(),
        username: "test".to_string(),
    }
}

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

fn json_post(uri: &str, body: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn post_preferences_unauthorized_returns_401() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/notifications/preferences", post(notifications_controller::post_preferences))
        .with_state(state);

    let req = json_post("/api/notifications/preferences", r#"{"emailNotificationsEnabled":false}"#);

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_preferences_invalid_email_returns_400() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/notifications/preferences", post(notifications_controller::post_preferences))
        .with_state(state);

    let mut req = json_post(
        "/api/notifications/preferences",
        r#"{"email":"not-an-email","emailNotificationsEnabled":true}"#,
    );
    req.extensions_mut().insert(current_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("invalid email destination"));
}

#[tokio::test]
async fn post_preferences_invalid_phone_returns_400() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/notifications/preferences", post(notifications_controller::post_preferences))
        .with_state(state);

    let mut req = json_post(
        "/api/notifications/preferences",
        r#"{"phoneNumber":"555-1234","smsNotificationsEnabled":true}"#,
    );
    req.extensions_mut().insert(current_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("invalid sms destination"));
}

#[tokio::test]
async fn post_test_notification_unauthorized_returns_401() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/notifications/test", post(notifications_controller::post_test_notification))
        .with_state(state);

    let req = Request::builder()
        .method("POST")
        .uri("/api/notifications/test")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
