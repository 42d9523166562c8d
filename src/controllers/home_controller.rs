use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use mongodb::bson::doc;

use crate::AppState;

use super::message;

pub async fn home() -> impl IntoResponse {
    message(StatusCode::OK, "TradeJournal API")
}

pub async fn not_found() -> impl IntoResponse {
    message(StatusCode::NOT_FOUND, "Not found")
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn health_db(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.run_command(doc! { "ping": 1 }, None).await {
        Ok(_) => (StatusCode::OK, "mongo: ok".to_string()).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("mongo error: {}", e),
        )
            .into_response(),
    }
}
