use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::error::StoreError;

pub mod home_controller;
pub mod stocks_controller;
pub mod alerts_controller;
pub mod trades_controller;
pub mod notifications_controller;

pub(crate) fn message(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "message": msg.into() }))).into_response()
}

pub(crate) fn unauthorized() -> Response {
    message(StatusCode::UNAUTHORIZED, "Unauthorized")
}

pub(crate) fn db_error(e: StoreError) -> Response {
    tracing::error!(error = %e, "request failed on store access");
    message(StatusCode::INTERNAL_SERVER_ERROR, format!("db error: {e}"))
}

pub(crate) fn parse_id(raw: &str) -> Result<ObjectId, Response> {
    ObjectId::parse_str(raw.trim()).map_err(|_| message(StatusCode::BAD_REQUEST, "bad id"))
}

pub(crate) fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
