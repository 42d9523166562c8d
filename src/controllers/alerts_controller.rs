use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    models::CurrentUser,
    services::alerts_service::{self, AlertWithStock},
    AppState,
};

use super::{db_error, message, parse_id, timestamp, unauthorized};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlertDto {
    pub id: String,
    pub stock_id: String,
    pub stock_symbol: String,
    pub stock_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub target_price: Decimal,
    pub is_above_target: bool,
    pub is_triggered: bool,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
}

impl From<AlertWithStock> for PriceAlertDto {
    fn from(AlertWithStock { alert, stock }: AlertWithStock) -> Self {
        let (stock_symbol, stock_name) = stock
            .map(|s| (s.symbol, s.name))
            .unwrap_or_default();

        Self {
            id: alert.id.to_hex(),
            stock_id: alert.stock_id.to_hex(),
            stock_symbol,
            stock_name,
            target_price: alert.target_price,
            is_above_target: alert.is_above_target,
            is_triggered: alert.is_triggered,
            created_at: timestamp(alert.created_at),
            triggered_at: alert.triggered_at.map(timestamp),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePriceAlertDto {
    pub stock_id: String,
    pub target_price: Decimal,
    pub is_above_target: bool,
}

// GET /api/pricealerts
pub async fn get_alerts(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match alerts_service::list_user_alerts(&state, u.id).await {
        Ok(items) => {
            let dtos: Vec<PriceAlertDto> = items.into_iter().map(PriceAlertDto::from).collect();
            Json(dtos).into_response()
        }
        Err(e) => db_error(e),
    }
}

// GET /api/pricealerts/:id
pub async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match alerts_service::get_user_alert(&state, u.id, oid).await {
        Ok(Some(item)) => Json(PriceAlertDto::from(item)).into_response(),
        Ok(None) => message(StatusCode::NOT_FOUND, "Alert not found"),
        Err(e) => db_error(e),
    }
}

// POST /api/pricealerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<CreatePriceAlertDto>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let stock_id = match parse_id(&body.stock_id) {
        Ok(x) => x,
        Err(_) => return message(StatusCode::BAD_REQUEST, "Invalid stock ID"),
    };

    if body.target_price <= Decimal::ZERO {
        return message(StatusCode::BAD_REQUEST, "Please enter a valid target price.");
    }

    match alerts_service::create_alert(&state, u.id, stock_id, body.target_price, body.is_above_target).await {
        Ok(Some(item)) => (StatusCode::CREATED, Json(PriceAlertDto::from(item))).into_response(),
        Ok(None) => message(StatusCode::BAD_REQUEST, "Invalid stock ID"),
        Err(e) => db_error(e),
    }
}

// DELETE /api/pricealerts/:id
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match alerts_service::delete_alert(&state, u.id, oid).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => message(StatusCode::NOT_FOUND, "Alert not found"),
        Err(e) => db_error(e),
    }
}
