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
    services::trades_service::{self, TradeWithStock},
    AppState,
};

use super::{db_error, message, parse_id, timestamp, unauthorized};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDto {
    pub id: String,
    pub stock_id: String,
    pub stock_symbol: String,
    pub stock_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub entry_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub pnl: Decimal,
    pub date: DateTime<Utc>,
    pub is_holding: bool,
}

impl From<TradeWithStock> for TradeDto {
    fn from(TradeWithStock { trade, stock }: TradeWithStock) -> Self {
        let (stock_symbol, stock_name) = stock
            .map(|s| (s.symbol, s.name))
            .unwrap_or_default();

        Self {
            id: trade.id.to_hex(),
            stock_id: trade.stock_id.to_hex(),
            stock_symbol,
            stock_name,
            entry_price: trade.entry_price,
            pnl: trade.pnl,
            date: timestamp(trade.date),
            is_holding: trade.is_holding,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTradeDto {
    pub stock_id: String,
    pub entry_price: Decimal,
    #[serde(default = "default_holding")]
    pub is_holding: bool,
}

fn default_holding() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTradeDto {
    pub pnl: Decimal,
    pub is_holding: bool,
}

// GET /api/trades
pub async fn get_trades(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match trades_service::list_user_trades(&state, u.id).await {
        Ok(items) => {
            let dtos: Vec<TradeDto> = items.into_iter().map(TradeDto::from).collect();
            Json(dtos).into_response()
        }
        Err(e) => db_error(e),
    }
}

// GET /api/trades/:id
pub async fn get_trade(
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

    match trades_service::get_user_trade(&state, u.id, oid).await {
        Ok(Some(item)) => Json(TradeDto::from(item)).into_response(),
        Ok(None) => message(StatusCode::NOT_FOUND, "Trade not found"),
        Err(e) => db_error(e),
    }
}

// POST /api/trades
pub async fn post_create_trade(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<CreateTradeDto>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let stock_id = match parse_id(&body.stock_id) {
        Ok(x) => x,
        Err(_) => return message(StatusCode::BAD_REQUEST, "Invalid stock ID"),
    };

    if body.entry_price <= Decimal::ZERO {
        return message(StatusCode::BAD_REQUEST, "Please enter a valid entry price.");
    }

    match trades_service::create_trade(&state, u.id, stock_id, body.entry_price, body.is_holding).await {
        Ok(Some(item)) => (StatusCode::CREATED, Json(TradeDto::from(item))).into_response(),
        Ok(None) => message(StatusCode::BAD_REQUEST, "Invalid stock ID"),
        Err(e) => db_error(e),
    }
}

// PUT /api/trades/:id
pub async fn put_update_trade(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<UpdateTradeDto>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match trades_service::update_trade(&state, u.id, oid, body.pnl, body.is_holding).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => message(StatusCode::NOT_FOUND, "Trade not found"),
        Err(e) => db_error(e),
    }
}

// DELETE /api/trades/:id
pub async fn delete_trade(
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

    match trades_service::delete_trade(&state, u.id, oid).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => message(StatusCode::NOT_FOUND, "Trade not found"),
        Err(e) => db_error(e),
    }
}
