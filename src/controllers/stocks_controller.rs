use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{models::Stock, services::stocks_service, AppState};

use super::db_error;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDto {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl From<Stock> for StockDto {
    fn from(s: Stock) -> Self {
        Self {
            id: s.id.to_hex(),
            symbol: s.symbol,
            name: s.name,
            price: s.price,
        }
    }
}

// GET /api/stocks
pub async fn get_stocks(State(state): State<AppState>) -> Response {
    match stocks_service::list_stocks(&state).await {
        Ok(stocks) => {
            let items: Vec<StockDto> = stocks.into_iter().map(StockDto::from).collect();
            Json(items).into_response()
        }
        Err(e) => db_error(e),
    }
}
