use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use rust_decimal::Decimal;

use crate::{
    error::StoreError,
    models::{PriceAlert, Stock},
    AppState,
};

use super::{alert_store::ALERTS, stocks_service};

#[derive(Debug, Clone)]
pub struct AlertWithStock {
    pub alert: PriceAlert,
    pub stock: Option<Stock>,
}

pub async fn list_user_alerts(state: &AppState, user_id: ObjectId) -> Result<Vec<AlertWithStock>, StoreError> {
    let alerts = state.db.collection::<PriceAlert>(ALERTS);
    let find_opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();

    let mut cursor = alerts.find(doc! { "user_id": user_id }, find_opts).await?;

    let mut items: Vec<PriceAlert> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?);
    }

    let stocks = stocks_service::stocks_by_id(state, items.iter().map(|a| a.stock_id)).await?;

    Ok(items
        .into_iter()
        .map(|alert| AlertWithStock {
            stock: stocks.get(&alert.stock_id).cloned(),
            alert,
        })
        .collect())
}

pub async fn get_user_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<Option<AlertWithStock>, StoreError> {
    let alerts = state.db.collection::<PriceAlert>(ALERTS);

    let Some(alert) = alerts
        .find_one(doc! { "_id": alert_id, "user_id": user_id }, None)
        .await?
    else {
        return Ok(None);
    };

    let stock = stocks_service::get_stock(state, alert.stock_id).await?;
    Ok(Some(AlertWithStock { alert, stock }))
}

/// Creates a pending alert. Returns `Ok(None)` when `stock_id` does not
/// reference a known stock.
pub async fn create_alert(
    state: &AppState,
    user_id: ObjectId,
    stock_id: ObjectId,
    target_price: Decimal,
    is_above_target: bool,
) -> Result<Option<AlertWithStock>, StoreError> {
    let Some(stock) = stocks_service::get_stock(state, stock_id).await? else {
        return Ok(None);
    };

    let alert = PriceAlert {
        id: ObjectId::new(),
        user_id,
        stock_id,
        target_price,
        is_above_target,
        is_triggered: false,
        triggered_at: None,
        created_at: Utc::now().timestamp(),
    };

    state
        .db
        .collection::<PriceAlert>(ALERTS)
        .insert_one(&alert, None)
        .await?;

    tracing::info!(alert_id = %alert.id, symbol = %stock.symbol, "price alert created");

    Ok(Some(AlertWithStock {
        alert,
        stock: Some(stock),
    }))
}

/// Returns false when no alert with that id belongs to the user.
pub async fn delete_alert(state: &AppState, user_id: ObjectId, alert_id: ObjectId) -> Result<bool, StoreError> {
    let res = state
        .db
        .collection::<PriceAlert>(ALERTS)
        .delete_one(doc! { "_id": alert_id, "user_id": user_id }, None)
        .await?;

    Ok(res.deleted_count > 0)
}
