use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use rust_decimal::Decimal;

use crate::{
    error::StoreError,
    models::{Stock, Trade},
    AppState,
};

use super::{notification_service, notifier::Category, stocks_service};

pub const TRADES: &str = "trades";

#[derive(Debug, Clone)]
pub struct TradeWithStock {
    pub trade: Trade,
    pub stock: Option<Stock>,
}

pub fn opened_message(symbol: &str, entry_price: Decimal) -> (String, String) {
    (
        format!("New Trade: {symbol} Purchased"),
        format!("You have successfully purchased {symbol} at ${entry_price}."),
    )
}

pub fn closed_message(symbol: &str, pnl: Decimal) -> (String, String) {
    let outcome = if pnl >= Decimal::ZERO { "profit" } else { "loss" };
    (
        format!("Trade Closed: {symbol} Sold"),
        format!("You have sold {symbol} with a {outcome} of ${}.", pnl.abs()),
    )
}

pub async fn list_user_trades(state: &AppState, user_id: ObjectId) -> Result<Vec<TradeWithStock>, StoreError> {
    let trades = state.db.collection::<Trade>(TRADES);
    let find_opts = FindOptions::builder().sort(doc! { "date": -1 }).build();

    let mut cursor = trades.find(doc! { "user_id": user_id }, find_opts).await?;

    let mut items: Vec<Trade> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?);
    }

    let stocks = stocks_service::stocks_by_id(state, items.iter().map(|t| t.stock_id)).await?;

    Ok(items
        .into_iter()
        .map(|trade| TradeWithStock {
            stock: stocks.get(&trade.stock_id).cloned(),
            trade,
        })
        .collect())
}

async fn find_user_trade(state: &AppState, user_id: ObjectId, trade_id: ObjectId) -> Result<Option<Trade>, StoreError> {
    Ok(state
        .db
        .collection::<Trade>(TRADES)
        .find_one(doc! { "_id": trade_id, "user_id": user_id }, None)
        .await?)
}

pub async fn get_user_trade(
    state: &AppState,
    user_id: ObjectId,
    trade_id: ObjectId,
) -> Result<Option<TradeWithStock>, StoreError> {
    let Some(trade) = find_user_trade(state, user_id, trade_id).await? else {
        return Ok(None);
    };

    let stock = stocks_service::get_stock(state, trade.stock_id).await?;
    Ok(Some(TradeWithStock { trade, stock }))
}

/// Records a new trade and notifies the user. Returns `Ok(None)` for an
/// unknown stock.
pub async fn create_trade(
    state: &AppState,
    user_id: ObjectId,
    stock_id: ObjectId,
    entry_price: Decimal,
    is_holding: bool,
) -> Result<Option<TradeWithStock>, StoreError> {
    let Some(stock) = stocks_service::get_stock(state, stock_id).await? else {
        return Ok(None);
    };

    let trade = Trade {
        id: ObjectId::new(),
        user_id,
        stock_id,
        entry_price,
        pnl: Decimal::ZERO,
        date: Utc::now().timestamp(),
        is_holding,
    };

    state
        .db
        .collection::<Trade>(TRADES)
        .insert_one(&trade, None)
        .await?;

    tracing::info!(trade_id = %trade.id, symbol = %stock.symbol, "trade recorded");

    let (subject, message) = opened_message(&stock.symbol, entry_price);
    notification_service::notify_user(state, user_id, &subject, &message, Category::Trade).await;

    Ok(Some(TradeWithStock {
        trade,
        stock: Some(stock),
    }))
}

/// Whether an update turns a held position into a sold one.
pub fn closes_position(before: &Trade, is_holding: bool) -> bool {
    before.is_holding && !is_holding
}

/// Updates PnL and holding state. A holding trade that is no longer held
/// counts as sold and sends a closing notification. Returns false when the
/// trade does not exist for this user.
pub async fn update_trade(
    state: &AppState,
    user_id: ObjectId,
    trade_id: ObjectId,
    pnl: Decimal,
    is_holding: bool,
) -> Result<bool, StoreError> {
    // The pre-image decides the notification, so concurrent closes send one
    let opts = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::Before)
        .build();

    let before = state
        .db
        .collection::<Trade>(TRADES)
        .find_one_and_update(
            doc! { "_id": trade_id, "user_id": user_id },
            doc! { "$set": { "pnl": pnl.to_string(), "is_holding": is_holding } },
            opts,
        )
        .await?;

    let Some(before) = before else {
        return Ok(false);
    };

    if closes_position(&before, is_holding) {
        let stock = stocks_service::get_stock(state, before.stock_id).await?;
        let symbol = stock.as_ref().map(|s| s.symbol.as_str()).unwrap_or("?");
        let (subject, message) = closed_message(symbol, pnl);
        notification_service::notify_user(state, user_id, &subject, &message, Category::Trade).await;
    }

    Ok(true)
}

pub async fn delete_trade(state: &AppState, user_id: ObjectId, trade_id: ObjectId) -> Result<bool, StoreError> {
    let res = state
        .db
        .collection::<Trade>(TRADES)
        .delete_one(doc! { "_id": trade_id, "user_id": user_id }, None)
        .await?;

    Ok(res.deleted_count > 0)
}
