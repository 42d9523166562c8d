use std::collections::{HashMap, HashSet};

use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;

use crate::{error::StoreError, models::Stock, AppState};

use super::alert_store::{find_by_ids, STOCKS};

pub async fn list_stocks(state: &AppState) -> Result<Vec<Stock>, StoreError> {
    let stocks = state.db.collection::<Stock>(STOCKS);
    let find_opts = FindOptions::builder().sort(doc! { "symbol": 1 }).build();

    let mut cursor = stocks.find(None, find_opts).await?;

    let mut items = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?);
    }
    Ok(items)
}

pub async fn get_stock(state: &AppState, stock_id: ObjectId) -> Result<Option<Stock>, StoreError> {
    let stocks = state.db.collection::<Stock>(STOCKS);
    Ok(stocks.find_one(doc! { "_id": stock_id }, None).await?)
}

pub async fn stocks_by_id(
    state: &AppState,
    ids: impl IntoIterator<Item = ObjectId>,
) -> Result<HashMap<ObjectId, Stock>, StoreError> {
    let ids: HashSet<ObjectId> = ids.into_iter().collect();

    Ok(find_by_ids(state.db.collection::<Stock>(STOCKS), ids.into_iter().collect())
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect())
}
