use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use mongodb::{
    Collection, Database,
    bson::{self, Document, doc, oid::ObjectId},
};
use serde::de::DeserializeOwned;

use crate::{
    error::StoreError,
    models::{PendingAlert, PriceAlert, Stock, User},
};

pub const ALERTS: &str = "price_alerts";
pub const STOCKS: &str = "stocks";
pub const USERS: &str = "users";

/// Persistence seen by the alert evaluator.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn list_untriggered_alerts_with_stock_and_user(&self) -> Result<Vec<PendingAlert>, StoreError>;

    /// Flips `is_triggered` to true. Returns `Ok(false)` when the alert was
    /// already triggered (or is gone), which is not an error.
    async fn mark_triggered(&self, alert_id: ObjectId) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct MongoAlertStore {
    db: Database,
}

impl MongoAlertStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Decodes each document on its own. A record that no longer matches its
/// model (a price stored as Decimal128, a missing field) is logged and
/// dropped; the rest of the batch is still returned.
pub fn decode_documents<T: DeserializeOwned>(docs: Vec<Document>, collection: &str) -> Vec<T> {
    docs.into_iter()
        .filter_map(|d| {
            let id = d.get_object_id("_id").ok();
            match bson::from_document::<T>(d) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(collection, id = ?id, error = %e, "skipping undecodable record");
                    None
                }
            }
        })
        .collect()
}

async fn fetch_documents(col: Collection<Document>, filter: Document) -> Result<Vec<Document>, StoreError> {
    let mut cursor = col.find(filter, None).await?;

    let mut docs = Vec::new();
    while let Some(res) = cursor.next().await {
        docs.push(res?);
    }
    Ok(docs)
}

pub(crate) async fn find_by_ids<T>(col: Collection<T>, ids: Vec<ObjectId>) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let name = col.name().to_string();
    let docs = fetch_documents(col.clone_with_type::<Document>(), doc! { "_id": { "$in": ids } }).await?;
    Ok(decode_documents(docs, &name))
}

/// Pairs each alert with the stock and user it references. A reference that
/// does not resolve is left as `None`.
pub fn join_pending(alerts: Vec<PriceAlert>, stocks: Vec<Stock>, users: Vec<User>) -> Vec<PendingAlert> {
    let stocks: HashMap<ObjectId, Stock> = stocks.into_iter().map(|s| (s.id, s)).collect();
    let users: HashMap<ObjectId, User> = users.into_iter().map(|u| (u.id, u)).collect();

    alerts
        .into_iter()
        .map(|alert| PendingAlert {
            stock: stocks.get(&alert.stock_id).cloned(),
            user: users.get(&alert.user_id).cloned(),
            alert,
        })
        .collect()
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn list_untriggered_alerts_with_stock_and_user(&self) -> Result<Vec<PendingAlert>, StoreError> {
        let docs = fetch_documents(self.db.collection::<Document>(ALERTS), doc! { "is_triggered": false }).await?;
        let pending: Vec<PriceAlert> = decode_documents(docs, ALERTS);

        if pending.is_empty() {
            return Ok(Vec::new());
        }

        // One lookup per referenced collection, not per alert
        let stock_ids: HashSet<ObjectId> = pending.iter().map(|a| a.stock_id).collect();
        let user_ids: HashSet<ObjectId> = pending.iter().map(|a| a.user_id).collect();

        let stocks = find_by_ids(self.db.collection::<Stock>(STOCKS), stock_ids.into_iter().collect()).await?;
        let users = find_by_ids(self.db.collection::<User>(USERS), user_ids.into_iter().collect()).await?;

        Ok(join_pending(pending, stocks, users))
    }

    async fn mark_triggered(&self, alert_id: ObjectId) -> Result<bool, StoreError> {
        let alerts = self.db.collection::<PriceAlert>(ALERTS);
        let now = Utc::now().timestamp();

        let res = alerts
            .update_one(
                doc! { "_id": alert_id, "is_triggered": false },
                doc! { "$set": { "is_triggered": true, "triggered_at": now } },
                None,
            )
            .await?;

        Ok(res.modified_count > 0)
    }
}
