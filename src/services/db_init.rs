use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

use crate::error::StoreError;

use super::{
    alert_store::{ALERTS, USERS},
    trades_service::TRADES,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    // users: unique username
    {
        let col = db.collection::<mongodb::bson::Document>(USERS);
        let model = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None).await?;
    }

    // price_alerts: evaluator scan
    {
        let col = db.collection::<mongodb::bson::Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "is_triggered": 1, "stock_id": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // price_alerts: per-user listing, newest first
    {
        let col = db.collection::<mongodb::bson::Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    // trades: per-user listing, newest first
    {
        let col = db.collection::<mongodb::bson::Document>(TRADES);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "date": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    Ok(())
}
