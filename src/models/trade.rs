use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub stock_id: ObjectId,

    pub entry_price: Decimal,
    pub pnl: Decimal,

    pub date: i64,
    pub is_holding: bool,
}
