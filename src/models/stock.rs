use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Reference data. `price` is kept current by an external feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub symbol: String,
    pub name: String,
    pub price: Decimal,
}
