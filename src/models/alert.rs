use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Stock, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub stock_id: ObjectId,

    pub target_price: Decimal,
    // true => fire when price rises to/above target, false => falls to/below
    pub is_above_target: bool,

    pub is_triggered: bool,
    #[serde(default)]
    pub triggered_at: Option<i64>,

    pub created_at: i64,
}

impl PriceAlert {
    /// Whether `price` satisfies this alert's threshold. Both directions are
    /// inclusive of the target itself.
    pub fn is_met_by(&self, price: Decimal) -> bool {
        if self.is_above_target {
            price >= self.target_price
        } else {
            price <= self.target_price
        }
    }

    pub fn direction_word(&self) -> &'static str {
        if self.is_above_target { "above" } else { "below" }
    }
}

/// An untriggered alert together with the records it references, as loaded
/// for one evaluation pass. A reference that no longer resolves is `None`.
#[derive(Debug, Clone)]
pub struct PendingAlert {
    pub alert: PriceAlert,
    pub stock: Option<Stock>,
    pub user: Option<User>,
}
