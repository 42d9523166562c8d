pub mod user;
pub mod stock;
pub mod alert;
pub mod trade;

pub use user::{CurrentUser, User};
pub use stock::Stock;
pub use alert::{PendingAlert, PriceAlert};
pub use trade::Trade;
