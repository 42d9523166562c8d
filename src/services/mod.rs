pub mod db_init;
pub mod alert_store;
pub mod alert_monitor;
pub mod notifier;

pub mod stocks_service;
pub mod alerts_service;
pub mod trades_service;
pub mod notification_service;
