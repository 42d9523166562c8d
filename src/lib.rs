//! Library entrypoint for TradeJournal.
//!
//! This file exists mainly to make integration tests easy (tests under
//! `tests/` can import the app state, routers, controllers, services).

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub notifier: Arc<dyn services::notifier::NotificationGateway>,
}
