use axum::Router;
use axum::middleware::from_fn_with_state;
use tower_http::trace::TraceLayer;

use crate::{AppState, controllers::home_controller};

pub mod home_routes;
pub mod stocks_routes;
pub mod alerts_routes;
pub mod trades_routes;
pub mod notifications_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = home_routes::add_routes(router);
    let router = stocks_routes::add_routes(router);
    let router = alerts_routes::add_routes(router);
    let router = trades_routes::add_routes(router);
    let router = notifications_routes::add_routes(router);

    router
        .fallback(home_controller::not_found)
        .layer(from_fn_with_state(state.clone(), crate::auth::require_auth))
        .layer(from_fn_with_state(state.clone(), crate::auth::inject_current_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
