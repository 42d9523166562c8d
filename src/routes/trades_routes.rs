use axum::{Router, routing::get};
use crate::{AppState, controllers::trades_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/trades",
            get(trades_controller::get_trades).post(trades_controller::post_create_trade),
        )
        .route(
            "/api/trades/:id",
            get(trades_controller::get_trade)
                .put(trades_controller::put_update_trade)
                .delete(trades_controller::delete_trade),
        )
}
