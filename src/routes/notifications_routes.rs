use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::notifications_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/notifications/preferences",
            get(notifications_controller::get_preferences).post(notifications_controller::post_preferences),
        )
        .route("/api/notifications/test", post(notifications_controller::post_test_notification))
}
