use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    models::{CurrentUser, User},
    services::notification_service::{self, NotificationsError, PreferencesUpdate},
    AppState,
};

use super::{db_error, message, unauthorized};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferencesDto {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email_notifications_enabled: bool,
    #[serde(default)]
    pub sms_notifications_enabled: bool,
}

impl From<User> for NotificationPreferencesDto {
    fn from(u: User) -> Self {
        Self {
            email: u.email,
            phone_number: u.phone_number,
            email_notifications_enabled: u.email_notifications_enabled,
            sms_notifications_enabled: u.sms_notifications_enabled,
        }
    }
}

impl From<NotificationPreferencesDto> for PreferencesUpdate {
    fn from(dto: NotificationPreferencesDto) -> Self {
        Self {
            email: dto.email,
            phone_number: dto.phone_number,
            email_enabled: dto.email_notifications_enabled,
            sms_enabled: dto.sms_notifications_enabled,
        }
    }
}

fn error_response(e: NotificationsError) -> Response {
    match e {
        NotificationsError::UserNotFound => message(StatusCode::NOT_FOUND, "User not found"),
        NotificationsError::NoChannelEnabled => {
            message(StatusCode::BAD_REQUEST, "No notification methods are enabled")
        }
        NotificationsError::Store(e) => db_error(e),
        NotificationsError::Notify(e) => {
            tracing::warn!(error = %e, "notification request failed");
            message(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

// GET /api/notifications/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match notification_service::get_preferences(&state, u.id).await {
        Ok(user) => Json(NotificationPreferencesDto::from(user)).into_response(),
        Err(e) => error_response(e),
    }
}

// POST /api/notifications/preferences
pub async fn post_preferences(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<NotificationPreferencesDto>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    // Input is normalized and validated before any store access
    match notification_service::update_preferences(&state, u.id, PreferencesUpdate::from(body)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

// POST /api/notifications/test
pub async fn post_test_notification(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match notification_service::send_test_notification(&state, u.id).await {
        Ok(()) => message(StatusCode::OK, "Test notification sent successfully"),
        Err(NotificationsError::Notify(e)) => {
            tracing::error!(error = %e, "failed to send test notification");
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => error_response(e),
    }
}
