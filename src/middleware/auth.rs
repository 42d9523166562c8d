use axum::{
    Json,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{models::{CurrentUser, User}, services::alert_store::USERS, AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // user id as hex string
    pub sub: String,
    // expiry (unix timestamp seconds)
    pub exp: usize,
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;

    for part in raw.split(';') {
        // a bare flag such as `secure` has no value
        let Some((k, v)) = part.split_once('=') else {
            continue;
        };
        if k.trim() == name {
            return Some(v.trim().to_string());
        }
    }
    None
}

fn get_bearer(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Returns the user id carried by a valid, unexpired token.
pub fn user_id_from_token(token: &str, secret: &str) -> Option<ObjectId> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation).ok()?;
    ObjectId::parse_str(&data.claims.sub).ok()
}

pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = get_bearer(req.headers())
        .or_else(|| get_cookie(req.headers(), &state.settings.jwt_cookie_name));

    if let Some(user_id) = token.and_then(|t| user_id_from_token(&t, &state.settings.jwt_secret)) {
        let users = state.db.collection::<User>(USERS);

        match users.find_one(doc! { "_id": user_id }, None).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(CurrentUser::from(user));
            }
            Ok(None) => tracing::debug!(user_id = %user_id, "token for unknown user"),
            Err(e) => {
                tracing::error!(error = %e, "failed to load current user");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Could not load the current user" })),
                )
                    .into_response();
            }
        }
    }

    next.run(req).await
}

fn is_public_path(path: &str) -> bool {
    !path.starts_with("/api/")
}

pub async fn require_auth(
    State(_state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    // inject_current_user runs first and leaves CurrentUser behind on success
    if req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Unauthorized" })),
    )
        .into_response()
}
