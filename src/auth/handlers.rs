use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::auth::service::AuthenticatedUser;
use crate::auth::telegram::LoginAssertion;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

/// Reads the `Authorization` header and resolves it to a user.
pub async fn authenticated_user(
    req: &HttpRequest,
    state: &AppState,
) -> Result<AuthenticatedUser, AppError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    state.auth.authenticate_request(authorization).await
}

/// `GET /auth/telegram` — the login widget redirects here with its signed fields.
pub async fn telegram_login(
    query: web::Query<BTreeMap<String, String>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let assertion = LoginAssertion::from_fields(query.into_inner())?;
    debug!("Telegram auth request for id {}", assertion.external_id());

    let token = state.auth.complete_telegram_login(&assertion).await?;
    Ok(HttpResponse::Ok().json(AuthResponse { token: token.into_inner() }))
}

/// `GET /me`
pub async fn me(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let authed = authenticated_user(&req, &state).await?;
    Ok(HttpResponse::Ok().json(authed.user))
}
