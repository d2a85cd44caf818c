use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::telegram::{LoginAssertion, TelegramVerifier};
use crate::auth::token::{SessionToken, TokenService};
use crate::config::AuthConfig;
use crate::db::models::User;
use crate::db::store::UserStore;
use crate::error::{AppError, AuthError};

const BEARER_SEPARATOR: &str = "Bearer ";

/// A request whose bearer token resolved to a stored user.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub user: User,
}

/// Pulls the token out of an `Authorization` header value.
///
/// The header is split on `"Bearer "` and the second segment is taken, so
/// anything without that separator, or with nothing after it, has no token.
pub fn extract_bearer(authorization: Option<&str>) -> Result<&str, AuthError> {
    authorization
        .and_then(|header| header.split(BEARER_SEPARATOR).nth(1))
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Entry point for route handlers: resolves bearer tokens to users and turns
/// verified Telegram logins into session tokens.
pub struct AuthGateway {
    verifier: TelegramVerifier,
    tokens: TokenService,
    users: Arc<dyn UserStore>,
}

impl AuthGateway {
    pub fn new(config: &AuthConfig, users: Arc<dyn UserStore>) -> Self {
        Self {
            verifier: TelegramVerifier::new(config.telegram_bot_token.expose()),
            tokens: TokenService::new(config.jwt_secret.expose()),
            users,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub async fn authenticate_request(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedUser, AppError> {
        self.authenticate_request_at(authorization, Utc::now()).await
    }

    pub async fn authenticate_request_at(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedUser, AppError> {
        let token = extract_bearer(authorization)?;

        let user_id = self.tokens.verify_at(token, now).map_err(|e| {
            debug!("Session token rejected: {}", e);
            AuthError::InvalidToken
        })?;

        let user = self.users.find_by_id(user_id).await?.ok_or_else(|| {
            warn!("Session token refers to missing user {}", user_id);
            AuthError::SubjectNotFound
        })?;

        Ok(AuthenticatedUser { user_id, user })
    }

    pub async fn complete_telegram_login(
        &self,
        assertion: &LoginAssertion,
    ) -> Result<SessionToken, AppError> {
        self.complete_telegram_login_at(assertion, Utc::now()).await
    }

    pub async fn complete_telegram_login_at(
        &self,
        assertion: &LoginAssertion,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, AppError> {
        self.verifier.verify_at(assertion, now).map_err(|e| {
            info!("Telegram login rejected for id {}: {}", assertion.external_id(), e);
            e
        })?;

        let telegram_id = assertion.external_id();
        let user = self
            .users
            .find_by_telegram_id(telegram_id)
            .await?
            .ok_or_else(|| {
                warn!("User with Telegram id {} not found", telegram_id);
                AuthError::SubjectNotFound
            })?;

        self.users.record_login(user.id, &assertion.profile()).await?;

        let token = self.tokens.issue_at(user.id, now).map_err(|e| {
            AppError::InternalError(format!("failed to issue session token: {}", e))
        })?;

        info!("User {} logged in with Telegram id {}", user.id, telegram_id);
        Ok(token)
    }
}
