//! Authentication module for the gym tracker
//!
//! Telegram Login Widget verification, stateless session tokens,
//! and the gateway route handlers go through.

pub mod handlers;
mod service;
mod telegram;
mod token;

pub use service::{extract_bearer, AuthGateway, AuthenticatedUser};
pub use telegram::{LoginAssertion, TelegramVerifier, FRESHNESS_WINDOW_SECS};
pub use token::{session_lifetime, Claims, SessionToken, TokenError, TokenService, SESSION_LIFETIME_DAYS};
