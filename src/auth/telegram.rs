//! Telegram Login Widget verification.
//!
//! See <https://core.telegram.org/widgets/login#checking-authorization>.

use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

use crate::db::models::TelegramProfile;
use crate::error::{AppError, AuthError};

type HmacSha256 = Hmac<Sha256>;

/// How old an `auth_date` may be, in seconds, before the login is refused.
pub const FRESHNESS_WINDOW_SECS: i64 = 24 * 60 * 60;

const HASH_FIELD: &str = "hash";
const ID_FIELD: &str = "id";
const AUTH_DATE_FIELD: &str = "auth_date";

/// The signed field set handed over by the login widget.
///
/// Every received field except `hash` takes part in the signature, including
/// ones this server does not otherwise use.
#[derive(Debug, Clone)]
pub struct LoginAssertion {
    fields: BTreeMap<String, String>,
    hash: String,
}

impl LoginAssertion {
    pub fn from_fields<I>(fields: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut fields: BTreeMap<String, String> = fields.into_iter().collect();
        let hash = fields
            .remove(HASH_FIELD)
            .ok_or_else(|| missing_field(HASH_FIELD))?;

        for required in [ID_FIELD, AUTH_DATE_FIELD] {
            if !fields.contains_key(required) {
                return Err(missing_field(required));
            }
        }

        Ok(Self { fields, hash })
    }

    /// Telegram's user id, as sent.
    pub fn external_id(&self) -> &str {
        self.field(ID_FIELD).unwrap_or_default()
    }

    pub fn auth_date(&self) -> &str {
        self.field(AUTH_DATE_FIELD).unwrap_or_default()
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn profile(&self) -> TelegramProfile {
        TelegramProfile {
            first_name: self.field("first_name").map(str::to_owned),
            last_name: self.field("last_name").map(str::to_owned),
            photo_url: self.field("photo_url").map(str::to_owned),
        }
    }

    /// `key=value` lines sorted by key, without a trailing newline.
    pub fn data_check_string(&self) -> String {
        self.fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn missing_field(name: &str) -> AppError {
    AppError::ValidationError(format!("missing field `{}`", name))
}

/// Checks login assertions against one bot's token.
#[derive(Clone)]
pub struct TelegramVerifier {
    secret_key: [u8; 32],
}

impl TelegramVerifier {
    /// Only `SHA-256(bot_token)` is kept; the token itself is dropped here.
    pub fn new(bot_token: &str) -> Self {
        Self {
            secret_key: Sha256::digest(bot_token.as_bytes()).into(),
        }
    }

    pub fn verify(&self, assertion: &LoginAssertion) -> Result<(), AuthError> {
        self.verify_at(assertion, Utc::now())
    }

    pub fn verify_at(&self, assertion: &LoginAssertion, now: DateTime<Utc>) -> Result<(), AuthError> {
        // Freshness is checked first only because it is cheap.
        check_freshness(assertion, now)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret_key)
            .map_err(|_| AuthError::SignatureMismatch)?;
        mac.update(assertion.data_check_string().as_bytes());

        let supplied = HEXLOWER
            .decode(assertion.hash().as_bytes())
            .map_err(|_| {
                debug!("Telegram hash for id {} is not lowercase hex", assertion.external_id());
                AuthError::SignatureMismatch
            })?;

        // verify_slice compares in constant time
        mac.verify_slice(&supplied).map_err(|_| {
            debug!("Telegram hash mismatch for id {}", assertion.external_id());
            AuthError::SignatureMismatch
        })
    }
}

fn check_freshness(assertion: &LoginAssertion, now: DateTime<Utc>) -> Result<(), AuthError> {
    let auth_date = match assertion.auth_date().parse::<i64>() {
        Ok(secs) => secs,
        Err(_) => {
            debug!("Telegram auth date {:?} is not a unix timestamp", assertion.auth_date());
            return Err(AuthError::ExpiredAssertion);
        }
    };

    let age_secs = now.timestamp().saturating_sub(auth_date);
    if age_secs < 0 || age_secs > FRESHNESS_WINDOW_SECS {
        debug!(
            "Telegram auth date {} rejected for id {}: age {}s",
            auth_date,
            assertion.external_id(),
            age_secs
        );
        return Err(AuthError::ExpiredAssertion);
    }

    Ok(())
}
