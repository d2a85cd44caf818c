use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fixed lifetime of every session token, counted from issuance.
pub const SESSION_LIFETIME_DAYS: i64 = 14;

pub fn session_lifetime() -> Duration {
    Duration::days(SESSION_LIFETIME_DAYS)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,  // User ID
    pub iat: i64, // Issued at
    pub exp: i64, // Expiration time
}

/// Why a session token was refused. Kept internal; callers outside the
/// auth module only ever see `AuthError::InvalidToken`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("signature invalid")]
    SignatureInvalid,

    #[error("token expired")]
    Expired,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Opaque bearer credential handed to clients.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Issues and checks HS256 session tokens. Immutable once built, so one
/// instance is shared by every worker.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is enforced against `iat` in verify_at.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, subject_id: i64) -> Result<SessionToken, TokenError> {
        self.issue_at(subject_id, Utc::now())
    }

    pub fn issue_at(&self, subject_id: i64, issued_at: DateTime<Utc>) -> Result<SessionToken, TokenError> {
        let iat = issued_at.timestamp();
        let claims = Claims {
            id: subject_id,
            iat,
            exp: iat + session_lifetime().num_seconds(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(SessionToken(token))
    }

    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;

        let expires_at = data.claims.iat.saturating_add(session_lifetime().num_seconds());
        if now.timestamp() > expires_at {
            return Err(TokenError::Expired);
        }

        Ok(data.claims.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "test_jwt_secret";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_then_verify() {
        let service = TokenService::new(SECRET);
        let token = service.issue(7).unwrap();
        assert_eq!(service.verify(token.as_str()), Ok(7));
    }

    #[test]
    fn test_lifetime_boundary() {
        let service = TokenService::new(SECRET);
        let token = service.issue_at(7, now()).unwrap();

        assert_eq!(service.verify_at(token.as_str(), now() + Duration::days(14)), Ok(7));
        assert_eq!(
            service.verify_at(token.as_str(), now() + Duration::days(14) + Duration::seconds(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_token_issued_too_long_ago_is_expired() {
        let service = TokenService::new(SECRET);
        let issued = Utc::now() - Duration::days(14) - Duration::seconds(1);
        let token = service.issue_at(7, issued).unwrap();
        assert_eq!(service.verify(token.as_str()), Err(TokenError::Expired));
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let issuer = TokenService::new(SECRET);
        let verifier = TokenService::new("a_different_secret");
        let token = issuer.issue(7).unwrap();
        assert_eq!(verifier.verify(token.as_str()), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_structurally_broken_tokens_are_malformed() {
        let service = TokenService::new(SECRET);
        for token in ["", "not-a-token", "a.b", "a.b.c"] {
            assert_eq!(service.verify(token), Err(TokenError::Malformed), "token {:?}", token);
        }
    }

    #[test]
    fn test_truncated_token_is_rejected() {
        let service = TokenService::new(SECRET);
        let token = service.issue(7).unwrap().into_inner();
        let truncated = &token[..token.len() - 5];
        assert!(service.verify(truncated).is_err());
    }

    #[test]
    fn test_payload_tampering_is_detected() {
        let service = TokenService::new(SECRET);
        let token = service.issue(7).unwrap().into_inner();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        // Keep the original signature but carry another subject id.
        let forged_claims = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &Claims { id: 8, iat: now().timestamp(), exp: now().timestamp() + 60 },
            &EncodingKey::from_secret(b"attacker"),
        )
        .unwrap();
        let forged_payload = forged_claims.split('.').nth(1).unwrap();
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(service.verify(&forged), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_session_token_debug_is_redacted() {
        let service = TokenService::new(SECRET);
        let token = service.issue(7).unwrap();
        assert_eq!(format!("{:?}", token), "SessionToken([REDACTED])");
    }
}
