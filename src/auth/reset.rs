use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::ResetConfig, state::AppState};

/// Self-contained reset authorization: nothing is stored server-side, the
/// token alone (bound to one user id) proves the email link was followed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResetTokenError {
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token structure")]
    Malformed,
    #[error("Token was not issued for this user")]
    UserMismatch,
}

impl From<jsonwebtoken::errors::Error> for ResetTokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => ResetTokenError::Expired,
            ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => ResetTokenError::Malformed,
            _ => ResetTokenError::InvalidSignature,
        }
    }
}

/// Reset-token keys. Deliberately a different secret than the session keys.
#[derive(Clone)]
pub struct ResetKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for ResetKeys {
    fn from_ref(state: &AppState) -> Self {
        let ResetConfig {
            secret,
            ttl_minutes,
            ..
        } = state.config.reset.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl ResetKeys {
    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = ResetClaims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "reset token issued");
        Ok(token)
    }

    /// The user-id comparison is not optional: without it any valid reset
    /// token could reset any account.
    pub fn verify(&self, token: &str, expected_user: Uuid) -> Result<(), ResetTokenError> {
        let data = decode::<ResetClaims>(token, &self.decoding, &Validation::default())?;
        if data.claims.sub != expected_user {
            warn!(expected = %expected_user, embedded = %data.claims.sub, "reset token user mismatch");
            return Err(ResetTokenError::UserMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::SessionKeys;

    fn make_keys() -> ResetKeys {
        let state = AppState::fake();
        ResetKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn issue_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).expect("issue");
        assert!(keys.verify(&token, user_id).is_ok());
    }

    #[tokio::test]
    async fn mismatched_user_is_rejected() {
        let keys = make_keys();
        let token = keys.issue(Uuid::new_v4()).expect("issue");
        assert_eq!(
            keys.verify(&token, Uuid::new_v4()),
            Err(ResetTokenError::UserMismatch)
        );
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let past = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let claims = ResetClaims {
            sub: user_id,
            iat: (past - TimeDuration::hours(1)).unix_timestamp() as usize,
            exp: past.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.verify(&token, user_id), Err(ResetTokenError::Expired));
    }

    #[tokio::test]
    async fn session_key_cannot_forge_reset_tokens() {
        let state = AppState::fake();
        let reset_keys = ResetKeys::from_ref(&state);
        let session_keys = SessionKeys::from_ref(&state);

        let user_id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let claims = ResetClaims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: (now + TimeDuration::hours(1)).unix_timestamp() as usize,
        };
        let forged = encode(&Header::default(), &claims, &session_keys.encoding).expect("encode");
        assert_eq!(
            reset_keys.verify(&forged, user_id),
            Err(ResetTokenError::InvalidSignature)
        );
    }
}
