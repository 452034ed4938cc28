use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use marketplace_core::UserId;

use crate::Role;

/// JWT claims carried by access tokens.
///
/// Timestamps serialize as the registered `iat` / `exp` numeric dates so any
/// standard JWT library can check expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,

    pub role: Role,

    /// Subject: the user's email.
    pub sub: String,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate claims against `now`.
///
/// Signature verification happens before this, in the credential service.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn claims(issued_at: DateTime<Utc>, ttl: Duration) -> Claims {
        Claims {
            user_id: UserId::new(1),
            role: Role::User,
            sub: "a@example.com".to_string(),
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn accepts_within_window() {
        let c = claims(t0(), Duration::hours(1));
        assert_eq!(validate_claims(&c, t0() + Duration::minutes(30)), Ok(()));
    }

    #[test]
    fn rejects_expired() {
        let c = claims(t0(), Duration::hours(1));
        assert_eq!(
            validate_claims(&c, t0() + Duration::hours(1)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn rejects_future_issue() {
        let c = claims(t0(), Duration::hours(1));
        assert_eq!(
            validate_claims(&c, t0() - Duration::seconds(1)),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn rejects_inverted_window() {
        let c = claims(t0(), Duration::zero());
        assert_eq!(validate_claims(&c, t0()), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn timestamps_use_registered_claim_names() {
        let c = claims(t0(), Duration::hours(1));
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["iat"], t0().timestamp());
        assert_eq!(v["exp"], (t0() + Duration::hours(1)).timestamp());
        assert_eq!(v["role"], "user");
        assert_eq!(v["user_id"], 1);
    }
}
