//! Credential service: password hashing and signed access tokens.
//!
//! Passwords are hashed with Argon2id (PHC string output, random salt per hash).
//! Tokens are HS256 JWTs over [`Claims`], signed with a shared secret.

use std::collections::HashSet;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use marketplace_core::{DomainError, UserId};

use crate::{Claims, Role, TokenValidationError, validate_claims};

/// Authentication settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HMAC secret. Empty means "unset": token issuance fails.
    pub jwt_secret: String,

    pub token_expiration_hours: i64,

    /// Argon2 time cost (iterations).
    pub password_cost: u32,

    /// Argon2 memory cost in KiB.
    pub password_memory_kib: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiration_hours: 72,
            password_cost: Params::DEFAULT_T_COST,
            password_memory_kib: Params::DEFAULT_M_COST,
        }
    }
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &if self.jwt_secret.is_empty() { "<unset>" } else { "<redacted>" })
            .field("token_expiration_hours", &self.token_expiration_hours)
            .field("password_cost", &self.password_cost)
            .field("password_memory_kib", &self.password_memory_kib)
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid password hashing parameters: {0}")]
    InvalidParams(String),

    #[error("token lifetime of {0} hours is out of range")]
    InvalidTokenLifetime(i64),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    MissingSecret,

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

impl From<CredentialError> for DomainError {
    fn from(err: CredentialError) -> Self {
        DomainError::internal(err.to_string())
    }
}

impl From<TokenError> for DomainError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSecret | TokenError::Signing(_) => DomainError::internal(err.to_string()),
            TokenError::Invalid(_) | TokenError::Claims(_) => DomainError::unauthorized(err.to_string()),
        }
    }
}

/// Anything a token can be issued for.
pub trait TokenSubject {
    fn subject_id(&self) -> UserId;
    fn subject_role(&self) -> Role;
    fn subject_email(&self) -> &str;
}

impl TokenSubject for crate::Principal {
    fn subject_id(&self) -> UserId {
        self.user_id
    }

    fn subject_role(&self) -> Role {
        self.role
    }

    fn subject_email(&self) -> &str {
        &self.email
    }
}

pub struct CredentialService {
    secret: Vec<u8>,
    token_ttl: Duration,
    hasher: Argon2<'static>,
}

impl core::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialService")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl CredentialService {
    pub fn new(config: AuthConfig) -> Result<Self, CredentialError> {
        let params = Params::new(config.password_memory_kib, config.password_cost, 1, None)
            .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;

        let token_ttl = Duration::try_hours(config.token_expiration_hours)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or(CredentialError::InvalidTokenLifetime(config.token_expiration_hours))?;

        if config.jwt_secret.is_empty() {
            warn!("JWT secret is not configured; token issuance will fail");
        }

        Ok(Self {
            secret: config.jwt_secret.into_bytes(),
            token_ttl,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// One-way hash of a plaintext password.
    #[instrument(skip_all, err(Display))]
    pub fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// Constant-time check of a plaintext password against a stored hash.
    ///
    /// A mismatch, or a stored hash that cannot be parsed, yields `false`.
    #[instrument(skip_all)]
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };

        let ok = self.hasher.verify_password(password.as_bytes(), &parsed).is_ok();
        debug!(ok, "password verification finished");
        ok
    }

    /// Issue a token valid from now for the configured duration.
    pub fn issue_token<S: TokenSubject + ?Sized>(&self, subject: &S) -> Result<String, TokenError> {
        self.issue_token_at(subject, Utc::now())
    }

    #[instrument(skip_all, fields(user_id = %subject.subject_id()), err(Display))]
    pub fn issue_token_at<S: TokenSubject + ?Sized>(
        &self,
        subject: &S,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| TokenError::Signing("token expiry is out of range".to_string()))?;

        let claims = Claims {
            user_id: subject.subject_id(),
            role: subject.subject_role(),
            sub: subject.subject_email().to_string(),
            issued_at: now,
            expires_at,
        };
        self.sign(&claims)
    }

    /// Sign an arbitrary claims set with the shared secret.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        jsonwebtoken::encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_token_at(token, Utc::now())
    }

    /// Verify signature + algorithm, then check the claims window against `now`.
    #[instrument(skip_all, err(Display))]
    pub fn validate_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        // Expiry is checked below against the caller's clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|e| TokenError::Invalid(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
