use axum::http::{HeaderMap, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::AppError,
    models::Identity,
    repository::RepositoryState,
    role::RawRole,
};

/// Development-only identity header, honoured when `APP_ENV=local`.
pub const DEV_EMAIL_HEADER: &str = "x-user-email";

/// Default lifetime of an issued session token.
pub const SESSION_TTL_DAYS: i64 = 7;

/// SessionClaims
///
/// Payload of the HS256 session cookie. The subject is the account email. `role` is
/// whatever the issuer embedded and is never trusted for authorization: the role is
/// always re-read from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RawRole>,
}

/// Trims and lowercases an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// issue_session_token
///
/// Mints a session cookie value for `identity`, valid for `ttl`.
pub fn issue_session_token(
    identity: &Identity,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: normalize_email(&identity.email),
        iat: now.timestamp().max(0) as usize,
        exp: (now + ttl).timestamp().max(0) as usize,
        role: identity.user_role.map(RawRole::from),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// decode_session_token
///
/// Verifies signature and expiry of a session token and returns its claims.
pub fn decode_session_token(
    token: &str,
    secret: &str,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

/// Returns the value of cookie `name` from the request's `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// SessionResolver
///
/// Turns request headers into the authenticated `Identity`, if any.
///
/// Credential sources, first present wins:
/// 1. `x-user-email` (local environment only),
/// 2. the session cookie (HS256 JWT whose subject is the email),
/// 3. `Authorization: Bearer <email>`.
///
/// The bearer form is a capability token, not a cryptographic credential: anyone who
/// knows an email can present it. It exists for the chat backend's calling convention.
///
/// Missing, invalid and unknown credentials resolve to `Ok(None)`. Only a store failure
/// is an error.
#[derive(Clone)]
pub struct SessionResolver {
    repo: RepositoryState,
    config: AppConfig,
}

impl SessionResolver {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }

    /// The email the request claims to act as, before any lookup.
    pub fn credential(&self, headers: &HeaderMap) -> Option<String> {
        if self.config.dev_identity_header_enabled() {
            if let Some(email) = headers
                .get(DEV_EMAIL_HEADER)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.trim().is_empty())
            {
                return Some(normalize_email(email));
            }
        }

        if let Some(token) = cookie_value(headers, &self.config.session_cookie) {
            match decode_session_token(&token, &self.config.session_secret) {
                Ok(claims) => return Some(normalize_email(&claims.sub)),
                Err(e) => match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("session cookie expired"),
                    _ => tracing::debug!(error = %e, "session cookie rejected"),
                },
            }
        }

        bearer_token(headers)
            .map(|email| normalize_email(&email))
            .filter(|email| !email.is_empty())
    }

    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Identity>, AppError> {
        let Some(email) = self.credential(headers) else {
            return Ok(None);
        };

        let identity = self.repo.find_identity_by_email(&email).await?;
        if identity.is_none() {
            tracing::debug!(%email, "credential does not match any account");
        }
        Ok(identity)
    }
}
