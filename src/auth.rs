use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::AdminError,
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the bearer tokens issued by `POST /login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the employee id, as a decimal string.
    pub sub: String,
    /// Expiration time (seconds since the epoch).
    pub exp: usize,
    /// Issued at (seconds since the epoch).
    pub iat: usize,
}

/// AuthUser
///
/// The authenticated principal. Every admin handler receives it explicitly
/// as an argument instead of reading an ambient "current user".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// The employee id of the caller.
    pub id: i32,
    /// Resolved from the `employees` row on every request.
    pub is_admin: bool,
}

/// check_admin
///
/// The access guard. Called first by every admin handler, before any read or
/// write.
pub fn check_admin(user: &AuthUser) -> Result<(), AdminError> {
    if user.is_admin {
        Ok(())
    } else {
        tracing::warn!(employee_id = user.id, "non-admin denied access to admin route");
        Err(AdminError::Forbidden)
    }
}

/// issue_token
///
/// Signs an HS256 token for `employee_id`, valid for `config.jwt_ttl_secs`.
pub fn issue_token(config: &AppConfig, employee_id: i32) -> Result<String, AdminError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: employee_id.to_string(),
        iat: now as usize,
        exp: (now + config.jwt_ttl_secs) as usize,
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| AdminError::Internal(e.to_string()))
}

/// AuthUser Extractor Implementation
///
/// 1. In `Env::Local`, an `x-user-id` header naming an existing employee is
///    accepted as-is (development bypass).
/// 2. Otherwise a `Bearer` token is required, decoded and checked for expiry.
/// 3. The employee is loaded so that a deleted account or a revoked admin flag
///    takes effect immediately.
///
/// Rejection: `401 Unauthorized` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let bypass_id = (config.env == Env::Local)
            .then(|| parts.headers.get("x-user-id"))
            .flatten()
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.trim().parse::<i32>().ok());

        let employee_id = match bypass_id {
            Some(id) => id,
            None => {
                let token = parts
                    .headers
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .ok_or(StatusCode::UNAUTHORIZED)?;

                let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
                let mut validation = Validation::default();
                validation.validate_exp = true;

                let data = decode::<Claims>(token, &key, &validation).map_err(|e| {
                    tracing::debug!(error = %e, "bearer token rejected");
                    StatusCode::UNAUTHORIZED
                })?;
                data.claims
                    .sub
                    .parse::<i32>()
                    .map_err(|_| StatusCode::UNAUTHORIZED)?
            }
        };

        let employee = repo
            .get_employee(employee_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "employee lookup failed during authentication");
                StatusCode::UNAUTHORIZED
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(AuthUser {
            id: employee.id,
            is_admin: employee.is_admin,
        })
    }
}
