use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::AppError;
use crate::models::role::Role;
use crate::models::user::User;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, exp_hours: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            exp_hours,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::configuration("JWT_SECRET not set"))?;
        let exp_hours = parse_exp_hours(std::env::var("JWT_EXP_HOURS").ok().as_deref())?;

        Ok(Self::new(secret.into_bytes(), exp_hours))
    }

    pub fn encode(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = Duration::try_hours(self.exp_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| AppError::internal(format!("token lifetime of {} hours is out of range", self.exp_hours)))?;

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::internal(format!("failed to sign token: {err}")))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "rejected bearer token");
                AppError::forbidden("invalid or expired token")
            })
    }
}

/// Accepted `JWT_EXP_HOURS` range: one hour up to a year.
pub const EXP_HOURS_RANGE: std::ops::RangeInclusive<i64> = 1..=8760;
const DEFAULT_EXP_HOURS: i64 = 24;

/// Reads `JWT_EXP_HOURS`, defaulting to a day when unset.
pub fn parse_exp_hours(raw: Option<&str>) -> Result<i64, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(DEFAULT_EXP_HOURS);
    };

    match raw.parse::<i64>() {
        Ok(hours) if EXP_HOURS_RANGE.contains(&hours) => Ok(hours),
        _ => Err(AppError::configuration(format!(
            "JWT_EXP_HOURS must be a whole number between {} and {}",
            EXP_HOURS_RANGE.start(),
            EXP_HOURS_RANGE.end()
        ))),
    }
}

/// The role travels in the token, so a role change takes effect for that
/// account once its current token expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub exp: i64,
    pub iat: i64,
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Actor {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            first_name: claims.first_name,
            last_name: claims.last_name,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or_else(|| AppError::unauthorized("authorization header missing"))?;

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::forbidden("malformed authorization header"))?;

        let claims = state.jwt.decode(token)?;
        Ok(claims.into())
    }
}
