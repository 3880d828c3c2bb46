use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, MatchedPath},
    http::request::Parts,
};
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use super::{jwt::JwtKeys, repo::UserDirectory};
use crate::{error::ApiError, state::AppState, usage::gate::UsageSnapshot};

/// Authenticated caller, taken from a `Bearer` JWT whose subject still has an account.
pub struct AuthUser(pub Uuid);

pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    Arc<dyn UserDirectory>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::unauthorized(
                    "Authorization required",
                    "Please provide an Authorization header with Bearer token",
                )
            })?;

        let token = bearer_token(header).ok_or_else(|| {
            ApiError::unauthorized(
                "Invalid authorization format",
                "Authorization header must be: Bearer <token>",
            )
        })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            ApiError::unauthorized(
                "Invalid or expired token",
                "Please login again to get a new token",
            )
        })?;

        let users = <Arc<dyn UserDirectory>>::from_ref(state);
        if !users.exists(claims.sub).await? {
            warn!(user_id = %claims.sub, "token for missing user");
            return Err(ApiError::unauthorized(
                "User not found",
                "The user associated with this token no longer exists",
            ));
        }

        Ok(AuthUser(claims.sub))
    }
}

/// Authenticated caller whose call has been counted against the daily budget.
///
/// Extraction fails with 429 once the budget is spent; nothing is recorded then.
pub struct MeteredUser {
    pub user_id: Uuid,
    pub usage: UsageSnapshot,
}

#[async_trait]
impl FromRequestParts<AppState> for MeteredUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;

        let endpoint = parts
            .extensions
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_owned())
            .unwrap_or_else(|| parts.uri.path().to_owned());

        let gate = &state.usage;
        let decision = gate.authorize(user_id, &endpoint).await?;
        if !decision.allowed {
            return Err(ApiError::QuotaExceeded {
                used_today: decision.used_today,
                daily_limit: gate.daily_limit(),
            });
        }

        Ok(MeteredUser {
            user_id,
            usage: UsageSnapshot::new(decision.used_today, gate.daily_limit()),
        })
    }
}
