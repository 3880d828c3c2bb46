use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::{
    dto::{CredentialsRequest, LoginResponse, MeResponse, RegisterResponse},
    extractors::AuthUser,
    jwt::JwtKeys,
    password::{hash_password, verify_password, MIN_PASSWORD_LEN},
    repo::User,
};
use crate::{error::ApiError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() {
        return Err(ApiError::bad_request("Email required", "Please provide an email address"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::bad_request("Invalid email", "The email address is not valid"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(
            "Invalid password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::conflict(
            "Email already registered",
            "An account with this email already exists. Please login instead.",
        ));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.email, &hash).await?;
    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            status: "success",
            message: "Account created successfully",
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request(
            "Credentials required",
            "Please provide email and password",
        ));
    }

    let invalid = || ApiError::unauthorized("Invalid credentials", "Email or password is incorrect");

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(invalid());
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    let usage = state.usage.snapshot(user.id).await?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        status: "success",
        message: "Login successful",
        user: user.into(),
        token,
        usage,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let Some(user) = User::find_by_id(&state.db, user_id).await? else {
        warn!(%user_id, "token for missing user");
        return Err(ApiError::unauthorized(
            "User not found",
            "The user associated with this token no longer exists",
        ));
    };
    let usage = state.usage.snapshot(user_id).await?;
    Ok(Json(MeResponse {
        user: user.into(),
        usage,
    }))
}
