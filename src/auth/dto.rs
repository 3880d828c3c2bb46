use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::User;
use crate::usage::gate::UsageSnapshot;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub user: PublicUser,
    pub token: String,
    pub usage: UsageSnapshot,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: PublicUser,
    pub usage: UsageSnapshot,
}
