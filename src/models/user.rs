//! Represents a registered user account.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A registered account. The password hash never leaves the store layer;
/// handlers expose [`PublicUser`] instead.
#[derive(Clone, FromRow, Debug)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Unique across the store.
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The subset of a user that is safe to return to clients.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}
