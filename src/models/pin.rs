//! Represents a pin — a user-created image post.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A shareable image post.
///
/// The `image` field is a reference (a `/uploads/...` path) to bytes stored
/// on disk; the record never embeds the payload itself. `created_at` is the
/// sole feed sort key, with `id` as the tie-breaker, so any two pins are
/// strictly ordered and pagination stays stable across calls.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    /// Internal UUID, assigned at creation, immutable.
    pub id: Uuid,

    /// Required, non-empty.
    pub title: String,

    /// Optional free text; empty string when absent.
    pub description: String,

    /// Public path to the stored image (e.g. `/uploads/ab/cd/....jpg`).
    pub image: String,

    /// Creating user; immutable after creation.
    pub owner_id: Uuid,

    /// Denormalized owner display name, attached at read time.
    pub username: String,

    /// Creation timestamp, immutable.
    pub created_at: DateTime<Utc>,
}

/// Owner-supplied partial update for a pin.
///
/// Absent fields are left untouched. `id`, `owner_id`, and `created_at`
/// can never change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl PinChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image.is_none()
    }
}
