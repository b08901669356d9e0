//! Pin CRUD, the paginated feed, and the history listing.
//!
//! The feed and history endpoints both go through `FeedQueryService` so
//! they can never disagree on ordering or page boundaries.

use crate::{
    errors::AppError,
    models::pin::{Pin, PinChanges},
    services::auth::Claims,
    services::feed::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE},
    state::AppState,
    store::Store,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::io;
use uuid::Uuid;

/// Query params accepted by the feed listing.
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub pins: Vec<Pin>,
    pub total: i64,
    pub has_more: bool,
}

/// `GET /api/pins?search=&page=&limit=` — paginated, searchable feed.
pub async fn list_pins(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedResponse>, AppError> {
    let page = state
        .feed
        .query(
            params.search.as_deref().unwrap_or(""),
            params.page.unwrap_or(DEFAULT_PAGE),
            params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    Ok(Json(FeedResponse {
        pins: page.items,
        total: page.total,
        has_more: page.has_more,
    }))
}

/// `POST /api/pins` — create a pin from a multipart form with `title`,
/// optional `description`, and an `image` file.
pub async fn create_pin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut title = String::new();
    let mut description = String::new();
    let mut image: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("title") => title = field.text().await?,
            Some("description") => description = field.text().await?,
            Some("image") => {
                let original_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let stream = field
                    .map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));
                let stored = state
                    .media
                    .save_stream(original_name.as_deref(), content_type.as_deref(), stream)
                    .await?;
                image = Some(stored.url);
            }
            _ => {}
        }
    }

    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    let image = image.ok_or_else(|| AppError::bad_request("image file is required"))?;

    let pin = state
        .store
        .insert_pin(Pin {
            id: Uuid::new_v4(),
            title,
            description,
            image,
            owner_id: claims.sub,
            username: claims.username.clone(),
            created_at: Utc::now(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(pin)))
}

/// `GET /api/pins/user/{user_id}` — all pins of one user, newest first.
pub async fn user_pins(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Pin>>, AppError> {
    Ok(Json(state.store.pins_by_owner(user_id).await?))
}

/// `PUT /api/pins/{id}` — owner-only partial update of title/description/image.
pub async fn update_pin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(changes): Json<PinChanges>,
) -> Result<Json<Pin>, AppError> {
    let existing = state.store.get_pin(id).await?;
    if existing.owner_id != claims.sub {
        return Err(AppError::new(StatusCode::UNAUTHORIZED, "not authorized"));
    }

    if let Some(title) = &changes.title {
        if title.trim().is_empty() {
            return Err(AppError::bad_request("title cannot be empty"));
        }
    }
    if changes.is_empty() {
        return Ok(Json(existing));
    }

    Ok(Json(state.store.update_pin(id, changes).await?))
}

/// `DELETE /api/pins/{id}` — owner-only hard delete.
pub async fn delete_pin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let existing = state.store.get_pin(id).await?;
    if existing.owner_id != claims.sub {
        return Err(AppError::new(StatusCode::UNAUTHORIZED, "not authorized"));
    }

    state.store.delete_pin(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/history` — the 20 most recent pins.
pub async fn history(State(state): State<AppState>) -> Result<Json<Vec<Pin>>, AppError> {
    Ok(Json(state.feed.history().await?))
}
