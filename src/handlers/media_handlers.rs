//! Upload and serving of image payloads.
//! Streams image bodies to and from disk and delegates storage concerns to
//! `MediaStore`.

use crate::{errors::AppError, state::AppState};
use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::Serialize;
use serde_json::json;
use std::io;
use tokio_util::io::ReaderStream;

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub url: String,
    pub size: i64,
}

/// `POST /api/upload/image` — store a standalone image and return its URL.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let original_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let stream =
            field.map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));
        let stored = state
            .media
            .save_stream(original_name.as_deref(), content_type.as_deref(), stream)
            .await?;

        return Ok(Json(json!({
            "message": "file uploaded",
            "file": UploadedFile {
                filename: stored.filename,
                url: stored.url,
                size: stored.size_bytes,
            }
        })));
    }

    Err(AppError::bad_request("no file uploaded"))
}

/// `GET /uploads/{*path}` — stream a stored image back to the client.
pub async fn get_upload(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (file, content_type, len) = state.media.open(&path).await?;

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&len.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    Ok(response)
}
