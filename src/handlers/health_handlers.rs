//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks store connectivity and disk I/O

use crate::{state::AppState, store::Store};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyCheck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Pings the active store backend (SQLite `SELECT 1`, or a no-op in demo
///    mode).
/// 2. Performs a best-effort write/read/delete against the uploads directory.
///
/// Returns JSON describing each check. HTTP 200 when all checks pass,
/// HTTP 503 when any check fails.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks: HashMap<&'static str, ReadyCheck> = HashMap::new();

    let store_check = match state.store.ping().await {
        Ok(()) => ReadyCheck {
            ok: true,
            detail: None,
        },
        Err(err) => ReadyCheck {
            ok: false,
            detail: Some(err.to_string()),
        },
    };
    checks.insert("store", store_check);

    let tmp_path = state
        .media
        .base_path()
        .join(format!(".readyz-{}", Uuid::new_v4()));
    let disk_check = match fs::write(&tmp_path, b"readyz").await {
        Ok(_) => match fs::read(&tmp_path).await {
            Ok(bytes) if bytes == b"readyz" => {
                let detail = fs::remove_file(&tmp_path)
                    .await
                    .err()
                    .map(|err| format!("cleanup failed: {err}"));
                ReadyCheck { ok: true, detail }
            }
            Ok(_) => ReadyCheck {
                ok: false,
                detail: Some("read back unexpected bytes".into()),
            },
            Err(err) => ReadyCheck {
                ok: false,
                detail: Some(format!("read failed: {err}")),
            },
        },
        Err(err) => ReadyCheck {
            ok: false,
            detail: Some(format!("write failed: {err}")),
        },
    };
    checks.insert("uploads_dir", disk_check);

    let all_ok = checks.values().all(|check| check.ok);
    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(checks))
}
