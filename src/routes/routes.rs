//! Defines routes for all pinboard endpoints.
//!
//! ## Structure
//! - **Public endpoints**
//!   - `GET    /healthz` — liveness
//!   - `GET    /readyz` — readiness (store + uploads dir)
//!   - `POST   /api/register` — create an account
//!   - `POST   /api/login` — exchange credentials for a bearer token
//!   - `GET    /api/pins` — feed listing (supports search, page, limit)
//!   - `GET    /api/pins/user/{user_id}` — one user's pins
//!   - `GET    /api/history` — 20 most recent pins
//!   - `GET    /uploads/{*path}` — stored image bytes
//!
//! - **Authenticated endpoints** (bearer token required)
//!   - `POST   /api/pins` — create a pin (multipart with image)
//!   - `PUT    /api/pins/{id}` — owner-only edit
//!   - `DELETE /api/pins/{id}` — owner-only delete
//!   - `POST   /api/upload/image` — standalone image upload
//!
//! The wildcard `*path` allows sharded upload paths like `3f/a1/img.jpg`.

use crate::{
    handlers::{
        auth_handlers::{login, register},
        health_handlers::{healthz, readyz},
        media_handlers::{get_upload, upload_image},
        pin_handlers::{create_pin, delete_pin, history, list_pins, update_pin, user_pins},
    },
    services::auth::require_auth,
    state::AppState,
};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

/// Build and return the router for all pinboard routes.
///
/// Public and authenticated routes are built separately so the auth
/// middleware wraps exactly the mutating endpoints, then merged into one
/// `Router` carrying the shared [`AppState`].
pub fn routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/pins", get(list_pins))
        .route("/api/pins/user/{user_id}", get(user_pins))
        .route("/api/history", get(history))
        .route("/uploads/{*path}", get(get_upload));

    let protected = Router::new()
        .route("/api/pins", post(create_pin))
        .route("/api/pins/{id}", put(update_pin).delete(delete_pin))
        .route("/api/upload/image", post(upload_image))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    public.merge(protected).with_state(state)
}
