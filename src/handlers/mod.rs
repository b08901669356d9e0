//! HTTP handlers, grouped by concern.

pub mod auth_handlers;
pub mod health_handlers;
pub mod media_handlers;
pub mod pin_handlers;
