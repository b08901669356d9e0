//! Core data models for the pinboard service.
//!
//! These entities represent users and the pins they share. They map cleanly
//! to database tables via `sqlx::FromRow` and serialize naturally as JSON
//! via `serde`.

pub mod pin;
pub mod user;
