//! Shared application state handed to every handler.

use crate::services::{auth::AuthService, feed::FeedQueryService, media::MediaStore};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// The store backend picked at startup: SQLite, or the in-memory demo
    /// fallback when the database was unreachable. Fixed for the process
    /// lifetime.
    pub store: Arc<dyn Store>,
    pub feed: FeedQueryService,
    pub media: MediaStore,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, media: MediaStore, auth: AuthService) -> Self {
        Self {
            feed: FeedQueryService::new(store.clone()),
            store,
            media,
            auth,
        }
    }
}
