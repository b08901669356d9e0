//! Pin and user persistence behind a single polymorphic interface.
//!
//! Two backends implement [`Store`]: [`sqlite::SqliteStore`] for the durable
//! mode and [`memory::MemoryStore`] for the in-process demo mode used when
//! the database is unreachable at startup. The variant is chosen once, at
//! process start; it never switches mid-request.
//!
//! Both backends must agree exactly on the listing contract: which pins a
//! search term matches, the `created_at DESC, id DESC` ordering, and the
//! count semantics. Callers cannot tell which mode is active.

pub mod memory;
pub mod sqlite;

use crate::models::{
    pin::{Pin, PinChanges},
    user::User,
};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("pin `{0}` not found")]
    PinNotFound(Uuid),
    #[error("user `{0}` already exists")]
    EmailTaken(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl StoreError {
    /// Classify a sqlx failure: connection-level trouble surfaces as
    /// `Unavailable` so callers can treat it as retrievable, everything
    /// else passes through.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if matches!(
            err,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
        ) {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Sqlx(err)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Normalized feed filter: a trimmed, ASCII-lowercased search term, or no
/// filter at all when the raw input was empty/whitespace.
///
/// Matching is plain case-insensitive substring containment against title or
/// description — no word boundaries, no stemming. Case folding is ASCII-only
/// on both backends: SQLite's `LIKE` folds only ASCII letters, and
/// [`PinFilter::matches`] mirrors that so the two modes agree on every input.
#[derive(Debug, Clone, Default)]
pub struct PinFilter {
    term: Option<String>,
}

impl PinFilter {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self {
            term: (!trimmed.is_empty()).then(|| trimmed.to_ascii_lowercase()),
        }
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    /// The reference predicate. The in-memory backend applies it directly;
    /// the SQLite backend compiles it to an escaped `LIKE` and the parity
    /// tests hold the two to the same answers.
    pub fn matches(&self, pin: &Pin) -> bool {
        match &self.term {
            None => true,
            Some(term) => {
                pin.title.to_ascii_lowercase().contains(term.as_str())
                    || pin.description.to_ascii_lowercase().contains(term.as_str())
            }
        }
    }
}

/// Persistence contract shared by the durable and demo backends.
///
/// `find_pins` returns matches ordered by `created_at` descending with `id`
/// descending as the tie-break; `count_pins` counts the whole filtered set,
/// independent of any page window. Mutations are atomic per pin: a
/// concurrent read observes either the old or the new record, never a
/// half-applied update.
#[async_trait]
pub trait Store: Send + Sync {
    // Pins

    async fn find_pins(&self, filter: &PinFilter, skip: i64, limit: i64) -> StoreResult<Vec<Pin>>;

    async fn count_pins(&self, filter: &PinFilter) -> StoreResult<i64>;

    async fn get_pin(&self, id: Uuid) -> StoreResult<Pin>;

    async fn insert_pin(&self, pin: Pin) -> StoreResult<Pin>;

    async fn update_pin(&self, id: Uuid, changes: PinChanges) -> StoreResult<Pin>;

    /// Hard delete — no tombstone.
    async fn delete_pin(&self, id: Uuid) -> StoreResult<()>;

    /// All pins of one user, newest first (same order as the feed).
    async fn pins_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Pin>>;

    // Users

    async fn insert_user(&self, user: User) -> StoreResult<User>;

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    //! Durable/demo parity: both backends get identical seed data and must
    //! return identical pages, totals, and orderings for identical queries.

    use super::{memory::MemoryStore, sqlite::SqliteStore, PinFilter, Store};
    use crate::models::{pin::Pin, user::User};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn seed_user() -> User {
        User {
            id: Uuid::from_u128(1),
            username: "demo_user".into(),
            email: "demo@example.com".into(),
            password_hash: "x".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn seed_pins(owner: &User) -> Vec<Pin> {
        let mut pins = Vec::new();
        for i in 1..=13u32 {
            pins.push(Pin {
                id: Uuid::from_u128(100 + i as u128),
                title: format!("Pin {i}"),
                description: String::new(),
                image: format!("/uploads/aa/bb/{i}.jpg"),
                owner_id: owner.id,
                username: owner.username.clone(),
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, i).unwrap(),
            });
        }
        pins.push(Pin {
            id: Uuid::from_u128(200),
            title: "Sunset Beach".into(),
            description: String::new(),
            image: "/uploads/aa/bb/sunset.jpg".into(),
            owner_id: owner.id,
            username: owner.username.clone(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        });
        pins.push(Pin {
            id: Uuid::from_u128(201),
            title: "Mountain View".into(),
            description: "a beach trip, 100% worth it".into(),
            image: "/uploads/aa/bb/mountain.jpg".into(),
            owner_id: owner.id,
            username: owner.username.clone(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 1).unwrap(),
        });
        pins
    }

    async fn seeded_stores() -> (SqliteStore, MemoryStore) {
        let user = seed_user();
        let pins = seed_pins(&user);

        let durable = SqliteStore::open_in_memory().await.unwrap();
        durable.insert_user(user.clone()).await.unwrap();
        let demo = MemoryStore::new();
        demo.insert_user(user).await.unwrap();

        for pin in pins {
            durable.insert_pin(pin.clone()).await.unwrap();
            demo.insert_pin(pin).await.unwrap();
        }
        (durable, demo)
    }

    async fn page_of(
        store: &dyn Store,
        search: &str,
        skip: i64,
        limit: i64,
    ) -> (Vec<Uuid>, i64) {
        let filter = PinFilter::parse(search);
        let page = store.find_pins(&filter, skip, limit).await.unwrap();
        let total = store.count_pins(&filter).await.unwrap();
        (page.into_iter().map(|p| p.id).collect(), total)
    }

    #[tokio::test]
    async fn both_modes_return_identical_pages_and_totals() {
        let (durable, demo) = seeded_stores().await;

        let cases: &[(&str, i64, i64)] = &[
            ("", 0, 13),
            ("", 12, 13),
            ("", 100, 13),
            ("beach", 0, 12),
            ("BEACH", 0, 12),
            ("beachfront", 0, 12),
            ("pin 1", 0, 5),
            ("  pin 1  ", 0, 5),
            ("100%", 0, 12),
            ("_", 0, 12),
        ];

        for (search, skip, limit) in cases {
            let got_durable = page_of(&durable, search, *skip, *limit).await;
            let got_demo = page_of(&demo, search, *skip, *limit).await;
            assert_eq!(
                got_durable, got_demo,
                "modes diverged for search={search:?} skip={skip} limit={limit}"
            );
        }
    }

    #[tokio::test]
    async fn like_wildcards_match_literally_in_both_modes() {
        let (durable, demo) = seeded_stores().await;

        // "100%" appears verbatim in one description; "%" alone matches
        // nothing as a substring even though it is the LIKE wildcard.
        for store in [&durable as &dyn Store, &demo as &dyn Store] {
            let (ids, total) = page_of(store, "100%", 0, 12).await;
            assert_eq!(ids, vec![Uuid::from_u128(201)]);
            assert_eq!(total, 1);

            let (ids, total) = page_of(store, "%", 0, 12).await;
            assert!(ids.is_empty());
            assert_eq!(total, 0);
        }
    }

    #[tokio::test]
    async fn equal_timestamps_tie_break_by_id_descending_in_both_modes() {
        let user = seed_user();
        let stamp = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let twins: Vec<Pin> = [301u128, 300, 302]
            .iter()
            .map(|raw| Pin {
                id: Uuid::from_u128(*raw),
                title: format!("Twin {raw}"),
                description: String::new(),
                image: "/uploads/aa/bb/twin.jpg".into(),
                owner_id: user.id,
                username: user.username.clone(),
                created_at: stamp,
            })
            .collect();

        let durable = SqliteStore::open_in_memory().await.unwrap();
        durable.insert_user(user.clone()).await.unwrap();
        let demo = MemoryStore::new();
        demo.insert_user(user).await.unwrap();
        for pin in &twins {
            durable.insert_pin(pin.clone()).await.unwrap();
            demo.insert_pin(pin.clone()).await.unwrap();
        }

        let want = vec![
            Uuid::from_u128(302),
            Uuid::from_u128(301),
            Uuid::from_u128(300),
        ];
        for store in [&durable as &dyn Store, &demo as &dyn Store] {
            // Repeat the query: the order must also be stable across calls.
            for _ in 0..2 {
                let (ids, _) = page_of(store, "", 0, 10).await;
                assert_eq!(ids, want);
            }
        }
    }

    #[tokio::test]
    async fn deletions_are_visible_to_later_queries_in_both_modes() {
        let (durable, demo) = seeded_stores().await;
        let victim = Uuid::from_u128(113); // "Pin 13"

        for store in [&durable as &dyn Store, &demo as &dyn Store] {
            let (_, before) = page_of(store, "", 0, 50).await;
            store.delete_pin(victim).await.unwrap();
            let (ids, after) = page_of(store, "", 0, 50).await;
            assert_eq!(after, before - 1);
            assert!(!ids.contains(&victim));
        }
    }
}
