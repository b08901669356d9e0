//! In-process demo-mode [`Store`] backend.
//!
//! Used when the database is unreachable at startup. Everything lives in two
//! ordered lists behind RwLocks; data resets on restart, which is the
//! documented contract of demo mode, not a durability bug. Filtering,
//! ordering, and counting follow the exact rules of the SQLite backend so
//! clients cannot tell which mode is active.

use super::{PinFilter, Store, StoreError, StoreResult};
use crate::models::{
    pin::{Pin, PinChanges},
    user::User,
};
use async_trait::async_trait;
use std::cmp::Ordering;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    pins: RwLock<Vec<Pin>>,
    users: RwLock<Vec<User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Feed order: `created_at` descending, `id` descending on ties. `id`
/// comparison is bytewise, matching SQLite's memcmp over the BLOB column.
fn feed_order(a: &Pin, b: &Pin) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_pins(&self, filter: &PinFilter, skip: i64, limit: i64) -> StoreResult<Vec<Pin>> {
        let pins = self.pins.read().await;
        let mut matches: Vec<Pin> = pins.iter().filter(|p| filter.matches(p)).cloned().collect();
        matches.sort_by(feed_order);
        Ok(matches
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_pins(&self, filter: &PinFilter) -> StoreResult<i64> {
        let pins = self.pins.read().await;
        Ok(pins.iter().filter(|p| filter.matches(p)).count() as i64)
    }

    async fn get_pin(&self, id: Uuid) -> StoreResult<Pin> {
        let pins = self.pins.read().await;
        pins.iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StoreError::PinNotFound(id))
    }

    async fn insert_pin(&self, pin: Pin) -> StoreResult<Pin> {
        let mut pins = self.pins.write().await;
        pins.push(pin.clone());
        Ok(pin)
    }

    async fn update_pin(&self, id: Uuid, changes: PinChanges) -> StoreResult<Pin> {
        // The whole record is replaced under the write lock, so readers see
        // the old or the new pin, never a mix.
        let mut pins = self.pins.write().await;
        let pin = pins
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::PinNotFound(id))?;
        if let Some(title) = changes.title {
            pin.title = title;
        }
        if let Some(description) = changes.description {
            pin.description = description;
        }
        if let Some(image) = changes.image {
            pin.image = image;
        }
        Ok(pin.clone())
    }

    async fn delete_pin(&self, id: Uuid) -> StoreResult<()> {
        let mut pins = self.pins.write().await;
        let before = pins.len();
        pins.retain(|p| p.id != id);
        if pins.len() == before {
            return Err(StoreError::PinNotFound(id));
        }
        Ok(())
    }

    async fn pins_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Pin>> {
        let pins = self.pins.read().await;
        let mut mine: Vec<Pin> = pins.iter().filter(|p| p.owner_id == owner_id).cloned().collect();
        mine.sort_by(feed_order);
        Ok(mine)
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::EmailTaken(user.email));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pin(title: &str, description: &str, second: u32) -> Pin {
        Pin {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            image: "/uploads/aa/bb/p.jpg".into(),
            owner_id: Uuid::from_u128(1),
            username: "demo_user".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).unwrap(),
        }
    }

    #[tokio::test]
    async fn search_matches_title_or_description_case_insensitively() {
        let store = MemoryStore::new();
        store
            .insert_pin(pin("Sunset Beach", "", 0))
            .await
            .unwrap();
        store
            .insert_pin(pin("Mountain View", "a beach trip", 1))
            .await
            .unwrap();

        for needle in ["beach", "BEACH"] {
            let filter = PinFilter::parse(needle);
            let found = store.find_pins(&filter, 0, 10).await.unwrap();
            assert_eq!(found.len(), 2, "needle {needle:?}");
            assert_eq!(store.count_pins(&filter).await.unwrap(), 2);
        }

        let filter = PinFilter::parse("beachfront");
        assert!(store.find_pins(&filter, 0, 10).await.unwrap().is_empty());
        assert_eq!(store.count_pins(&filter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn edits_are_visible_to_subsequent_queries() {
        let store = MemoryStore::new();
        let stored = store.insert_pin(pin("Before", "", 0)).await.unwrap();

        store
            .update_pin(
                stored.id,
                PinChanges {
                    title: Some("After".into()),
                    ..PinChanges::default()
                },
            )
            .await
            .unwrap();

        let found = store
            .find_pins(&PinFilter::parse("after"), 0, 10)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(store
            .find_pins(&PinFilter::parse("before"), 0, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delete_of_missing_pin_is_an_error() {
        let store = MemoryStore::new();
        let err = store.delete_pin(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::PinNotFound(_)));
    }
}
