//! Feed queries: search + pagination over pins.
//!
//! One implementation serves both the main listing (`GET /api/pins`) and the
//! history feed (`GET /api/history`), so the two call sites can never drift
//! on ordering or page-boundary behavior. Works identically over the durable
//! and demo store modes.

use crate::models::pin::Pin;
use crate::store::{PinFilter, Store, StoreResult};
use std::sync::Arc;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 12;
/// The history feed is the newest pins, one fixed-size page.
pub const HISTORY_PAGE_SIZE: i64 = 20;

/// One page of feed results.
#[derive(Debug)]
pub struct FeedPage {
    pub items: Vec<Pin>,
    /// Count of the whole filtered set, not just this page.
    pub total: i64,
    pub has_more: bool,
}

#[derive(Clone)]
pub struct FeedQueryService {
    store: Arc<dyn Store>,
}

impl FeedQueryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Run one feed query.
    ///
    /// `search` is trimmed; empty means no filter. Non-positive `page` or
    /// `page_size` are clamped to the defaults rather than rejected. The
    /// store is asked for `page_size + 1` records so `has_more` comes from a
    /// peek-ahead instead of a second range query; the extra record is
    /// trimmed off before returning. `total` counts the entire filtered set
    /// and is fetched independently of the page window.
    pub async fn query(&self, search: &str, page: i64, page_size: i64) -> StoreResult<FeedPage> {
        let page = if page < 1 { DEFAULT_PAGE } else { page };
        let page_size = if page_size < 1 { DEFAULT_PAGE_SIZE } else { page_size };

        let filter = PinFilter::parse(search);
        let skip = (page - 1).saturating_mul(page_size);
        let fetch_limit = page_size.saturating_add(1);

        let mut items = self.store.find_pins(&filter, skip, fetch_limit).await?;
        let has_more = items.len() as i64 == fetch_limit;
        if has_more {
            items.truncate(page_size as usize);
        }
        let total = self.store.count_pins(&filter).await?;

        Ok(FeedPage {
            items,
            total,
            has_more,
        })
    }

    /// The 20 most recent pins, unfiltered.
    pub async fn history(&self) -> StoreResult<Vec<Pin>> {
        Ok(self
            .query("", DEFAULT_PAGE, HISTORY_PAGE_SIZE)
            .await?
            .items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pin::Pin;
    use crate::store::memory::MemoryStore;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn pin(index: u32, title: &str, description: &str) -> Pin {
        Pin {
            id: Uuid::from_u128(index as u128),
            title: title.into(),
            description: description.into(),
            image: format!("/uploads/aa/bb/{index}.jpg"),
            owner_id: Uuid::from_u128(1),
            username: "demo_user".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, index).unwrap(),
        }
    }

    async fn service_with(pins: Vec<Pin>) -> FeedQueryService {
        let store = MemoryStore::new();
        for p in pins {
            store.insert_pin(p).await.unwrap();
        }
        FeedQueryService::new(Arc::new(store))
    }

    fn titles(page: &FeedPage) -> Vec<&str> {
        page.items.iter().map(|p| p.title.as_str()).collect()
    }

    async fn thirteen_pins() -> FeedQueryService {
        let pins = (1..=13).map(|i| pin(i, &format!("Pin {i}"), "")).collect();
        service_with(pins).await
    }

    #[tokio::test]
    async fn thirteen_pins_paginate_across_two_pages() {
        let feed = thirteen_pins().await;

        let first = feed.query("", 1, 12).await.unwrap();
        let want: Vec<String> = (2..=13).rev().map(|i| format!("Pin {i}")).collect();
        assert_eq!(titles(&first), want.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(first.total, 13);
        assert!(first.has_more);

        let second = feed.query("", 2, 12).await.unwrap();
        assert_eq!(titles(&second), vec!["Pin 1"]);
        assert_eq!(second.total, 13);
        assert!(!second.has_more);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_with_correct_total() {
        let feed = thirteen_pins().await;

        let page = feed.query("", 5, 12).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 13);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn oversized_page_returns_everything_without_more() {
        let feed = thirteen_pins().await;

        let page = feed.query("", 1, 100).await.unwrap();
        assert_eq!(page.items.len(), 13);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn non_positive_parameters_clamp_to_defaults() {
        let feed = thirteen_pins().await;

        let clamped = feed.query("", 0, -3).await.unwrap();
        let default = feed.query("", DEFAULT_PAGE, DEFAULT_PAGE_SIZE).await.unwrap();
        let ids = |p: &FeedPage| p.items.iter().map(|x| x.id).collect::<Vec<_>>();
        assert_eq!(ids(&clamped), ids(&default));
        assert_eq!(clamped.total, default.total);
        assert_eq!(clamped.has_more, default.has_more);
    }

    #[tokio::test]
    async fn search_matches_title_or_description_and_nothing_else() {
        let feed = service_with(vec![
            pin(1, "Sunset Beach", ""),
            pin(2, "Mountain View", "a beach trip"),
            pin(3, "City Lights", ""),
        ])
        .await;

        for needle in ["beach", "BEACH"] {
            let page = feed.query(needle, 1, 12).await.unwrap();
            let mut got = titles(&page);
            got.sort_unstable();
            assert_eq!(got, vec!["Mountain View", "Sunset Beach"], "needle {needle:?}");
            assert_eq!(page.total, 2);
        }

        let none = feed.query("beachfront", 1, 12).await.unwrap();
        assert!(none.items.is_empty());
        assert_eq!(none.total, 0);
        assert!(!none.has_more);
    }

    #[tokio::test]
    async fn every_result_contains_the_needle() {
        let feed = service_with(
            (1..=30)
                .map(|i| {
                    if i % 3 == 0 {
                        pin(i, &format!("Travel photo {i}"), "")
                    } else {
                        pin(i, &format!("Pin {i}"), "notes")
                    }
                })
                .collect(),
        )
        .await;

        let page = feed.query("travel", 1, 5).await.unwrap();
        assert!(!page.items.is_empty());
        for item in &page.items {
            let haystack = format!("{} {}", item.title, item.description).to_ascii_lowercase();
            assert!(haystack.contains("travel"), "stray item {:?}", item.title);
        }
    }

    #[tokio::test]
    async fn summed_page_lengths_equal_total() {
        let feed = service_with((1..=23).map(|i| pin(i, &format!("Pin {i}"), "")).collect()).await;

        let mut seen = 0;
        let mut page_no = 1;
        loop {
            let page = feed.query("", page_no, 5).await.unwrap();
            seen += page.items.len() as i64;
            assert_eq!(page.total, 23);
            // has_more is true exactly when records remain past this page.
            assert_eq!(page.has_more, page_no * 5 < 23);
            if !page.has_more {
                break;
            }
            page_no += 1;
        }
        assert_eq!(seen, 23);
    }

    #[tokio::test]
    async fn history_returns_twenty_newest() {
        let feed = service_with((1..=25).map(|i| pin(i, &format!("Pin {i}"), "")).collect()).await;

        let history = feed.history().await.unwrap();
        assert_eq!(history.len(), HISTORY_PAGE_SIZE as usize);
        assert_eq!(history.first().map(|p| p.title.as_str()), Some("Pin 25"));
        assert_eq!(history.last().map(|p| p.title.as_str()), Some("Pin 6"));
    }

    #[tokio::test]
    async fn deleting_a_pin_decrements_total_by_one() {
        let store = Arc::new(MemoryStore::new());
        for i in 1..=13 {
            store.insert_pin(pin(i, &format!("Pin {i}"), "")).await.unwrap();
        }
        let feed = FeedQueryService::new(store.clone());

        let before = feed.query("", 1, 12).await.unwrap();
        store.delete_pin(Uuid::from_u128(13)).await.unwrap();
        let after = feed.query("", 1, 12).await.unwrap();

        assert_eq!(after.total, before.total - 1);
        assert!(after.items.iter().all(|p| p.id != Uuid::from_u128(13)));
    }
}
