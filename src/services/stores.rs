//! Today-store selection
//!
//! Admins pick which stores a group orders from today. Names are matched
//! fuzzily; ambiguous names are reported back, never guessed.

use crate::database::DatabaseService;
use crate::models::group::Group;
use crate::models::store::Store;
use crate::notify::{group_room, EventKind, NotificationQueue, ALL_ROOM};
use crate::services::matching::{match_by_name, Match};
use crate::utils::errors::{OrderBuddyError, Result};
use chrono::{NaiveDate, Utc};
use serde_json::json;

pub struct TodayStoreService {
    db: DatabaseService,
}

impl TodayStoreService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    async fn visible_stores(&self, group: &Group) -> Result<Vec<Store>> {
        self.db
            .stores
            .stores_for_group(group.group_code.as_deref())
            .await
    }

    fn enqueue_change(&self, queue: &mut NotificationQueue, group: &Group, stores: &[String]) {
        let payload = json!({
            "group_id": group.platform_group_id,
            "stores": stores,
        });
        queue.enqueue(
            EventKind::StoreChange,
            group_room(&group.platform_group_id),
            payload.clone(),
        );
        queue.enqueue(EventKind::StoreChange, ALL_ROOM, payload);
    }

    async fn current_names(&self, group: &Group) -> Result<Vec<String>> {
        let rows = self.db.today_stores.for_group(group.id, Self::today()).await?;
        Ok(rows.into_iter().map(|r| r.store_name).collect())
    }

    /// Replace today's selection with a single store
    pub async fn set_store(
        &self,
        group: &Group,
        name: &str,
        queue: &mut NotificationQueue,
    ) -> Result<String> {
        let stores = self.visible_stores(group).await?;
        match match_by_name(name, &stores, |s| s.name.as_str()) {
            Match::One(store) => {
                self.db
                    .today_stores
                    .replace(group.id, store.id, Self::today())
                    .await?;
                self.enqueue_change(queue, group, &[store.name.clone()]);
                Ok(format!("Today's store is now {}.", store.name))
            }
            Match::Ambiguous(hits) => Ok(ambiguous_reply(name, &hits)),
            Match::None => Err(OrderBuddyError::StoreNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Add a store to today's selection
    pub async fn add_store(
        &self,
        group: &Group,
        name: &str,
        queue: &mut NotificationQueue,
    ) -> Result<String> {
        let stores = self.visible_stores(group).await?;
        match match_by_name(name, &stores, |s| s.name.as_str()) {
            Match::One(store) => {
                self.db
                    .today_stores
                    .add(group.id, store.id, Self::today())
                    .await?;
                let names = self.current_names(group).await?;
                self.enqueue_change(queue, group, &names);
                Ok(format!(
                    "Added {}. Ordering from: {}.",
                    store.name,
                    names.join(", ")
                ))
            }
            Match::Ambiguous(hits) => Ok(ambiguous_reply(name, &hits)),
            Match::None => Err(OrderBuddyError::StoreNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Remove a store from today's selection. Matches against the
    /// selected stores, not the whole catalog.
    pub async fn remove_store(
        &self,
        group: &Group,
        name: &str,
        queue: &mut NotificationQueue,
    ) -> Result<String> {
        let selected = self.db.today_stores.for_group(group.id, Self::today()).await?;
        match match_by_name(name, &selected, |t| t.store_name.as_str()) {
            Match::One(entry) => {
                self.db
                    .today_stores
                    .remove(group.id, entry.store_id, Self::today())
                    .await?;
                let names = self.current_names(group).await?;
                self.enqueue_change(queue, group, &names);
                if names.is_empty() {
                    Ok(format!("Removed {}. No store selected.", entry.store_name))
                } else {
                    Ok(format!(
                        "Removed {}. Ordering from: {}.",
                        entry.store_name,
                        names.join(", ")
                    ))
                }
            }
            Match::Ambiguous(hits) => {
                let names: Vec<String> = hits.into_iter().map(|t| t.store_name).collect();
                Ok(format!(
                    "Which one did you mean: {}?",
                    names.join(", ")
                ))
            }
            Match::None => Err(OrderBuddyError::StoreNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Drop the whole selection for today
    pub async fn clear_stores(
        &self,
        group: &Group,
        queue: &mut NotificationQueue,
    ) -> Result<String> {
        let removed = self.db.today_stores.clear(group.id, Self::today()).await?;
        if removed == 0 {
            return Ok("No store was selected for today.".to_string());
        }
        self.enqueue_change(queue, group, &[]);
        Ok("Today's store selection was cleared.".to_string())
    }

    /// Store ids selected for today, used when opening a session
    pub async fn today_store_ids(&self, group: &Group) -> Result<Vec<uuid::Uuid>> {
        let rows = self.db.today_stores.for_group(group.id, Self::today()).await?;
        Ok(rows.into_iter().map(|r| r.store_id).collect())
    }
}

fn ambiguous_reply(query: &str, hits: &[Store]) -> String {
    let names: Vec<&str> = hits.iter().map(|s| s.name.as_str()).collect();
    format!("Several stores match \"{}\": {}.", query, names.join(", "))
}
