//! In-memory action store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::domain::{ActionRecord, ActionStore, AppError};

/// Records kept before terminal ones start being evicted
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// `(created_at, id)`, ascending
type OrderKey = (DateTime<Utc>, String);

/// Process-local store backed by a concurrent map.
///
/// Holds at most `max_records` records; past that the oldest terminal
/// records are evicted. Records still in flight are never evicted, so the
/// store can exceed its capacity while many actions are running.
#[derive(Debug)]
pub struct InMemoryActionStore {
    records: DashMap<String, ActionRecord>,
    /// Lock order: `order` before any `records` shard
    order: Mutex<BTreeSet<OrderKey>>,
    max_records: usize,
}

impl Default for InMemoryActionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_RECORDS)
    }
}

impl InMemoryActionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(max_records: usize) -> Self {
        Self {
            records: DashMap::new(),
            order: Mutex::new(BTreeSet::new()),
            max_records: max_records.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn order(&self) -> MutexGuard<'_, BTreeSet<OrderKey>> {
        self.order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop the oldest terminal records until the store fits its capacity
    fn evict(&self, order: &mut BTreeSet<OrderKey>) {
        let excess = self.records.len().saturating_sub(self.max_records);
        if excess == 0 {
            return;
        }

        let victims: Vec<OrderKey> = order
            .iter()
            .filter(|(_, id)| {
                self.records
                    .get(id)
                    .is_some_and(|record| record.stage.is_terminal())
            })
            .take(excess)
            .cloned()
            .collect();

        for key in &victims {
            order.remove(key);
            self.records.remove(&key.1);
        }
        debug!(evicted = victims.len(), "Evicted finished actions");
        if victims.len() < excess {
            warn!(
                records = self.records.len(),
                max_records = self.max_records,
                "Action store over capacity with actions still in flight"
            );
        }
    }
}

#[async_trait]
impl ActionStore for InMemoryActionStore {
    async fn insert(&self, record: ActionRecord) -> Result<(), AppError> {
        let mut order = self.order();
        if self.records.contains_key(&record.id) {
            return Err(AppError::Internal(format!(
                "Action {} already exists",
                record.id
            )));
        }
        order.insert((record.created_at, record.id.clone()));
        self.records.insert(record.id.clone(), record);
        self.evict(&mut order);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ActionRecord>, AppError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, record: &ActionRecord) -> Result<(), AppError> {
        match self.records.get_mut(&record.id) {
            Some(mut entry) => {
                // created_at keys the order index and must not move
                let created_at = entry.created_at;
                *entry = record.clone();
                entry.created_at = created_at;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Action {}", record.id))),
        }
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ActionRecord>, AppError> {
        let order = self.order();
        Ok(order
            .iter()
            .rev()
            .filter_map(|(_, id)| self.records.get(id).map(|entry| entry.value().clone()))
            .take(limit)
            .collect())
    }
}
