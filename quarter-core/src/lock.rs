//! Per-slot mutual exclusion around check-then-write sequences.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::repository::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub provider_id: Uuid,
    pub slot_time: DateTime<Utc>,
}

impl SlotKey {
    pub fn new(provider_id: Uuid, slot_time: DateTime<Utc>) -> Self {
        Self {
            provider_id,
            slot_time,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_id, self.slot_time.timestamp())
    }
}

/// Held lock on a slot. Dropping it releases the lock.
pub struct SlotGuard {
    _inner: Box<dyn Send>,
}

impl SlotGuard {
    pub fn new<G: Send + 'static>(inner: G) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

impl fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SlotGuard")
    }
}

#[async_trait]
pub trait SlotLocks: Send + Sync {
    /// Wait until the slot is free and take it.
    async fn acquire(&self, key: SlotKey) -> StoreResult<SlotGuard>;
}

/// Keyed async mutexes, good for a single process.
#[derive(Default)]
pub struct InProcessSlotLocks {
    slots: Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>,
}

impl InProcessSlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SlotLocks for InProcessSlotLocks {
    async fn acquire(&self, key: SlotKey) -> StoreResult<SlotGuard> {
        let slot = {
            let mut slots = self.slots.lock().map_err(|_| "slot lock table poisoned")?;
            // Entries nobody else holds or waits on can go.
            slots.retain(|k, m| *k == key || Arc::strong_count(m) > 1);
            slots.entry(key).or_default().clone()
        };
        let guard = slot.lock_owned().await;
        Ok(SlotGuard::new(guard))
    }
}
