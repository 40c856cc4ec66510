// libs/appointment-cell/src/services/locks.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::SlotTime;

type SlotKey = (NaiveDate, SlotTime);

/// Per-slot async mutexes serializing check-then-insert within this process.
#[derive(Default)]
pub struct SlotLocks {
    slots: Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder has `(date, time)`.
    pub async fn acquire(&self, date: NaiveDate, time: SlotTime) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries nobody holds or waits on only have the map's reference.
            slots.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(slots.entry((date, time)).or_default())
        };
        slot.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }
}
