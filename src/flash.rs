use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::models::Flash;

/// FlashStore
///
/// Per-principal queue of one-time status messages. A handler pushes a
/// message before redirecting; the next list view drains it.
#[derive(Debug, Default)]
pub struct FlashStore {
    queues: Mutex<HashMap<i32, Vec<Flash>>>,
}

/// Pending messages kept per principal; older ones are dropped first.
pub const MAX_PENDING: usize = 20;

/// FlashState
///
/// The shared handle stored in `AppState`.
pub type FlashState = Arc<FlashStore>;

impl FlashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, principal: i32, flash: Flash) {
        let mut queues = self.queues.lock().unwrap_or_else(|p| p.into_inner());
        let queue = queues.entry(principal).or_default();
        queue.push(flash);
        if queue.len() > MAX_PENDING {
            let excess = queue.len() - MAX_PENDING;
            queue.drain(..excess);
        }
    }

    /// Removes and returns every pending message for `principal`, oldest first.
    pub fn drain(&self, principal: i32) -> Vec<Flash> {
        let mut queues = self.queues.lock().unwrap_or_else(|p| p.into_inner());
        queues.remove(&principal).unwrap_or_default()
    }
}
