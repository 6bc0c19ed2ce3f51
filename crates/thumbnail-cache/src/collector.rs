//! Shared state between generation workers and the flush loop of one round

use crate::item::ListItem;
use crate::ThumbnailKey;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A produced thumbnail waiting to be applied to its item
#[derive(Debug)]
pub struct PendingUpdate {
    pub item: Arc<ListItem>,
    pub thumbnail_path: Option<PathBuf>,
    pub key: ThumbnailKey,
    pub generation: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Results produced by workers but not yet applied
#[derive(Debug, Default)]
pub struct UpdateBuffer {
    pending: Mutex<Vec<PendingUpdate>>,
}

impl UpdateBuffer {
    pub fn push(&self, update: PendingUpdate) {
        self.pending.lock().push(update);
    }

    /// Take everything queued so far
    pub fn drain(&self) -> Vec<PendingUpdate> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn clear(&self) {
        self.pending.lock().clear();
    }
}

/// Cache keys that a worker is currently producing
#[derive(Debug, Default)]
pub struct InProgressSet {
    keys: Mutex<HashSet<ThumbnailKey>>,
}

impl InProgressSet {
    /// Claim `key` for the caller. `None` if another worker already holds it.
    pub fn try_claim(self: &Arc<Self>, key: &ThumbnailKey) -> Option<KeyClaim> {
        if !self.keys.lock().insert(key.clone()) {
            return None;
        }
        Some(KeyClaim {
            set: Arc::clone(self),
            key: key.clone(),
        })
    }

    pub fn contains(&self, key: &ThumbnailKey) -> bool {
        self.keys.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }

    pub fn clear(&self) {
        self.keys.lock().clear();
    }
}

/// Releases its key when dropped
#[derive(Debug)]
pub struct KeyClaim {
    set: Arc<InProgressSet>,
    key: ThumbnailKey,
}

impl Drop for KeyClaim {
    fn drop(&mut self) {
        self.set.keys.lock().remove(&self.key);
    }
}

/// Counts a unit as completed when dropped, whatever path it took out
pub struct CompletionGuard<'a> {
    completed: &'a AtomicUsize,
}

impl<'a> CompletionGuard<'a> {
    pub fn new(completed: &'a AtomicUsize) -> Self {
        Self { completed }
    }
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
    }
}
