use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::config::STATUS_CHANNEL_CAPACITY;
use crate::types::AlertKind;

/// Published whenever a cached status changes. `armed: None` means the entry
/// was invalidated and the next reader must re-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub kind: AlertKind,
    pub item_id: Uuid,
    pub armed: Option<bool>,
}

#[derive(Debug, Clone, Copy)]
struct CachedStatus {
    armed: Option<bool>,
    /// Global version of the last write that was a confirmed mutation or invalidation.
    version: u64,
}

/// Process-wide armed/unarmed state keyed by `(kind, item_id)`.
///
/// Entries live until `clear` or `retain_items`; long-running front ends
/// prune to the items they still display.
///
/// Every toggle button and list page for the same item reads and writes the
/// same entry, so a change made in one place is visible everywhere.
///
/// Writes come in two strengths:
/// - `confirm` / `invalidate`: the result of a successful mutation. Always
///   wins and bumps the entry's version.
/// - `record_check`: the answer to an existence check. Applied only if no
///   mutation landed on the entry since the check was issued.
pub struct StatusCache {
    entries: DashMap<(AlertKind, Uuid), CachedStatus>,
    /// Version every absent entry implicitly carries; raised by `clear`.
    floor: AtomicU64,
    clock: AtomicU64,
    tx: broadcast::Sender<StatusChange>,
}

impl StatusCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn publish(&self, change: StatusChange) {
        // No subscribers is fine.
        let _ = self.tx.send(change);
    }

    pub fn get(&self, kind: AlertKind, item_id: Uuid) -> Option<bool> {
        self.entries.get(&(kind, item_id)).and_then(|e| e.armed)
    }

    /// Version to hand back to `record_check` when the check's answer arrives.
    pub fn version(&self, kind: AlertKind, item_id: Uuid) -> u64 {
        self.entries
            .get(&(kind, item_id))
            .map(|e| e.version)
            .unwrap_or_else(|| self.floor.load(Ordering::Acquire))
    }

    /// Store an existence-check answer. Returns false (and stores nothing)
    /// when a mutation or invalidation happened after `seen_version` was read.
    pub fn record_check(&self, kind: AlertKind, item_id: Uuid, armed: bool, seen_version: u64) -> bool {
        let floor = self.floor.load(Ordering::Acquire);
        let mut entry = self
            .entries
            .entry((kind, item_id))
            .or_insert(CachedStatus { armed: None, version: floor });
        if entry.version != seen_version {
            debug!(%kind, %item_id, "Discarding stale status check");
            return false;
        }
        let changed = entry.armed != Some(armed);
        entry.armed = Some(armed);
        drop(entry);

        if changed {
            self.publish(StatusChange { kind, item_id, armed: Some(armed) });
        }
        true
    }

    /// Store the outcome of a successful mutation.
    pub fn confirm(&self, kind: AlertKind, item_id: Uuid, armed: bool) {
        let version = self.tick();
        self.entries.insert((kind, item_id), CachedStatus { armed: Some(armed), version });
        self.publish(StatusChange { kind, item_id, armed: Some(armed) });
    }

    pub fn invalidate(&self, kind: AlertKind, item_id: Uuid) {
        let version = self.tick();
        self.entries.insert((kind, item_id), CachedStatus { armed: None, version });
        self.publish(StatusChange { kind, item_id, armed: None });
    }

    /// Invalidate every kind cached for one item.
    pub fn invalidate_item(&self, item_id: Uuid) {
        let kinds: Vec<AlertKind> = self
            .entries
            .iter()
            .filter(|e| e.key().1 == item_id)
            .map(|e| e.key().0)
            .collect();
        for kind in kinds {
            self.invalidate(kind, item_id);
        }
    }

    /// Drop everything, e.g. when the signed-in user changes. Checks issued
    /// before the clear can no longer land.
    pub fn clear(&self) {
        let keys: Vec<(AlertKind, Uuid)> = self.entries.iter().map(|e| *e.key()).collect();
        self.floor.store(self.tick(), Ordering::Release);
        self.entries.clear();
        for (kind, item_id) in keys {
            self.publish(StatusChange { kind, item_id, armed: None });
        }
    }

    /// Drop entries for items `keep` rejects. The floor is raised past every
    /// dropped version so checks issued before the prune cannot land.
    pub fn retain_items(&self, keep: impl Fn(Uuid) -> bool) -> usize {
        let mut dropped = 0;
        let mut highest = 0;
        self.entries.retain(|&(_, item_id), status| {
            if keep(item_id) {
                return true;
            }
            dropped += 1;
            highest = highest.max(status.version);
            false
        });
        if dropped > 0 {
            self.floor.fetch_max(highest, Ordering::AcqRel);
            debug!(dropped, "Pruned status cache");
        }
        dropped
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            entries: DashMap::new(),
            floor: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            tx,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
