/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The worker registry: the single piece of shared, mutable allocation
//! state in the whole system.
//!
//! Active flag, allocations, and running set, guarded by one global RW
//! lock; `assignTo` and `onCompletion` hold the write lock for the entire
//! allocate/release critical section. This module is that lock plus the
//! map it guards — the telemetry adapter and the queue processor both
//! hold a reference to the same [`WorkerRegistry`] instance rather than
//! each keeping a copy.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::task::ResourceAmounts;
use crate::worker::Worker;

pub struct WorkerRegistry {
    workers: RwLock<HashMap<String, Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        WorkerRegistry {
            workers: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Worker>> {
        self.workers.read().expect("worker registry lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Worker>> {
        self.workers.write().expect("worker registry lock poisoned")
    }

    /// Register a new worker, or replace an existing entry with the same
    /// id (re-registration after a restart).
    pub fn register(&self, worker: Worker) {
        self.write().insert(worker.id.clone(), worker);
    }

    pub fn set_active(&self, worker_id: &str, active: bool) {
        if let Some(w) = self.write().get_mut(worker_id) {
            w.active = active;
        }
    }

    pub fn touch_heartbeat(&self, worker_id: &str, at: chrono::DateTime<chrono::Utc>) {
        if let Some(w) = self.write().get_mut(worker_id) {
            w.last_heartbeat = Some(at);
        }
    }

    pub fn get_clone(&self, worker_id: &str) -> Option<Worker> {
        self.read().get(worker_id).cloned()
    }

    pub fn list_clone(&self) -> Vec<Worker> {
        self.read().values().cloned().collect()
    }

    pub fn list_active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .read()
            .values()
            .filter(|w| w.active)
            .map(|w| w.id.clone())
            .collect();
        ids.sort(); // stable iteration order for fallback round-robin tie-break
        ids
    }

    /// Re-verify feasibility under the write lock and, if it still holds,
    /// reserve `amount` for `task_id` atomically. Returns `true` iff
    /// reserved. Availability may have changed between selection and
    /// dispatch, so this recheck is not redundant with the scheduler's own
    /// filter.
    pub fn try_reserve(&self, worker_id: &str, task_id: &str, amount: &ResourceAmounts) -> bool {
        let mut map = self.write();
        match map.get_mut(worker_id) {
            Some(w) if amount.fits_within(&w.available()) => {
                w.reserve(task_id, amount);
                true
            }
            _ => false,
        }
    }

    /// Release `amount` reserved for `task_id` on `worker_id`. Returns
    /// `None` if the worker is unknown, otherwise whether the release
    /// underflowed (and was clamped).
    pub fn release(&self, worker_id: &str, task_id: &str, amount: &ResourceAmounts) -> Option<bool> {
        self.write()
            .get_mut(worker_id)
            .map(|w| w.release(task_id, amount))
    }

    pub fn reconcile(&self, worker_id: &str, running: &[(String, ResourceAmounts)]) {
        if let Some(w) = self.write().get_mut(worker_id) {
            w.reconcile_from(running);
        }
    }

    /// Find the worker whose `running` set currently contains `task_id`,
    /// consulting in-memory state first (the cheaper source before falling
    /// back to the persistent store).
    pub fn find_owning_worker(&self, task_id: &str) -> Option<String> {
        self.read()
            .values()
            .find(|w| w.running.contains(task_id))
            .map(|w| w.id.clone())
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
