/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Worker registry entry and the ephemeral view the scheduler consumes.
//!
//! `Worker` is the durable, mutable registry entry owned by the queue
//! processor's single global lock (see [`crate::queue`]). `WorkerView` is
//! built fresh by the telemetry adapter (C5) for every scheduling decision
//! and carries nothing the scheduler could use to mutate shared state.

use std::collections::HashSet;

use crate::task::ResourceAmounts;

/// A worker registry entry.
///
/// # Invariants
/// - `allocated.* + available.* = total.*` on every dimension at any
///   quiescent moment (outside one critical section).
/// - `allocated.*` is never negative.
/// - `running.len()` never exceeds the number of assignment records the
///   persistent store holds for this worker.
#[derive(Debug, Clone)]
pub struct Worker {
    pub id: String,
    pub endpoint: String,
    pub total: ResourceAmounts,
    pub allocated: ResourceAmounts,
    pub active: bool,
    pub running: HashSet<String>,
    pub last_heartbeat: Option<chrono::DateTime<chrono::Utc>>,
}

impl Worker {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>, total: ResourceAmounts) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            total,
            allocated: ResourceAmounts::default(),
            active: true,
            running: HashSet::new(),
            last_heartbeat: None,
        }
    }

    /// `total - allocated`, never negative on any dimension.
    pub fn available(&self) -> ResourceAmounts {
        self.total.minus_clamped(&self.allocated)
    }

    /// Reserve `amount` for `task_id`: increases `allocated`, records the
    /// task as running. Caller must already hold the registry write lock
    /// and must have re-verified feasibility immediately beforehand.
    pub fn reserve(&mut self, task_id: &str, amount: &ResourceAmounts) {
        self.allocated = self.allocated.plus(amount);
        self.running.insert(task_id.to_string());
    }

    /// Release `amount` previously reserved for `task_id`. Returns `true`
    /// if releasing would have driven any dimension negative — clamped to
    /// zero rather than allowed to go negative.
    pub fn release(&mut self, task_id: &str, amount: &ResourceAmounts) -> bool {
        let underflowed = self.allocated.would_underflow(amount);
        self.allocated = self.allocated.minus_clamped(amount);
        self.running.remove(task_id);
        underflowed
    }

    /// Recompute `allocated`/`running` from a known-correct set of
    /// currently-running task requests, discarding whatever drifted in
    /// memory. Used by [`crate::queue::reconcile`].
    pub fn reconcile_from(&mut self, running_requests: &[(String, ResourceAmounts)]) {
        let mut total = ResourceAmounts::default();
        let mut running = HashSet::with_capacity(running_requests.len());
        for (task_id, amount) in running_requests {
            total = total.plus(amount);
            running.insert(task_id.clone());
        }
        self.allocated = total;
        self.running = running;
    }

    pub fn invariant_holds(&self) -> bool {
        let sum = self.allocated.plus(&self.available());
        (sum.cpu - self.total.cpu).abs() < 1e-9
            && (sum.memory_mb - self.total.memory_mb).abs() < 1e-9
            && (sum.storage_mb - self.total.storage_mb).abs() < 1e-9
            && (sum.gpu - self.total.gpu).abs() < 1e-9
            && self.allocated.is_non_negative()
    }
}

/// The minimal worker view the scheduler consumes for one `Select` call.
/// Built by [`crate::telemetry::TelemetryAdapter`]; carries no handle back
/// to the mutable registry.
#[derive(Debug, Clone, Copy)]
pub struct WorkerView {
    pub available: ResourceAmounts,
    /// Normalised mean of cpu/mem/gpu utilisation from the most recent
    /// heartbeat, clamped to `[0, 1+]` (overload is representable above 1).
    pub load: f64,
}
