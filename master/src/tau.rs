/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Tau store (C2): per-task-type EMA of observed runtimes.
//!
//! Pure in-memory state, no I/O. Feeds deadline computation (C4) and
//! training data for the runtime model (C7). Not persisted across restarts
//! — the system re-learns τ from scratch on every process start.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::task::TaskType;

/// EMA learning rate: `τ ← λ·actual + (1−λ)·τ_old`.
pub const LAMBDA: f64 = 0.2;

/// Per-task-type runtime baseline, mutated only via [`TauStore::update_on_success`].
pub struct TauStore {
    values: Mutex<HashMap<TaskType, f64>>,
}

impl TauStore {
    /// Seed every canonical type with its documented default.
    pub fn new() -> Self {
        let values = TaskType::ALL
            .iter()
            .map(|t| (*t, t.default_tau_seconds()))
            .collect();
        TauStore {
            values: Mutex::new(values),
        }
    }

    /// Current EMA for `task_type`, or the per-type default if never
    /// updated (never returns a stale or missing value — invariant
    /// "`Get(type) > 0` for all canonical types at all times" holds because
    /// every default is itself positive).
    pub fn get(&self, task_type: TaskType) -> f64 {
        let values = self.values.lock().expect("tau store mutex poisoned");
        *values
            .get(&task_type)
            .unwrap_or(&task_type.default_tau_seconds())
    }

    /// Apply one EMA update. Callers are responsible for checking the
    /// preconditions (`status == success`, canonical type, `actual > 0`)
    /// before calling — this method itself is unconditional given a
    /// positive `actual_runtime_seconds`.
    pub fn update_on_success(&self, task_type: TaskType, actual_runtime_seconds: f64) {
        debug_assert!(actual_runtime_seconds > 0.0);
        let mut values = self.values.lock().expect("tau store mutex poisoned");
        let old = *values
            .get(&task_type)
            .unwrap_or(&task_type.default_tau_seconds());
        let updated = LAMBDA * actual_runtime_seconds + (1.0 - LAMBDA) * old;
        values.insert(task_type, updated);
    }

    /// Explicit override, bypassing the EMA — used by tests and by
    /// operational overrides.
    pub fn set(&self, task_type: TaskType, tau: f64) {
        let mut values = self.values.lock().expect("tau store mutex poisoned");
        values.insert(task_type, tau);
    }
}

impl Default for TauStore {
    fn default() -> Self {
        Self::new()
    }
}
