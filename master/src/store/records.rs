/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Persistent-store record schemas for the tasks, assignments, results, and
//! workers collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{ResourceAmounts, TaskStatus, TaskType};

/// A row of the *tasks* collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub user_id: String,
    pub submitted_at: DateTime<Utc>,
    pub docker_image: String,
    pub command: Vec<String>,
    pub request: ResourceAmounts,
    pub task_type: TaskType,
    pub sla_multiplier: f64,
    pub tau: f64,
    pub deadline: DateTime<Utc>,
    pub status: TaskStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A row of the *assignments* collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub assignment_id: String,
    pub task_id: String,
    pub worker_id: String,
    pub load_at_start: f64,
    /// The worker's available resources immediately before this task was
    /// reserved — the denominator both the GA's runtime-model features and
    /// the online risk formula divide by.
    pub available_at_start: ResourceAmounts,
    pub created_at: DateTime<Utc>,
}

/// A row of the *results* collection. Keyed by `task_id`; at most one
/// result is ever stored per task (first write wins — see
/// [`crate::store::Store::insert_result_if_absent`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub task_id: String,
    pub worker_id: String,
    /// `"success"` or `"failure"`, as reported by the worker.
    pub status: String,
    pub logs: String,
    pub sla_success: bool,
    pub completed_at: DateTime<Utc>,
}

/// A row of the *workers* collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub worker_id: String,
    pub endpoint: String,
    pub total: ResourceAmounts,
    pub allocated: ResourceAmounts,
    pub is_active: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl WorkerRecord {
    pub fn available(&self) -> ResourceAmounts {
        self.total.minus_clamped(&self.allocated)
    }
}
