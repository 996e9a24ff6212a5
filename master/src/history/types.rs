/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use chrono::{DateTime, Utc};

use crate::task::{ResourceAmounts, TaskType};

/// One joined, enriched task-history row.
#[derive(Debug, Clone)]
pub struct TaskHistoryRecord {
    pub task_id: String,
    pub worker_id: String,
    pub task_type: TaskType,
    pub arrival: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub finish: DateTime<Utc>,
    /// `finish - start`, in seconds.
    pub actual_runtime_seconds: f64,
    pub sla_success: bool,
    pub request: ResourceAmounts,
    pub load_at_start: f64,
    /// Worker availability immediately before this task was reserved; the
    /// denominator of the GA's runtime-model features.
    pub available_at_start: ResourceAmounts,
    pub tau_used: f64,
    pub k_used: f64,
}

/// One worker's aggregate stats over a window.
#[derive(Debug, Clone)]
pub struct WorkerStatsRecord {
    pub worker_id: String,
    pub tasks_run: u64,
    pub sla_violations: u64,
    pub total_runtime_seconds: f64,
    pub cpu_seconds: f64,
    pub mem_seconds: f64,
    pub gpu_seconds: f64,
    pub overload_time_seconds: f64,
    pub total_observation_seconds: f64,
    pub average_load: f64,
    pub window_since: DateTime<Utc>,
    pub window_until: DateTime<Utc>,
}

impl WorkerStatsRecord {
    pub fn sla_violation_rate(&self) -> f64 {
        if self.tasks_run == 0 {
            0.0
        } else {
            self.sla_violations as f64 / self.tasks_run as f64
        }
    }

    pub fn overload_rate(&self) -> f64 {
        if self.total_observation_seconds <= 0.0 {
            0.0
        } else {
            self.overload_time_seconds / self.total_observation_seconds
        }
    }
}
