/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! History query layer (C3).
//!
//! Joins the *tasks*, *assignments*, *results* collections on task id,
//! keeps only completed tasks with a recorded start time, and projects the
//! enriched [`TaskHistoryRecord`] rows the GA epoch runner (C7) and
//! operators consume. Read-only over the persistent store.

pub mod error;
pub mod types;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use error::HistoryError;
pub use types::{TaskHistoryRecord, WorkerStatsRecord};

use crate::store::Store;
use crate::task::{TaskStatus, TaskType};

pub struct HistoryLayer {
    store: Arc<Store>,
}

impl HistoryLayer {
    pub fn new(store: Arc<Store>) -> Self {
        HistoryLayer { store }
    }

    fn check_window(since: DateTime<Utc>, until: DateTime<Utc>) -> Result<(), HistoryError> {
        if since > until {
            return Err(HistoryError::InvalidWindow { since, until });
        }
        Ok(())
    }

    /// Join assignments/results onto completed tasks: keep only `status == completed`
    /// tasks with a non-absent start time and a canonical type (the type
    /// is always canonical by construction — see [`TaskType`] — this is a
    /// defensive re-check, not dead code, since the join is the one place
    /// a future non-`Task`-mediated ingestion path would need to filter).
    /// Drops any task lacking either an assignment or a result record.
    pub fn task_history(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<TaskHistoryRecord>, HistoryError> {
        Self::check_window(since, until)?;
        let mut rows = Vec::new();

        for task in self.store.list_tasks() {
            if task.status != TaskStatus::Completed {
                continue;
            }
            let Some(started_at) = task.started_at else {
                continue;
            };
            if TaskType::parse(task.task_type.as_str()).is_none() {
                continue;
            }
            if task.submitted_at < since || task.submitted_at > until {
                continue;
            }

            let assignment = self
                .store
                .assignments_for_task(&task.task_id)
                .into_iter()
                .min_by_key(|a| a.created_at);
            let Some(assignment) = assignment else {
                continue;
            };
            let Some(result) = self.store.get_result(&task.task_id) else {
                continue;
            };

            let finish = result.completed_at;
            let actual_runtime_seconds = (finish - started_at).num_milliseconds() as f64 / 1000.0;

            rows.push(TaskHistoryRecord {
                task_id: task.task_id,
                worker_id: assignment.worker_id,
                task_type: task.task_type,
                arrival: task.submitted_at,
                deadline: task.deadline,
                start: started_at,
                finish,
                actual_runtime_seconds,
                sla_success: finish <= task.deadline,
                request: task.request,
                load_at_start: assignment.load_at_start,
                available_at_start: assignment.available_at_start,
                tau_used: task.tau,
                k_used: task.sla_multiplier,
            });
        }

        Ok(rows)
    }

    pub fn task_history_by_type(
        &self,
        task_type: TaskType,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<TaskHistoryRecord>, HistoryError> {
        Ok(self
            .task_history(since, until)?
            .into_iter()
            .filter(|r| r.task_type == task_type)
            .collect())
    }

    /// Aggregate per-worker stats over the joined history window.
    pub fn worker_stats(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<WorkerStatsRecord>, HistoryError> {
        let rows = self.task_history(since, until)?;

        let mut by_worker: std::collections::HashMap<String, WorkerStatsRecord> =
            std::collections::HashMap::new();

        for row in &rows {
            let entry = by_worker
                .entry(row.worker_id.clone())
                .or_insert_with(|| WorkerStatsRecord {
                    worker_id: row.worker_id.clone(),
                    tasks_run: 0,
                    sla_violations: 0,
                    total_runtime_seconds: 0.0,
                    cpu_seconds: 0.0,
                    mem_seconds: 0.0,
                    gpu_seconds: 0.0,
                    overload_time_seconds: 0.0,
                    total_observation_seconds: 0.0,
                    average_load: 0.0,
                    window_since: since,
                    window_until: until,
                });

            entry.tasks_run += 1;
            if !row.sla_success {
                entry.sla_violations += 1;
            }
            entry.total_runtime_seconds += row.actual_runtime_seconds;
            entry.cpu_seconds += row.request.cpu * row.actual_runtime_seconds;
            entry.mem_seconds += row.request.memory_mb * row.actual_runtime_seconds;
            entry.gpu_seconds += row.request.gpu * row.actual_runtime_seconds;
            entry.total_observation_seconds += row.actual_runtime_seconds;
            if row.load_at_start > 1.0 {
                entry.overload_time_seconds += row.actual_runtime_seconds;
            }
            // average_load accumulates a running sum here; divided below.
            entry.average_load += row.load_at_start;
        }

        let mut stats: Vec<WorkerStatsRecord> = by_worker.into_values().collect();
        for s in &mut stats {
            if s.tasks_run > 0 {
                s.average_load /= s.tasks_run as f64;
            }
        }
        Ok(stats)
    }

    pub fn sla_success_rate(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<f64, HistoryError> {
        let rows = self.task_history(since, until)?;
        Ok(success_ratio(&rows))
    }

    pub fn sla_success_rate_by_type(
        &self,
        task_type: TaskType,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<f64, HistoryError> {
        let rows = self.task_history_by_type(task_type, since, until)?;
        Ok(success_ratio(&rows))
    }
}

fn success_ratio(rows: &[TaskHistoryRecord]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let successes = rows.iter().filter(|r| r.sla_success).count();
    successes as f64 / rows.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AssignmentRecord, ResultRecord, TaskRecord};
    use crate::task::ResourceAmounts;
    use chrono::Duration;

    fn seed(store: &Store, task_id: &str, worker_id: &str, runtime_secs: i64, on_time: bool) {
        let now = Utc::now();
        let started_at = now - Duration::seconds(runtime_secs);
        let deadline = if on_time {
            now + Duration::seconds(1)
        } else {
            now - Duration::seconds(1)
        };
        store
            .upsert_task(TaskRecord {
                task_id: task_id.to_string(),
                user_id: "u".to_string(),
                submitted_at: started_at,
                docker_image: "img".to_string(),
                command: vec![],
                request: ResourceAmounts::new(1.0, 2.0, 0.0, 0.0),
                task_type: TaskType::CpuLight,
                sla_multiplier: 2.0,
                tau: 5.0,
                deadline,
                status: TaskStatus::Completed,
                started_at: Some(started_at),
                completed_at: Some(now),
            })
            .unwrap();
        store
            .insert_assignment(AssignmentRecord {
                assignment_id: format!("{task_id}-a"),
                task_id: task_id.to_string(),
                worker_id: worker_id.to_string(),
                load_at_start: 0.5,
                available_at_start: ResourceAmounts::new(8.0, 16.0, 0.0, 2.0),
                created_at: started_at,
            })
            .unwrap();
        store
            .insert_result_if_absent(ResultRecord {
                task_id: task_id.to_string(),
                worker_id: worker_id.to_string(),
                status: "success".to_string(),
                logs: String::new(),
                sla_success: on_time,
                completed_at: now,
            })
            .unwrap();
    }

    #[test]
    fn task_history_drops_tasks_without_assignment_or_result() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        seed(&store, "t1", "w1", 10, true);

        store
            .upsert_task(TaskRecord {
                task_id: "orphan".to_string(),
                user_id: "u".to_string(),
                submitted_at: Utc::now(),
                docker_image: "img".to_string(),
                command: vec![],
                request: ResourceAmounts::default(),
                task_type: TaskType::Mixed,
                sla_multiplier: 2.0,
                tau: 5.0,
                deadline: Utc::now(),
                status: TaskStatus::Completed,
                started_at: Some(Utc::now()),
                completed_at: Some(Utc::now()),
            })
            .unwrap();

        let layer = HistoryLayer::new(store);
        let rows = layer
            .task_history(Utc::now() - Duration::hours(1), Utc::now() + Duration::hours(1))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task_id, "t1");
    }

    #[test]
    fn worker_stats_aggregates_across_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        seed(&store, "t1", "w1", 10, true);
        seed(&store, "t2", "w1", 5, false);

        let layer = HistoryLayer::new(store);
        let stats = layer
            .worker_stats(Utc::now() - Duration::hours(1), Utc::now() + Duration::hours(1))
            .unwrap();
        assert_eq!(stats.len(), 1);
        let w1 = &stats[0];
        assert_eq!(w1.tasks_run, 2);
        assert_eq!(w1.sla_violations, 1);
        assert!((w1.total_runtime_seconds - 15.0).abs() < 0.5);
    }

    #[test]
    fn sla_success_rate_is_a_simple_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        seed(&store, "t1", "w1", 10, true);
        seed(&store, "t2", "w1", 10, false);

        let layer = HistoryLayer::new(store);
        let rate = layer
            .sla_success_rate(Utc::now() - Duration::hours(1), Utc::now() + Duration::hours(1))
            .unwrap();
        assert!((rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn invalid_window_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let layer = HistoryLayer::new(store);
        let result = layer.task_history(Utc::now(), Utc::now() - Duration::hours(1));
        assert!(matches!(result, Err(HistoryError::InvalidWindow { .. })));
    }
}
