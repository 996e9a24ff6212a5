/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The persistent store.
//!
//! Spec §6 treats "the persistent store" as an external dependency with a
//! narrow contract over four logical collections (*tasks*, *assignments*,
//! *results*, *workers*). This module implements that contract directly: an
//! in-process, lock-guarded store that keeps each collection in memory and
//! durably mirrors it to a newline-delimited JSON file under a data
//! directory, using the same write-to-temp/rename discipline the parameter
//! store ([`crate::params`]) already uses for its single file. Every
//! mutating call is one critical section and rewrites its collection file
//! in full — simple, and sufficient for the write volumes this system
//! produces. A production deployment would put `sqlx` over Postgres behind
//! this same `Store` surface.

pub mod records;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

pub use records::{AssignmentRecord, ResultRecord, TaskRecord, WorkerRecord};

pub struct Store {
    data_dir: PathBuf,
    tasks: RwLock<HashMap<String, TaskRecord>>,
    assignments: RwLock<HashMap<String, AssignmentRecord>>,
    results: RwLock<HashMap<String, ResultRecord>>,
    workers: RwLock<HashMap<String, WorkerRecord>>,
}

impl Store {
    /// Open (creating if absent) the data directory and load every
    /// collection file present there.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("cannot create store data dir {}", data_dir.display()))?;

        let tasks = load_collection(&data_dir.join("tasks.ndjson"), |r: &TaskRecord| {
            r.task_id.clone()
        })?;
        let assignments = load_collection(
            &data_dir.join("assignments.ndjson"),
            |r: &AssignmentRecord| r.assignment_id.clone(),
        )?;
        let results = load_collection(&data_dir.join("results.ndjson"), |r: &ResultRecord| {
            r.task_id.clone()
        })?;
        let workers = load_collection(&data_dir.join("workers.ndjson"), |r: &WorkerRecord| {
            r.worker_id.clone()
        })?;

        Ok(Store {
            data_dir,
            tasks: RwLock::new(tasks),
            assignments: RwLock::new(assignments),
            results: RwLock::new(results),
            workers: RwLock::new(workers),
        })
    }

    // ── tasks ─────────────────────────────────────────────────────────────────

    pub fn upsert_task(&self, record: TaskRecord) -> Result<()> {
        let mut map = self.tasks.write().expect("tasks lock poisoned");
        map.insert(record.task_id.clone(), record);
        persist_collection(&self.data_dir.join("tasks.ndjson"), map.values())
    }

    pub fn get_task(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.read().expect("tasks lock poisoned").get(task_id).cloned()
    }

    pub fn list_tasks(&self) -> Vec<TaskRecord> {
        self.tasks.read().expect("tasks lock poisoned").values().cloned().collect()
    }

    // ── assignments ───────────────────────────────────────────────────────────

    pub fn insert_assignment(&self, record: AssignmentRecord) -> Result<()> {
        let mut map = self.assignments.write().expect("assignments lock poisoned");
        map.insert(record.assignment_id.clone(), record);
        persist_collection(&self.data_dir.join("assignments.ndjson"), map.values())
    }

    pub fn assignments_for_task(&self, task_id: &str) -> Vec<AssignmentRecord> {
        self.assignments
            .read()
            .expect("assignments lock poisoned")
            .values()
            .filter(|a| a.task_id == task_id)
            .cloned()
            .collect()
    }

    pub fn assignments_for_worker(&self, worker_id: &str) -> Vec<AssignmentRecord> {
        self.assignments
            .read()
            .expect("assignments lock poisoned")
            .values()
            .filter(|a| a.worker_id == worker_id)
            .cloned()
            .collect()
    }

    // ── results ───────────────────────────────────────────────────────────────

    /// Insert a result record for `record.task_id` unless one already
    /// exists. Returns `true` if the record was inserted, `false` if a
    /// prior result was kept — first-result-only semantics for the race
    /// between a worker's completion report and a cancellation.
    pub fn insert_result_if_absent(&self, record: ResultRecord) -> Result<bool> {
        let mut map = self.results.write().expect("results lock poisoned");
        if map.contains_key(&record.task_id) {
            return Ok(false);
        }
        map.insert(record.task_id.clone(), record);
        persist_collection(&self.data_dir.join("results.ndjson"), map.values())?;
        Ok(true)
    }

    pub fn get_result(&self, task_id: &str) -> Option<ResultRecord> {
        self.results.read().expect("results lock poisoned").get(task_id).cloned()
    }

    pub fn list_results(&self) -> Vec<ResultRecord> {
        self.results.read().expect("results lock poisoned").values().cloned().collect()
    }

    // ── workers ───────────────────────────────────────────────────────────────

    pub fn upsert_worker(&self, record: WorkerRecord) -> Result<()> {
        let mut map = self.workers.write().expect("workers lock poisoned");
        map.insert(record.worker_id.clone(), record);
        persist_collection(&self.data_dir.join("workers.ndjson"), map.values())
    }

    pub fn get_worker(&self, worker_id: &str) -> Option<WorkerRecord> {
        self.workers.read().expect("workers lock poisoned").get(worker_id).cloned()
    }

    pub fn list_workers(&self) -> Vec<WorkerRecord> {
        self.workers.read().expect("workers lock poisoned").values().cloned().collect()
    }
}

// ── NDJSON helpers ──────────────────────────────────────────────────────────────

fn load_collection<T, F>(path: &Path, key_of: F) -> Result<HashMap<String, T>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> String,
{
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read store collection {}", path.display()))?;
    let mut map = HashMap::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => {
                map.insert(key_of(&record), record);
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %err,
                    "skipping malformed store record"
                );
            }
        }
    }
    Ok(map)
}

fn persist_collection<'a, T, I>(path: &Path, records: I) -> Result<()>
where
    T: Serialize + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut buf = String::new();
    for record in records {
        buf.push_str(&serde_json::to_string(record).context("serializing store record")?);
        buf.push('\n');
    }
    let tmp_path = path.with_extension("ndjson.tmp");
    std::fs::write(&tmp_path, buf)
        .with_context(|| format!("writing store collection {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming store collection into place at {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ResourceAmounts, TaskStatus, TaskType};
    use chrono::Utc;

    fn sample_task(id: &str) -> TaskRecord {
        TaskRecord {
            task_id: id.to_string(),
            user_id: "u1".to_string(),
            submitted_at: Utc::now(),
            docker_image: "img".to_string(),
            command: vec![],
            request: ResourceAmounts::new(1.0, 1.0, 0.0, 0.0),
            task_type: TaskType::CpuLight,
            sla_multiplier: 2.0,
            tau: 5.0,
            deadline: Utc::now(),
            status: TaskStatus::Queued,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn upsert_and_get_task_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store.upsert_task(sample_task("t1")).unwrap();
        assert!(store.get_task("t1").is_some());
        assert_eq!(store.list_tasks().len(), 1);
    }

    #[test]
    fn reopening_store_loads_persisted_records() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            store.upsert_task(sample_task("t1")).unwrap();
            store.upsert_task(sample_task("t2")).unwrap();
        }
        let reopened = Store::open(dir.path()).unwrap();
        assert_eq!(reopened.list_tasks().len(), 2);
        assert!(reopened.get_task("t2").is_some());
    }

    #[test]
    fn insert_result_if_absent_keeps_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let first = ResultRecord {
            task_id: "t1".to_string(),
            worker_id: "w1".to_string(),
            status: "success".to_string(),
            logs: "ok".to_string(),
            sla_success: true,
            completed_at: Utc::now(),
        };
        let second = ResultRecord {
            status: "failure".to_string(),
            logs: "late".to_string(),
            sla_success: false,
            ..first.clone()
        };

        assert!(store.insert_result_if_absent(first.clone()).unwrap());
        assert!(!store.insert_result_if_absent(second).unwrap());
        assert_eq!(store.get_result("t1").unwrap().status, "success");
    }

    #[test]
    fn assignments_filter_by_task_and_worker() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store
            .insert_assignment(AssignmentRecord {
                assignment_id: "a1".to_string(),
                task_id: "t1".to_string(),
                worker_id: "w1".to_string(),
                load_at_start: 0.2,
                available_at_start: ResourceAmounts::default(),
                created_at: Utc::now(),
            })
            .unwrap();
        store
            .insert_assignment(AssignmentRecord {
                assignment_id: "a2".to_string(),
                task_id: "t2".to_string(),
                worker_id: "w1".to_string(),
                load_at_start: 0.3,
                available_at_start: ResourceAmounts::default(),
                created_at: Utc::now(),
            })
            .unwrap();

        assert_eq!(store.assignments_for_task("t1").len(), 1);
        assert_eq!(store.assignments_for_worker("w1").len(), 2);
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.ndjson");
        std::fs::write(&path, "not json\n").unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.list_tasks().len(), 0);
    }
}
