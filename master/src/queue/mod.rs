/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Queue processor & resource accountant (C6).
//!
//! The single writer for per-worker allocation state. Owns the FIFO
//! submission queue, the 5 s processor tick, dispatch-then-rollback
//! semantics, completion/cancellation handling, and reconciliation. Every
//! mutation of [`crate::worker::Worker`] allocation fields funnels through
//! [`crate::registry::WorkerRegistry`], which is the actual lock.

pub mod error;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

pub use error::QueueError;

use crate::registry::WorkerRegistry;
use crate::scheduler::{Decision, Scheduler, TaskView};
use crate::store::{AssignmentRecord, ResultRecord, Store, TaskRecord};
use crate::task::{ResourceAmounts, TaskStatus, TaskType};
use crate::tau::TauStore;
use crate::telemetry::TelemetryAdapter;

/// How many consecutive scheduling misses to tolerate silently before
/// logging again: log only on the first miss and every tenth miss after
/// that, per task.
const MISS_LOG_EVERY: u32 = 10;

/// Timeout for the cancellation RPC against a worker.
const CANCEL_TIMEOUT: Duration = Duration::from_secs(30);

/// The master's view of a worker endpoint, dialled for dispatch and
/// cancellation. A real implementation wraps a `tonic` client; tests use an
/// in-memory fake.
#[async_trait]
pub trait WorkerRpcClient: Send + Sync {
    async fn assign_task(
        &self,
        endpoint: &str,
        task: &TaskRecord,
    ) -> Result<(), QueueError>;

    async fn cancel_task(&self, endpoint: &str, task_id: &str) -> Result<(), QueueError>;
}

/// One entry in the in-memory FIFO queue. The task's durable fields live in
/// the [`Store`]; this only tracks scheduling bookkeeping.
#[derive(Debug, Clone)]
struct QueueEntry {
    task_id: String,
    retries: u32,
}

/// A report of task completion as relayed by a worker.
#[derive(Debug, Clone)]
pub struct CompletionReport {
    pub task_id: String,
    pub worker_id: String,
    /// `"success"` or `"failure"`.
    pub status: String,
    pub logs: String,
}

pub struct QueueProcessor {
    store: Arc<Store>,
    registry: Arc<WorkerRegistry>,
    scheduler: Arc<Scheduler>,
    tau_store: Arc<TauStore>,
    telemetry: Arc<TelemetryAdapter>,
    rpc: Arc<dyn WorkerRpcClient>,
    queue: Mutex<VecDeque<QueueEntry>>,
}

impl QueueProcessor {
    pub fn new(
        store: Arc<Store>,
        registry: Arc<WorkerRegistry>,
        scheduler: Arc<Scheduler>,
        tau_store: Arc<TauStore>,
        telemetry: Arc<TelemetryAdapter>,
        rpc: Arc<dyn WorkerRpcClient>,
    ) -> Self {
        QueueProcessor {
            store,
            registry,
            scheduler,
            tau_store,
            telemetry,
            rpc,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Submit a new task: resolve its type, compute τ/deadline, persist a
    /// `queued` record, and append to the FIFO.
    pub fn submit(
        &self,
        task_id: impl Into<String>,
        user_id: impl Into<String>,
        raw_type: Option<&str>,
        request: ResourceAmounts,
        sla_multiplier: f64,
        docker_image: impl Into<String>,
        command: Vec<String>,
    ) -> Result<(), QueueError> {
        let task_id = task_id.into();
        let task_type = TaskType::resolve(raw_type, &request);
        let tau = self.tau_store.get(task_type);
        let submitted_at = Utc::now();
        let deadline = submitted_at
            + chrono::Duration::milliseconds((sla_multiplier * tau * 1000.0).round() as i64);

        let record = TaskRecord {
            task_id: task_id.clone(),
            user_id: user_id.into(),
            submitted_at,
            docker_image: docker_image.into(),
            command,
            request,
            task_type,
            sla_multiplier,
            tau,
            deadline,
            status: TaskStatus::Queued,
            started_at: None,
            completed_at: None,
        };
        self.store.upsert_task(record)?;
        self.queue.lock().expect("queue lock poisoned").push_back(QueueEntry {
            task_id,
            retries: 0,
        });
        Ok(())
    }

    /// One processor tick: drain the queue in order, select a worker for
    /// each entry, and either dispatch it or leave it queued with an
    /// updated retry counter.
    pub async fn process_tick(&self) {
        let entries: Vec<QueueEntry> = {
            let mut queue = self.queue.lock().expect("queue lock poisoned");
            queue.drain(..).collect()
        };

        let mut remaining = VecDeque::with_capacity(entries.len());
        for mut entry in entries {
            let Some(task) = self.store.get_task(&entry.task_id) else {
                // Cancelled/removed out from under the queue; drop silently.
                continue;
            };
            if task.status != TaskStatus::Queued {
                continue;
            }

            let view = TaskView {
                task_id: task.task_id.clone(),
                task_type: task.task_type,
                request: task.request,
                arrival: task.submitted_at,
                tau: task.tau,
                deadline: task.deadline,
            };

            let decision = self.scheduler.select(&view).await;
            match decision.worker_id() {
                None => {
                    entry.retries += 1;
                    if entry.retries == 1 || entry.retries % MISS_LOG_EVERY == 0 {
                        warn!(
                            task_id = %entry.task_id,
                            retries = entry.retries,
                            "no feasible worker for queued task"
                        );
                    }
                    remaining.push_back(entry);
                }
                Some(worker_id) => {
                    let worker_id = worker_id.to_string();
                    match self.assign_to(&task, &worker_id).await {
                        Ok(()) => {
                            debug!(task_id = %entry.task_id, worker_id = %worker_id, "dispatched task");
                        }
                        Err(err) => {
                            warn!(task_id = %entry.task_id, worker_id = %worker_id, error = %err, "dispatch attempt failed, requeuing");
                            entry.retries += 1;
                            remaining.push_back(entry);
                        }
                    }
                }
            }
        }

        let mut queue = self.queue.lock().expect("queue lock poisoned");
        for entry in remaining.into_iter().rev() {
            queue.push_front(entry);
        }
    }

    /// Attempt to assign `task` to `worker_id`.
    ///
    /// Reservation and persistence of the assignment record happen before
    /// the dispatch RPC; the task's status only flips to `running` after
    /// the RPC succeeds, so a dispatch failure can safely leave the task
    /// `queued` without an illegal reverse status transition.
    async fn assign_to(&self, task: &TaskRecord, worker_id: &str) -> Result<(), QueueError> {
        let available_at_start = self
            .registry
            .get_clone(worker_id)
            .map(|w| w.available())
            .unwrap_or_default();

        if !self.registry.try_reserve(worker_id, &task.task_id, &task.request) {
            return Err(QueueError::NotFeasibleAfterRecheck {
                worker_id: worker_id.to_string(),
                task_id: task.task_id.clone(),
            });
        }

        let load_at_start = self.telemetry.get_worker_load(worker_id);
        if let Err(err) = self.store.insert_assignment(AssignmentRecord {
            assignment_id: uuid::Uuid::new_v4().to_string(),
            task_id: task.task_id.clone(),
            worker_id: worker_id.to_string(),
            load_at_start,
            available_at_start,
            created_at: Utc::now(),
        }) {
            warn!(task_id = %task.task_id, error = %err, "failed to persist assignment record, proceeding (reconciler will fix drift)");
        }

        let endpoint = match self.registry.get_clone(worker_id) {
            Some(w) => w.endpoint,
            None => {
                self.registry.release(worker_id, &task.task_id, &task.request);
                return Err(QueueError::WorkerNotFound(worker_id.to_string()));
            }
        };

        match self.rpc.assign_task(&endpoint, task).await {
            Ok(()) => {
                let mut updated = task.clone();
                updated.status = TaskStatus::Running;
                updated.started_at = Some(Utc::now());
                if let Err(err) = self.store.upsert_task(updated) {
                    warn!(task_id = %task.task_id, error = %err, "failed to persist running status, reconciler will fix drift");
                }
                Ok(())
            }
            Err(err) => {
                self.registry.release(worker_id, &task.task_id, &task.request);
                Err(err)
            }
        }
    }

    /// Completion path: records the worker's report and, if this is the
    /// first terminal report for the task, releases its resources.
    pub fn on_completion(&self, report: CompletionReport) -> Result<(), QueueError> {
        let Some(task) = self.store.get_task(&report.task_id) else {
            return Err(QueueError::TaskNotFound(report.task_id));
        };

        if task.status == TaskStatus::Cancelled {
            self.store.insert_result_if_absent(ResultRecord {
                task_id: report.task_id,
                worker_id: report.worker_id,
                status: report.status,
                logs: report.logs,
                sla_success: false,
                completed_at: Utc::now(),
            })?;
            return Ok(());
        }

        let next_status = if report.status == "success" {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        let now = Utc::now();
        let mut updated = task.clone();
        let transitioned = updated.status.can_transition_to(next_status);

        if transitioned {
            self.registry.release(&report.worker_id, &task.task_id, &task.request);
            updated.status = next_status;
            updated.completed_at = Some(now);

            if report.status == "success" {
                if let Some(started_at) = updated.started_at {
                    let actual_runtime_seconds = (now - started_at).num_milliseconds() as f64 / 1000.0;
                    if actual_runtime_seconds > 0.0 {
                        self.tau_store.update_on_success(updated.task_type, actual_runtime_seconds);
                    }
                }
            }
            if let Err(err) = self.store.upsert_task(updated.clone()) {
                warn!(task_id = %updated.task_id, error = %err, "failed to persist completed status, reconciler will fix drift");
            }
        }

        self.store.insert_result_if_absent(ResultRecord {
            task_id: updated.task_id.clone(),
            worker_id: report.worker_id,
            status: report.status,
            logs: report.logs,
            sla_success: now <= updated.deadline,
            completed_at: now,
        })?;

        Ok(())
    }

    /// Cancellation path: DB-first, sticky against a later completion
    /// report racing in behind it.
    pub async fn cancel(&self, task_id: &str) -> Result<(), QueueError> {
        let Some(task) = self.store.get_task(task_id) else {
            return Err(QueueError::TaskNotFound(task_id.to_string()));
        };

        let owning_worker = self.registry.find_owning_worker(task_id).or_else(|| {
            self.store
                .assignments_for_task(task_id)
                .into_iter()
                .min_by_key(|a| a.created_at)
                .map(|a| a.worker_id)
        });

        let mut updated = task.clone();
        let transitioned = updated.status.can_transition_to(TaskStatus::Cancelled);
        if transitioned {
            updated.status = TaskStatus::Cancelled;
            self.store.upsert_task(updated)?;
        }

        let Some(worker_id) = owning_worker else {
            return Ok(());
        };

        if let Some(w) = self.registry.get_clone(&worker_id) {
            match tokio::time::timeout(CANCEL_TIMEOUT, self.rpc.cancel_task(&w.endpoint, task_id))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    info!(task_id, worker_id = %worker_id, error = %err, "cancel RPC failed, worker will observe cancelled status on next cycle");
                }
                Err(_) => {
                    info!(task_id, worker_id = %worker_id, "cancel RPC timed out, worker will observe cancelled status on next cycle");
                }
            }
        }
        self.registry.release(&worker_id, task_id, &task.request);
        Ok(())
    }

    /// Recompute every worker's allocation from the ground truth in the
    /// persistent store, repairing any drift left by a crash or a missed
    /// completion report.
    pub fn reconcile(&self) {
        let running_tasks = self
            .store
            .list_tasks()
            .into_iter()
            .filter(|t| t.status == TaskStatus::Running);

        let mut by_worker: std::collections::HashMap<String, Vec<(String, ResourceAmounts)>> =
            std::collections::HashMap::new();
        for task in running_tasks {
            let Some(assignment) = self
                .store
                .assignments_for_task(&task.task_id)
                .into_iter()
                .min_by_key(|a| a.created_at)
            else {
                continue;
            };
            by_worker
                .entry(assignment.worker_id)
                .or_default()
                .push((task.task_id, task.request));
        }

        for worker_id in self.registry.list_active_ids() {
            let running = by_worker.remove(&worker_id).unwrap_or_default();
            self.registry.reconcile(&worker_id, &running);
            if let Some(w) = self.registry.get_clone(&worker_id) {
                let record = crate::store::records::WorkerRecord {
                    worker_id: w.id,
                    endpoint: w.endpoint,
                    total: w.total,
                    allocated: w.allocated,
                    is_active: w.active,
                    last_heartbeat: w.last_heartbeat,
                };
                if let Err(err) = self.store.upsert_worker(record) {
                    warn!(worker_id = %worker_id, error = %err, "failed to persist reconciled worker state");
                }
            }
        }
        info!("reconciliation pass complete");
    }
}

/// Spawn the 5 s queue-processor ticker. Runs forever until the
/// returned handle is aborted.
pub fn spawn_queue_ticker(
    processor: Arc<QueueProcessor>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            processor.process_tick().await;
        }
    })
}
