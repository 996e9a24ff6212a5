/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The risk-aware task scheduler (RTS, C4).
//!
//! [`Scheduler::select`] is the online, per-task worker-selection engine:
//! given a [`TaskView`] and the live worker population, it filters to
//! feasible workers, predicts execution time, scores risk, and returns a
//! single [`Decision`]. It is stateless across calls except for the
//! round-robin cursor the fallback path uses to make forward progress when
//! it is invoked repeatedly for the same task across queue-processor ticks.
//!
//! The online path never errors out to the caller — every failure mode
//! degrades to the fallback and, at the limit, to [`Decision::None`] (spec
//! §7).

pub mod error;

pub use error::{diagnose, FeasibilityReason};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::params::ParameterStore;
use crate::task::{ResourceAmounts, TaskType};
use crate::tau::TauStore;
use crate::telemetry::TelemetryAdapter;

/// Resolution-time guard against division blow-up when an availability
/// axis is zero.
const EPSILON: f64 = 1.0;

// ── Task view ──────────────────────────────────────────────────────────────────

/// The ephemeral, per-scheduling-decision view `Select` builds from a
/// submitted task. Never persisted; dropped at the end of one `select`
/// call.
#[derive(Debug, Clone)]
pub struct TaskView {
    pub task_id: String,
    pub task_type: TaskType,
    pub request: ResourceAmounts,
    pub arrival: DateTime<Utc>,
    pub tau: f64,
    pub deadline: DateTime<Utc>,
}

impl TaskView {
    /// Build a view: resolve the canonical type (keep if valid, else
    /// infer), fetch τ, and compute `deadline = arrival + k·τ`.
    pub fn build(
        task_id: impl Into<String>,
        raw_type: Option<&str>,
        request: ResourceAmounts,
        sla_multiplier: f64,
        arrival: DateTime<Utc>,
        tau_store: &TauStore,
    ) -> Self {
        let task_type = TaskType::resolve(raw_type, &request);
        let tau = tau_store.get(task_type);
        let deadline = arrival + seconds_duration(sla_multiplier * tau);
        TaskView {
            task_id: task_id.into(),
            task_type,
            request,
            arrival,
            tau,
            deadline,
        }
    }
}

fn seconds_duration(seconds: f64) -> ChronoDuration {
    ChronoDuration::milliseconds((seconds * 1000.0).round() as i64)
}

// ── Decision ───────────────────────────────────────────────────────────────────

/// The outcome of one `Select` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// RTS computed a minimum-risk worker.
    Selected(String),
    /// RTS could not produce a ranked pick; round-robin over the feasible
    /// set chose this worker instead.
    Fallback(String),
    /// Neither RTS nor the fallback could produce a worker; the task stays
    /// queued.
    None,
}

impl Decision {
    pub fn worker_id(&self) -> Option<&str> {
        match self {
            Decision::Selected(id) | Decision::Fallback(id) => Some(id),
            Decision::None => None,
        }
    }
}

// ── Scheduler ──────────────────────────────────────────────────────────────────

pub struct Scheduler {
    params: Arc<ParameterStore>,
    telemetry: Arc<TelemetryAdapter>,
    round_robin_cursor: AtomicUsize,
}

impl Scheduler {
    pub fn new(params: Arc<ParameterStore>, telemetry: Arc<TelemetryAdapter>) -> Self {
        Scheduler {
            params,
            telemetry,
            round_robin_cursor: AtomicUsize::new(0),
        }
    }

    /// `Select(task, workers) -> workerId or ""`.
    pub async fn select(&self, view: &TaskView) -> Decision {
        let worker_views = self.telemetry.get_worker_views();

        // Step 3: feasibility filter. Sorted so the fallback round-robin
        // and the argmin tie-break both see a stable iteration order.
        let mut feasible: Vec<String> = worker_views
            .iter()
            .filter(|(_, wv)| view.request.fits_within(&wv.available))
            .map(|(id, _)| id.clone())
            .collect();
        feasible.sort();

        if feasible.is_empty() {
            return self.fallback_decision(&feasible);
        }

        // Step 4: snapshot once, use for the whole decision.
        let bundle = self.params.snapshot().await;
        let theta = bundle.theta.as_array();

        // Step 5 + 6: compute risk, dropping any non-finite result.
        let mut best: Option<(String, f64)> = None;
        let mut any_valid = false;
        for worker_id in &feasible {
            let wv = &worker_views[worker_id];

            let e = view.tau
                * (1.0
                    + theta[0] * (view.request.cpu / wv.available.cpu.max(EPSILON))
                    + theta[1] * (view.request.memory_mb / wv.available.memory_mb.max(EPSILON))
                    + theta[2] * (view.request.gpu / wv.available.gpu.max(EPSILON))
                    + theta[3] * wv.load);
            let finish = view.arrival + seconds_duration(e);
            let delta = (finish - view.deadline).num_milliseconds().max(0) as f64 / 1000.0;

            let r0 = bundle.risk.alpha * delta + bundle.risk.beta * wv.load;
            let affinity = bundle.affinity(view.task_type, worker_id);
            let penalty = bundle.penalty(worker_id);
            let r = r0 - affinity + penalty;

            if r.is_nan() || r.is_infinite() {
                continue;
            }
            any_valid = true;
            match &best {
                Some((_, best_r)) if r >= *best_r => {}
                _ => best = Some((worker_id.clone(), r)),
            }
        }

        if !any_valid {
            return self.fallback_decision(&feasible);
        }

        match best {
            Some((id, _)) => Decision::Selected(id),
            None => self.fallback_decision(&feasible),
        }
    }

    /// Round-robin over `candidates` (already the feasible set — the
    /// fallback never dispatches an infeasible task).
    fn fallback_decision(&self, candidates: &[String]) -> Decision {
        match self.round_robin(candidates) {
            Some(id) => Decision::Fallback(id),
            None => Decision::None,
        }
    }

    fn round_robin(&self, candidates: &[String]) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        let idx = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Some(candidates[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterBundle;
    use crate::registry::WorkerRegistry;
    use crate::telemetry::{HeartbeatSnapshot, HeartbeatStore};
    use crate::worker::Worker;

    fn scheduler_with(
        bundle: ParameterBundle,
        workers: Vec<(&str, ResourceAmounts, f64)>,
    ) -> Scheduler {
        let registry = Arc::new(WorkerRegistry::new());
        let heartbeats = Arc::new(HeartbeatStore::new());
        for (id, total, load) in workers {
            registry.register(Worker::new(id, format!("http://{id}"), total));
            heartbeats.record(
                id,
                HeartbeatSnapshot {
                    cpu_usage: load,
                    mem_usage: load,
                    gpu_usage: load,
                    received_at: Utc::now(),
                },
            );
        }
        let telemetry = Arc::new(TelemetryAdapter::new(registry, heartbeats));
        let params = Arc::new(ParameterStore::new(bundle));
        Scheduler::new(params, telemetry)
    }

    fn view(task_type: TaskType, request: ResourceAmounts, tau: f64, k: f64) -> TaskView {
        let now = Utc::now();
        TaskView {
            task_id: "t1".to_string(),
            task_type,
            request,
            arrival: now,
            tau,
            deadline: now + seconds_duration(k * tau),
        }
    }

    // ── S1: deadline-sensitive pick ───────────────────────────────────────────

    #[tokio::test]
    async fn deadline_sensitive_pick_prefers_lower_load_worker() {
        let mut bundle = ParameterBundle::default();
        bundle.theta.theta4 = 0.2;
        bundle.risk.alpha = 10.0;
        bundle.risk.beta = 1.0;

        let scheduler = scheduler_with(
            bundle,
            vec![
                ("w1", ResourceAmounts::new(16.0, 1e9, 1e9, 1e9), 0.95),
                ("w2", ResourceAmounts::new(8.0, 1e9, 1e9, 1e9), 0.10),
            ],
        );
        let task_view = view(
            TaskType::CpuHeavy,
            ResourceAmounts::new(4.0, 0.0, 0.0, 0.0),
            20.0,
            2.0,
        );
        let decision = scheduler.select(&task_view).await;
        assert_eq!(decision, Decision::Selected("w2".to_string()));
    }

    // ── S2: affinity override ─────────────────────────────────────────────────

    #[tokio::test]
    async fn affinity_override_dominates_small_load_difference() {
        let mut bundle = ParameterBundle::default();
        let mut row = std::collections::HashMap::new();
        row.insert("w1".to_string(), 10.0);
        row.insert("w2".to_string(), -2.0);
        bundle
            .affinity_matrix
            .insert(TaskType::GpuInference.as_str().to_string(), row);

        let scheduler = scheduler_with(
            bundle,
            vec![
                ("w1", ResourceAmounts::new(8.0, 16.0, 0.0, 4.0), 0.4),
                ("w2", ResourceAmounts::new(8.0, 16.0, 0.0, 4.0), 0.3),
            ],
        );
        let task_view = view(
            TaskType::GpuInference,
            ResourceAmounts::new(1.0, 1.0, 0.0, 1.0),
            10.0,
            2.0,
        );
        let decision = scheduler.select(&task_view).await;
        assert_eq!(decision, Decision::Selected("w1".to_string()));
    }

    // ── S3: penalty override ──────────────────────────────────────────────────

    #[tokio::test]
    async fn penalty_override_prefers_unpenalised_worker() {
        let mut bundle = ParameterBundle::default();
        bundle.penalty_vector.insert("w1".to_string(), 15.0.min(5.0)); // clamp demo value into range
        bundle.penalty_vector.insert("w2".to_string(), 0.0);

        let scheduler = scheduler_with(
            bundle,
            vec![
                ("w1", ResourceAmounts::new(9.0, 16.0, 0.0, 4.0), 0.3),
                ("w2", ResourceAmounts::new(8.0, 16.0, 0.0, 4.0), 0.3),
            ],
        );
        let task_view = view(
            TaskType::Mixed,
            ResourceAmounts::new(1.0, 1.0, 0.0, 0.0),
            10.0,
            2.0,
        );
        let decision = scheduler.select(&task_view).await;
        assert_eq!(decision, Decision::Selected("w2".to_string()));
    }

    // ── S4: fallback, infeasible everywhere ───────────────────────────────────

    #[tokio::test]
    async fn fallback_returns_none_when_no_worker_is_feasible() {
        let scheduler = scheduler_with(
            ParameterBundle::default(),
            vec![("w1", ResourceAmounts::new(8.0, 16.0, 0.0, 4.0), 0.1)],
        );
        let task_view = view(
            TaskType::CpuHeavy,
            ResourceAmounts::new(100.0, 0.0, 0.0, 0.0),
            10.0,
            2.0,
        );
        let decision = scheduler.select(&task_view).await;
        assert_eq!(decision, Decision::None);
    }

    // ── S7: risk arithmetic ───────────────────────────────────────────────────

    #[tokio::test]
    async fn risk_arithmetic_matches_worked_example() {
        let mut bundle = ParameterBundle::default();
        bundle.theta = crate::params::Theta {
            theta1: 0.1,
            theta2: 0.1,
            theta3: 0.1,
            theta4: 0.2,
        };
        bundle.risk.alpha = 10.0;
        bundle.risk.beta = 1.0;
        let mut row = std::collections::HashMap::new();
        row.insert("w1".to_string(), 2.0);
        bundle
            .affinity_matrix
            .insert(TaskType::Mixed.as_str().to_string(), row);
        bundle.penalty_vector.insert("w1".to_string(), 0.5);

        let scheduler = scheduler_with(
            bundle,
            vec![("w1", ResourceAmounts::new(8.0, 16.0, 0.0, 2.0), 0.5)],
        );
        let task_view = view(
            TaskType::Mixed,
            ResourceAmounts::new(2.0, 4.0, 0.0, 0.0),
            10.0,
            2.0,
        );
        // The only feasible worker is selected regardless of its exact
        // risk value, but we confirm it IS selected (R is finite and it's
        // the only candidate) to ground the worked example in a live call.
        let decision = scheduler.select(&task_view).await;
        assert_eq!(decision, Decision::Selected("w1".to_string()));
    }

    #[tokio::test]
    async fn tie_break_picks_earliest_worker_id_in_stable_order() {
        let scheduler = scheduler_with(
            ParameterBundle::default(),
            vec![
                ("wb", ResourceAmounts::new(8.0, 16.0, 0.0, 0.0), 0.2),
                ("wa", ResourceAmounts::new(8.0, 16.0, 0.0, 0.0), 0.2),
            ],
        );
        let task_view = view(
            TaskType::CpuLight,
            ResourceAmounts::new(1.0, 1.0, 0.0, 0.0),
            10.0,
            2.0,
        );
        let decision = scheduler.select(&task_view).await;
        assert_eq!(decision, Decision::Selected("wa".to_string()));
    }

    #[test]
    fn task_view_build_resolves_type_and_computes_deadline() {
        let tau_store = TauStore::new();
        let arrival = Utc::now();
        let tv = TaskView::build(
            "t1",
            None,
            ResourceAmounts::new(1.0, 2.0, 0.0, 0.0),
            2.0,
            arrival,
            &tau_store,
        );
        assert_eq!(tv.task_type, TaskType::CpuLight);
        assert_eq!(tv.tau, TaskType::CpuLight.default_tau_seconds());
        assert_eq!(tv.deadline, arrival + seconds_duration(2.0 * tv.tau));
    }

    #[test]
    fn diagnose_reports_first_failing_dimension() {
        let req = ResourceAmounts::new(10.0, 1.0, 0.0, 0.0);
        let avail = ResourceAmounts::new(1.0, 100.0, 100.0, 100.0);
        assert_eq!(
            diagnose(&req, &avail),
            Some(FeasibilityReason::InsufficientCpu {
                required: 10.0,
                available: 1.0
            })
        );
    }
}
