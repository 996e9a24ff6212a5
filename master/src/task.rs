/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures for the cluster master.
//!
//! Three distinct types model the lifecycle of one task through the
//! scheduling pipeline:
//!
//! ```text
//! submitter ──(SubmitTask proto)──►  Task  ──(RTS)──►  TaskView  ──(dispatch)──►  worker
//!                                     ↑ durable record     ↑ ephemeral, one per
//!                                     status machine         scheduling decision
//! ```
//!
//! # Ownership model
//! `Task` is the durable record owned by the [`crate::store::Store`]; the
//! queue processor (C6) reads and mutates it under the store's locking
//! discipline. `TaskView` is built fresh by the scheduler (C4) for every
//! `Select` call and dropped at the end of that call — it never outlives one
//! scheduling decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Canonical task type ───────────────────────────────────────────────────────

/// One of the six canonical task-type tags.
///
/// Any record or submission bearing a tag outside this set never reaches
/// this enum directly — it is resolved through [`TaskType::resolve`] first.
/// Carrying the typed enum through the whole pipeline (instead of a bare
/// `String`) makes it impossible to construct an invalid type inside the
/// scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    CpuLight,
    CpuHeavy,
    MemoryHeavy,
    GpuInference,
    GpuTraining,
    Mixed,
}

impl TaskType {
    /// All six canonical types.
    pub const ALL: [TaskType; 6] = [
        TaskType::CpuLight,
        TaskType::CpuHeavy,
        TaskType::MemoryHeavy,
        TaskType::GpuInference,
        TaskType::GpuTraining,
        TaskType::Mixed,
    ];

    /// The wire-format tag used in JSON, YAML, and proto `task_type` fields.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::CpuLight => "cpu-light",
            TaskType::CpuHeavy => "cpu-heavy",
            TaskType::MemoryHeavy => "memory-heavy",
            TaskType::GpuInference => "gpu-inference",
            TaskType::GpuTraining => "gpu-training",
            TaskType::Mixed => "mixed",
        }
    }

    /// Parse a strict canonical tag. Returns `None` for anything else,
    /// including the legacy tags handled by [`TaskType::resolve`].
    pub fn parse(s: &str) -> Option<TaskType> {
        Some(match s {
            "cpu-light" => TaskType::CpuLight,
            "cpu-heavy" => TaskType::CpuHeavy,
            "memory-heavy" => TaskType::MemoryHeavy,
            "gpu-inference" => TaskType::GpuInference,
            "gpu-training" => TaskType::GpuTraining,
            "mixed" => TaskType::Mixed,
            _ => return None,
        })
    }

    /// Per-type default τ seed (seconds), used by [`crate::tau::TauStore`]
    /// before any completion has been observed for the type.
    pub fn default_tau_seconds(self) -> f64 {
        match self {
            TaskType::CpuLight => 5.0,
            TaskType::CpuHeavy => 15.0,
            TaskType::MemoryHeavy => 20.0,
            TaskType::GpuInference => 10.0,
            TaskType::GpuTraining => 60.0,
            TaskType::Mixed => 10.0,
        }
    }

    /// Resolve the type a task should be scheduled and trained under.
    ///
    /// Order of resolution:
    /// 1. `raw` is already a canonical tag → keep it.
    /// 2. `raw` is a known legacy tag (`cpu`, `gpu`, `dl`) → map it.
    /// 3. Otherwise (including `raw == None`) → infer from the resource
    ///    request via the rule chain below.
    ///
    /// A task is never rejected for carrying an unknown type — it is always
    /// re-tagged, keeping the canonical-type invariant purely internal.
    pub fn resolve(raw: Option<&str>, request: &ResourceAmounts) -> TaskType {
        if let Some(raw) = raw {
            if let Some(canonical) = TaskType::parse(raw) {
                return canonical;
            }
            match raw {
                "cpu" => return TaskType::CpuLight,
                "gpu" => return TaskType::GpuInference,
                "dl" => return TaskType::GpuTraining,
                _ => {}
            }
        }
        Self::infer_from_resources(request)
    }

    /// The inference rule chain applied when no valid canonical or legacy
    /// type tag is present.
    fn infer_from_resources(r: &ResourceAmounts) -> TaskType {
        if r.gpu > 2.0 && r.cpu > 4.0 {
            TaskType::GpuTraining
        } else if r.gpu > 0.0 {
            TaskType::GpuInference
        } else if r.memory_mb > 8.0 {
            TaskType::MemoryHeavy
        } else if r.cpu > 4.0 {
            TaskType::CpuHeavy
        } else if r.cpu > 0.0 {
            TaskType::CpuLight
        } else {
            TaskType::Mixed
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Resource amounts ──────────────────────────────────────────────────────────

/// A resource request or allocation on all four dimensions the accountant
/// tracks. Units are whatever the caller's registry uses consistently (e.g.
/// cores, megabytes, GPU units) — the scheduler and accountant never assume
/// a particular scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceAmounts {
    pub cpu: f64,
    pub memory_mb: f64,
    pub storage_mb: f64,
    pub gpu: f64,
}

impl ResourceAmounts {
    pub fn new(cpu: f64, memory_mb: f64, storage_mb: f64, gpu: f64) -> Self {
        Self {
            cpu,
            memory_mb,
            storage_mb,
            gpu,
        }
    }

    /// `true` iff all four dimensions are `>= 0`. Required of every
    /// submitted task request.
    pub fn is_non_negative(&self) -> bool {
        self.cpu >= 0.0 && self.memory_mb >= 0.0 && self.storage_mb >= 0.0 && self.gpu >= 0.0
    }

    /// `true` iff `self` (a task request) fits within `avail` on every
    /// dimension — the feasibility predicate used by the scheduler.
    pub fn fits_within(&self, avail: &ResourceAmounts) -> bool {
        self.cpu <= avail.cpu
            && self.memory_mb <= avail.memory_mb
            && self.storage_mb <= avail.storage_mb
            && self.gpu <= avail.gpu
    }

    /// Elementwise sum.
    pub fn plus(&self, other: &ResourceAmounts) -> ResourceAmounts {
        ResourceAmounts {
            cpu: self.cpu + other.cpu,
            memory_mb: self.memory_mb + other.memory_mb,
            storage_mb: self.storage_mb + other.storage_mb,
            gpu: self.gpu + other.gpu,
        }
    }

    /// Elementwise difference, clamped to zero on each dimension. Used for
    /// resource release where drift could otherwise push a dimension
    /// negative.
    pub fn minus_clamped(&self, other: &ResourceAmounts) -> ResourceAmounts {
        ResourceAmounts {
            cpu: (self.cpu - other.cpu).max(0.0),
            memory_mb: (self.memory_mb - other.memory_mb).max(0.0),
            storage_mb: (self.storage_mb - other.storage_mb).max(0.0),
            gpu: (self.gpu - other.gpu).max(0.0),
        }
    }

    /// `true` iff the subtraction in [`ResourceAmounts::minus_clamped`] would
    /// have clamped at least one dimension — i.e. `other` exceeds `self`
    /// somewhere. Used to decide whether to log the defensive warning.
    pub fn would_underflow(&self, other: &ResourceAmounts) -> bool {
        self.cpu < other.cpu
            || self.memory_mb < other.memory_mb
            || self.storage_mb < other.storage_mb
            || self.gpu < other.gpu
    }
}

// ── Task status ───────────────────────────────────────────────────────────────

/// Task lifecycle status. Transitions are monotonic:
/// `queued → running → {completed|failed|cancelled}`. `Cancelled` is sticky —
/// no later report may overwrite it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// `true` iff moving from `self` to `next` is a legal transition.
    ///
    /// `Completed`, `Failed`, and `Cancelled` are terminal: no transition out
    /// of any of them is legal, matching the "cancelled is sticky" rule.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

// ── SLA multiplier ────────────────────────────────────────────────────────────

/// Default SLA multiplier `k` applied when a submission omits one.
pub const DEFAULT_SLA_MULTIPLIER: f64 = 2.0;

/// Valid inclusive range for `k`.
pub const SLA_MULTIPLIER_RANGE: std::ops::RangeInclusive<f64> = 1.5..=2.5;

/// Clamp a caller-supplied SLA multiplier into the valid range, substituting
/// the default when `None` is supplied.
pub fn normalize_sla_multiplier(k: Option<f64>) -> f64 {
    let k = k.unwrap_or(DEFAULT_SLA_MULTIPLIER);
    k.clamp(*SLA_MULTIPLIER_RANGE.start(), *SLA_MULTIPLIER_RANGE.end())
}

// ── Task (durable record) ──────────────────────────────────────────────────────

/// The durable record for one submitted task, owned by the
/// [`crate::store::Store`]'s `tasks` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    /// The type tag as resolved at submission time — already canonical.
    pub task_type: TaskType,
    pub request: ResourceAmounts,
    /// `k` in `deadline = arrival + k·τ`, already clamped to
    /// [`SLA_MULTIPLIER_RANGE`].
    pub sla_multiplier: f64,
    pub docker_image: String,
    pub command: Vec<String>,
    pub status: TaskStatus,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Attempt the transition `self.status -> next`, honouring monotonicity
    /// and cancellation stickiness. Returns `false` (no-op) if illegal.
    pub fn try_transition(&mut self, next: TaskStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── TaskType::parse / resolve ─────────────────────────────────────────────

    #[test]
    fn parse_accepts_all_canonical_tags() {
        for t in TaskType::ALL {
            assert_eq!(TaskType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn parse_rejects_unknown_tag() {
        assert_eq!(TaskType::parse("quantum"), None);
    }

    #[test]
    fn resolve_keeps_valid_canonical_tag_even_if_resources_would_infer_differently() {
        let r = ResourceAmounts::new(0.5, 1.0, 0.0, 0.0); // would infer cpu-light
        assert_eq!(
            TaskType::resolve(Some("gpu-training"), &r),
            TaskType::GpuTraining
        );
    }

    #[test]
    fn resolve_maps_legacy_tags() {
        let r = ResourceAmounts::default();
        assert_eq!(TaskType::resolve(Some("cpu"), &r), TaskType::CpuLight);
        assert_eq!(TaskType::resolve(Some("gpu"), &r), TaskType::GpuInference);
        assert_eq!(TaskType::resolve(Some("dl"), &r), TaskType::GpuTraining);
    }

    #[test]
    fn resolve_infers_gpu_training_when_gpu_and_cpu_both_high() {
        let r = ResourceAmounts::new(8.0, 2.0, 0.0, 4.0);
        assert_eq!(TaskType::resolve(None, &r), TaskType::GpuTraining);
    }

    #[test]
    fn resolve_infers_gpu_inference_when_only_gpu_present() {
        let r = ResourceAmounts::new(1.0, 2.0, 0.0, 1.0);
        assert_eq!(TaskType::resolve(None, &r), TaskType::GpuInference);
    }

    #[test]
    fn resolve_infers_memory_heavy() {
        let r = ResourceAmounts::new(1.0, 16.0, 0.0, 0.0);
        assert_eq!(TaskType::resolve(None, &r), TaskType::MemoryHeavy);
    }

    #[test]
    fn resolve_infers_cpu_heavy() {
        let r = ResourceAmounts::new(6.0, 2.0, 0.0, 0.0);
        assert_eq!(TaskType::resolve(None, &r), TaskType::CpuHeavy);
    }

    #[test]
    fn resolve_infers_cpu_light() {
        let r = ResourceAmounts::new(1.0, 2.0, 0.0, 0.0);
        assert_eq!(TaskType::resolve(None, &r), TaskType::CpuLight);
    }

    #[test]
    fn resolve_infers_mixed_for_all_zero_request() {
        let r = ResourceAmounts::default();
        assert_eq!(TaskType::resolve(None, &r), TaskType::Mixed);
    }

    #[test]
    fn resolve_unknown_tag_falls_back_to_inference_not_rejection() {
        let r = ResourceAmounts::new(1.0, 2.0, 0.0, 0.0);
        assert_eq!(TaskType::resolve(Some("bogus"), &r), TaskType::CpuLight);
    }

    // ── ResourceAmounts ───────────────────────────────────────────────────────

    #[test]
    fn fits_within_checks_all_four_dimensions() {
        let req = ResourceAmounts::new(2.0, 4.0, 0.0, 0.0);
        let avail_ok = ResourceAmounts::new(2.0, 4.0, 0.0, 0.0);
        let avail_short = ResourceAmounts::new(1.9, 4.0, 0.0, 0.0);
        assert!(req.fits_within(&avail_ok));
        assert!(!req.fits_within(&avail_short));
    }

    #[test]
    fn minus_clamped_never_goes_negative() {
        let total = ResourceAmounts::new(1.0, 1.0, 1.0, 1.0);
        let too_much = ResourceAmounts::new(2.0, 0.5, 3.0, 0.0);
        let result = total.minus_clamped(&too_much);
        assert_eq!(result.cpu, 0.0);
        assert_eq!(result.memory_mb, 0.5);
        assert_eq!(result.storage_mb, 0.0);
        assert_eq!(result.gpu, 1.0);
    }

    #[test]
    fn would_underflow_detects_any_dimension_exceeding() {
        let total = ResourceAmounts::new(1.0, 1.0, 1.0, 1.0);
        assert!(total.would_underflow(&ResourceAmounts::new(2.0, 0.0, 0.0, 0.0)));
        assert!(!total.would_underflow(&ResourceAmounts::new(1.0, 1.0, 1.0, 1.0)));
    }

    #[test]
    fn is_non_negative_rejects_any_negative_dimension() {
        assert!(ResourceAmounts::new(0.0, 0.0, 0.0, 0.0).is_non_negative());
        assert!(!ResourceAmounts::new(-1.0, 0.0, 0.0, 0.0).is_non_negative());
    }

    // ── TaskStatus ────────────────────────────────────────────────────────────

    #[test]
    fn queued_can_only_move_to_running_or_cancelled() {
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Cancelled));
        assert!(!TaskStatus::Queued.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn cancelled_is_terminal_and_sticky() {
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn completed_never_transitions_back_to_running() {
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Running));
    }

    #[test]
    fn try_transition_on_task_respects_sticky_cancellation() {
        let mut task = Task {
            id: "t1".into(),
            user_id: "u1".into(),
            task_type: TaskType::CpuLight,
            request: ResourceAmounts::default(),
            sla_multiplier: DEFAULT_SLA_MULTIPLIER,
            docker_image: "img".into(),
            command: vec![],
            status: TaskStatus::Cancelled,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        assert!(!task.try_transition(TaskStatus::Completed));
        assert_eq!(task.status, TaskStatus::Cancelled);
    }

    // ── SLA multiplier ────────────────────────────────────────────────────────

    #[test]
    fn normalize_sla_multiplier_uses_default_when_absent() {
        assert_eq!(normalize_sla_multiplier(None), DEFAULT_SLA_MULTIPLIER);
    }

    #[test]
    fn normalize_sla_multiplier_clamps_out_of_range_values() {
        assert_eq!(normalize_sla_multiplier(Some(0.5)), 1.5);
        assert_eq!(normalize_sla_multiplier(Some(5.0)), 2.5);
        assert_eq!(normalize_sla_multiplier(Some(2.2)), 2.2);
    }
}
