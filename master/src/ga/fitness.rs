/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fitness function for scoring a trailing history/stats window.
//!
//! `F = 3·SLASuccess + 1·Utilisation − 0.5·EnergyNorm − 1.5·OverloadNorm`.
//! Weights fixed at `(3.0, 1.0, 0.5, 1.5)` — the Open Question resolution
//! recorded in DESIGN.md.

use crate::history::{TaskHistoryRecord, WorkerStatsRecord};

pub const W_SLA_SUCCESS: f64 = 3.0;
pub const W_UTILISATION: f64 = 1.0;
pub const W_ENERGY: f64 = 0.5;
pub const W_OVERLOAD: f64 = 1.5;

/// Compute fitness from a history window and its per-worker aggregate
/// stats. Every metric is clamped to `[0, 1]` before weighting; no
/// normalisation is applied beyond that per-metric clamp.
pub fn fitness(history: &[TaskHistoryRecord], stats: &[WorkerStatsRecord]) -> f64 {
    let sla_success = sla_success_rate(history);
    let utilisation = mean_utilisation(stats);
    let energy_norm = mean_energy_norm(stats);
    let overload_norm = mean_overload_norm(stats);

    W_SLA_SUCCESS * sla_success + W_UTILISATION * utilisation
        - W_ENERGY * energy_norm
        - W_OVERLOAD * overload_norm
}

fn sla_success_rate(history: &[TaskHistoryRecord]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let successes = history.iter().filter(|r| r.sla_success).count();
    (successes as f64 / history.len() as f64).clamp(0.0, 1.0)
}

fn mean_utilisation(stats: &[WorkerStatsRecord]) -> f64 {
    if stats.is_empty() {
        return 0.0;
    }
    let mean = stats.iter().map(|s| s.average_load).sum::<f64>() / stats.len() as f64;
    mean.clamp(0.0, 1.0)
}

fn mean_energy_norm(stats: &[WorkerStatsRecord]) -> f64 {
    if stats.is_empty() {
        return 0.0;
    }
    let max_energy = stats
        .iter()
        .map(|s| s.cpu_seconds + s.mem_seconds + s.gpu_seconds)
        .fold(0.0_f64, f64::max);
    if max_energy <= 0.0 {
        return 0.0;
    }
    let mean = stats
        .iter()
        .map(|s| (s.cpu_seconds + s.mem_seconds + s.gpu_seconds) / max_energy)
        .sum::<f64>()
        / stats.len() as f64;
    mean.clamp(0.0, 1.0)
}

fn mean_overload_norm(stats: &[WorkerStatsRecord]) -> f64 {
    if stats.is_empty() {
        return 0.0;
    }
    let mean = stats.iter().map(|s| s.overload_rate()).sum::<f64>() / stats.len() as f64;
    mean.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ResourceAmounts, TaskType};
    use chrono::Utc;

    fn history_row(sla_success: bool) -> TaskHistoryRecord {
        let now = Utc::now();
        TaskHistoryRecord {
            task_id: "t".to_string(),
            worker_id: "w1".to_string(),
            task_type: TaskType::CpuLight,
            arrival: now,
            deadline: now,
            start: now,
            finish: now,
            actual_runtime_seconds: 5.0,
            sla_success,
            request: ResourceAmounts::new(1.0, 1.0, 0.0, 0.0),
            load_at_start: 0.3,
            available_at_start: ResourceAmounts::new(8.0, 16.0, 0.0, 2.0),
            tau_used: 5.0,
            k_used: 2.0,
        }
    }

    fn stats_row(average_load: f64, overload_time: f64, total_time: f64) -> WorkerStatsRecord {
        let now = Utc::now();
        WorkerStatsRecord {
            worker_id: "w1".to_string(),
            tasks_run: 10,
            sla_violations: 1,
            total_runtime_seconds: total_time,
            cpu_seconds: 10.0,
            mem_seconds: 5.0,
            gpu_seconds: 0.0,
            overload_time_seconds: overload_time,
            total_observation_seconds: total_time,
            average_load,
            window_since: now,
            window_until: now,
        }
    }

    #[test]
    fn empty_inputs_yield_zero_fitness() {
        assert_eq!(fitness(&[], &[]), 0.0);
    }

    #[test]
    fn all_successes_and_no_overload_beats_all_failures_and_overload() {
        let good_history = vec![history_row(true); 10];
        let good_stats = vec![stats_row(0.8, 0.0, 100.0)];
        let bad_history = vec![history_row(false); 10];
        let bad_stats = vec![stats_row(0.8, 100.0, 100.0)];

        assert!(fitness(&good_history, &good_stats) > fitness(&bad_history, &bad_stats));
    }
}
