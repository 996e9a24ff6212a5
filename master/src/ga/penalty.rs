/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Penalty vector builder: a per-worker demerit from SLA violations,
//! overload time, and energy usage.

use std::collections::HashMap;

use crate::history::WorkerStatsRecord;
use crate::params::PenaltyWeights;

/// Build the penalty vector: one entry per worker present in `stats`,
/// clipped to `[0, +5]`.
pub fn build_penalty_vector(
    stats: &[WorkerStatsRecord],
    weights: PenaltyWeights,
) -> HashMap<String, f64> {
    let max_energy = stats
        .iter()
        .map(|s| s.cpu_seconds + s.mem_seconds + s.gpu_seconds)
        .fold(0.0_f64, f64::max);

    stats
        .iter()
        .map(|s| {
            let sla_fail = s.sla_violation_rate();
            let overload_rate = s.overload_rate();
            let energy = s.cpu_seconds + s.mem_seconds + s.gpu_seconds;
            let energy_norm = if max_energy > 0.0 { energy / max_energy } else { 0.0 };
            let penalty =
                weights.g1 * sla_fail + weights.g2 * overload_rate + weights.g3 * energy_norm;
            (s.worker_id.clone(), penalty.clamp(0.0, 5.0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stats(worker_id: &str, tasks_run: u64, violations: u64, energy: f64) -> WorkerStatsRecord {
        let now = Utc::now();
        WorkerStatsRecord {
            worker_id: worker_id.to_string(),
            tasks_run,
            sla_violations: violations,
            total_runtime_seconds: 100.0,
            cpu_seconds: energy,
            mem_seconds: 0.0,
            gpu_seconds: 0.0,
            overload_time_seconds: 10.0,
            total_observation_seconds: 100.0,
            average_load: 0.5,
            window_since: now,
            window_until: now,
        }
    }

    #[test]
    fn penalty_has_one_entry_per_worker() {
        let vector = build_penalty_vector(
            &[stats("w1", 10, 2, 50.0), stats("w2", 10, 0, 100.0)],
            PenaltyWeights { g1: 2.0, g2: 1.0, g3: 0.5 },
        );
        assert_eq!(vector.len(), 2);
    }

    #[test]
    fn worker_with_more_violations_and_energy_gets_higher_penalty() {
        let vector = build_penalty_vector(
            &[stats("reliable", 10, 0, 10.0), stats("unreliable", 10, 8, 100.0)],
            PenaltyWeights { g1: 2.0, g2: 1.0, g3: 0.5 },
        );
        assert!(vector["unreliable"] > vector["reliable"]);
    }

    #[test]
    fn penalty_is_clipped_to_zero_to_five() {
        let vector = build_penalty_vector(
            &[stats("w1", 10, 10, 1e9)],
            PenaltyWeights { g1: 2.0, g2: 1.0, g3: 0.5 },
        );
        assert!(vector["w1"] <= 5.0);
        assert!(vector["w1"] >= 0.0);
    }

    #[test]
    fn empty_stats_yields_empty_vector() {
        assert!(build_penalty_vector(&[], PenaltyWeights { g1: 2.0, g2: 1.0, g3: 0.5 }).is_empty());
    }
}
