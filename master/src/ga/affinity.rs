/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Affinity matrix builder: how well each worker has historically suited
//! each task type.

use std::collections::HashMap;

use crate::history::TaskHistoryRecord;
use crate::params::AffinityWeights;
use crate::task::TaskType;

const MIN_RECORDS_FOR_AFFINITY: usize = 3;

struct PairStats {
    count: usize,
    total_runtime: f64,
    violations: usize,
    total_load: f64,
}

impl PairStats {
    fn mean_runtime(&self) -> f64 {
        self.total_runtime / self.count as f64
    }
    fn mean_load(&self) -> f64 {
        self.total_load / self.count as f64
    }
    fn sla_reliability(&self) -> f64 {
        1.0 - (self.violations as f64 / self.count as f64)
    }
}

/// Build a complete matrix with exactly six outer keys (one per canonical
/// type), each mapping observed workers to a clipped affinity score. Pairs
/// with fewer than [`MIN_RECORDS_FOR_AFFINITY`] records are omitted (the
/// accessor already treats an absent entry as `0`).
pub fn build_affinity_matrix(
    history: &[TaskHistoryRecord],
    weights: AffinityWeights,
) -> HashMap<String, HashMap<String, f64>> {
    let mut baseline_totals: HashMap<TaskType, (f64, usize)> = HashMap::new();
    let mut pair_stats: HashMap<(TaskType, String), PairStats> = HashMap::new();

    for record in history {
        let baseline = baseline_totals.entry(record.task_type).or_insert((0.0, 0));
        baseline.0 += record.actual_runtime_seconds;
        baseline.1 += 1;

        let stats = pair_stats
            .entry((record.task_type, record.worker_id.clone()))
            .or_insert(PairStats {
                count: 0,
                total_runtime: 0.0,
                violations: 0,
                total_load: 0.0,
            });
        stats.count += 1;
        stats.total_runtime += record.actual_runtime_seconds;
        stats.total_load += record.load_at_start;
        if !record.sla_success {
            stats.violations += 1;
        }
    }

    let mut matrix: HashMap<String, HashMap<String, f64>> = TaskType::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), HashMap::new()))
        .collect();

    for ((task_type, worker_id), stats) in &pair_stats {
        if stats.count < MIN_RECORDS_FOR_AFFINITY {
            continue;
        }
        let Some((baseline_total, baseline_count)) = baseline_totals.get(task_type) else {
            continue;
        };
        let baseline_runtime = baseline_total / *baseline_count as f64;
        let worker_avg = stats.mean_runtime();
        if worker_avg <= 0.0 {
            continue;
        }
        let speed = baseline_runtime / worker_avg;
        let affinity = weights.a1 * speed + weights.a2 * stats.sla_reliability()
            - weights.a3 * stats.mean_load();
        matrix
            .get_mut(task_type.as_str())
            .expect("all six canonical types are pre-populated")
            .insert(worker_id.clone(), affinity.clamp(-5.0, 5.0));
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ResourceAmounts;
    use chrono::Utc;

    fn record(worker_id: &str, runtime: f64, success: bool, load: f64) -> TaskHistoryRecord {
        let now = Utc::now();
        TaskHistoryRecord {
            task_id: uuid::Uuid::new_v4().to_string(),
            worker_id: worker_id.to_string(),
            task_type: TaskType::CpuHeavy,
            arrival: now,
            deadline: now,
            start: now,
            finish: now,
            actual_runtime_seconds: runtime,
            sla_success: success,
            request: ResourceAmounts::new(1.0, 1.0, 0.0, 0.0),
            load_at_start: load,
            available_at_start: ResourceAmounts::new(8.0, 16.0, 0.0, 2.0),
            tau_used: 15.0,
            k_used: 2.0,
        }
    }

    #[test]
    fn result_always_has_exactly_six_outer_keys() {
        let matrix = build_affinity_matrix(&[], AffinityWeights { a1: 1.0, a2: 2.0, a3: 0.5 });
        assert_eq!(matrix.len(), 6);
        for t in TaskType::ALL {
            assert!(matrix.contains_key(t.as_str()));
        }
    }

    #[test]
    fn pair_with_fewer_than_three_records_is_omitted() {
        let history = vec![record("w1", 10.0, true, 0.3), record("w1", 12.0, true, 0.2)];
        let matrix = build_affinity_matrix(&history, AffinityWeights { a1: 1.0, a2: 2.0, a3: 0.5 });
        assert!(matrix[TaskType::CpuHeavy.as_str()].is_empty());
    }

    #[test]
    fn faster_worker_gets_higher_affinity_than_slower_one() {
        let mut history = vec![];
        for _ in 0..5 {
            history.push(record("fast", 5.0, true, 0.1));
            history.push(record("slow", 20.0, true, 0.1));
        }
        let matrix = build_affinity_matrix(&history, AffinityWeights { a1: 1.0, a2: 2.0, a3: 0.5 });
        let row = &matrix[TaskType::CpuHeavy.as_str()];
        assert!(row["fast"] > row["slow"]);
    }

    #[test]
    fn affinity_is_clipped_to_plus_minus_five() {
        let mut history = vec![];
        for _ in 0..5 {
            history.push(record("w1", 1000.0, true, 0.0));
            history.push(record("w2", 0.001, true, 0.0));
        }
        let matrix = build_affinity_matrix(&history, AffinityWeights { a1: 1.0, a2: 2.0, a3: 0.5 });
        let row = &matrix[TaskType::CpuHeavy.as_str()];
        assert!(row["w2"] <= 5.0);
        assert!(row["w1"] >= -5.0);
    }
}
