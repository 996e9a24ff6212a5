/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Ridge-regressed runtime model: learns θ from history so
//! `E = τ·(1 + θ·features)` tracks observed runtimes.

use crate::history::TaskHistoryRecord;

const RIDGE_LAMBDA: f64 = 1e-3;
const DEFAULT_THETA_GENE: f64 = 0.1;

/// One training row: `[cpu/availCpu, mem/availMem, gpu/availGpu, loadAtStart]`
/// against target `y = (actualRuntime/τ) − 1`.
struct Row {
    x: [f64; 4],
    y: f64,
}

fn build_rows(history: &[TaskHistoryRecord]) -> Vec<Row> {
    history
        .iter()
        .filter(|r| r.tau_used > 0.0)
        .map(|r| Row {
            x: [
                r.request.cpu / r.available_at_start.cpu.max(1.0),
                r.request.memory_mb / r.available_at_start.memory_mb.max(1.0),
                r.request.gpu / r.available_at_start.gpu.max(1.0),
                r.load_at_start,
            ],
            y: (r.actual_runtime_seconds / r.tau_used) - 1.0,
        })
        .collect()
}

/// Solve `θ = (XᵀX + λI)⁻¹Xᵀy`, clip to `[0, 2]`, and substitute
/// [`DEFAULT_THETA_GENE`] for any non-finite component.
pub fn train_theta(history: &[TaskHistoryRecord]) -> [f64; 4] {
    let rows = build_rows(history);
    if rows.is_empty() {
        return [DEFAULT_THETA_GENE; 4];
    }

    let mut xtx = [[0.0_f64; 4]; 4];
    let mut xty = [0.0_f64; 4];
    for row in &rows {
        for i in 0..4 {
            xty[i] += row.x[i] * row.y;
            for j in 0..4 {
                xtx[i][j] += row.x[i] * row.x[j];
            }
        }
    }
    for i in 0..4 {
        xtx[i][i] += RIDGE_LAMBDA;
    }

    let theta = solve_4x4(xtx, xty).unwrap_or([DEFAULT_THETA_GENE; 4]);
    theta.map(|v| {
        if v.is_finite() {
            v.clamp(0.0, 2.0)
        } else {
            DEFAULT_THETA_GENE
        }
    })
}

/// Gaussian elimination with partial pivoting for a 4x4 system. Returns
/// `None` if the matrix is (numerically) singular.
fn solve_4x4(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> Option<[f64; 4]> {
    for col in 0..4 {
        let pivot_row = (col..4)
            .max_by(|&r1, &r2| a[r1][col].abs().partial_cmp(&a[r2][col].abs()).unwrap())
            .unwrap();
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..4 {
            a[col][j] /= pivot;
        }
        b[col] /= pivot;

        for row in 0..4 {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            for j in 0..4 {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }
    Some(b)
}
