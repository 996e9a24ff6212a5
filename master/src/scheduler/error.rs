/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured rejection reasons for the RTS scheduler.
//!
//! The live `Select` call (see [`super::Scheduler::select`]) never surfaces
//! an error to the submitter — every failure degrades to the fallback and,
//! in the limit, to [`super::Decision::None`]. [`FeasibilityReason`] exists
//! for the offline/test surface: unit tests assert the *exact* reason a
//! worker was dropped from the feasible set, with exact resource values
//! carried for assertions and logging.

/// Why a specific worker failed the feasibility filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeasibilityReason {
    InsufficientCpu { required: f64, available: f64 },
    InsufficientMemory { required: f64, available: f64 },
    InsufficientStorage { required: f64, available: f64 },
    InsufficientGpu { required: f64, available: f64 },
}

impl std::fmt::Display for FeasibilityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeasibilityReason::InsufficientCpu { required, available } => {
                write!(f, "requires {required} cpu but only {available} available")
            }
            FeasibilityReason::InsufficientMemory { required, available } => {
                write!(f, "requires {required}MB memory but only {available}MB available")
            }
            FeasibilityReason::InsufficientStorage { required, available } => {
                write!(f, "requires {required}MB storage but only {available}MB available")
            }
            FeasibilityReason::InsufficientGpu { required, available } => {
                write!(f, "requires {required} gpu but only {available} available")
            }
        }
    }
}

/// Diagnose exactly why `request` does not fit within `available`, for the
/// first dimension (in cpu/mem/storage/gpu order) that fails. Returns
/// `None` if it actually fits — callers use this only after a feasibility
/// check has already failed.
pub fn diagnose(
    request: &crate::task::ResourceAmounts,
    available: &crate::task::ResourceAmounts,
) -> Option<FeasibilityReason> {
    if request.cpu > available.cpu {
        return Some(FeasibilityReason::InsufficientCpu {
            required: request.cpu,
            available: available.cpu,
        });
    }
    if request.memory_mb > available.memory_mb {
        return Some(FeasibilityReason::InsufficientMemory {
            required: request.memory_mb,
            available: available.memory_mb,
        });
    }
    if request.storage_mb > available.storage_mb {
        return Some(FeasibilityReason::InsufficientStorage {
            required: request.storage_mb,
            available: available.storage_mb,
        });
    }
    if request.gpu > available.gpu {
        return Some(FeasibilityReason::InsufficientGpu {
            required: request.gpu,
            available: available.gpu,
        });
    }
    None
}
