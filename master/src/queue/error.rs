/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use thiserror::Error;

/// Errors raised by the queue processor / resource accountant (C6).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("task {0} not found in persistent store")]
    TaskNotFound(String),

    #[error("worker {0} not found in registry")]
    WorkerNotFound(String),

    #[error("worker {worker_id} is no longer feasible for task {task_id} after recheck")]
    NotFeasibleAfterRecheck { worker_id: String, task_id: String },

    #[error("dispatch to worker {worker_id} failed: {message}")]
    DispatchFailed { worker_id: String, message: String },

    #[error("dispatch to worker {worker_id} timed out")]
    DispatchTimedOut { worker_id: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
