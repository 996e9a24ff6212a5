/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use thiserror::Error;

/// Errors raised by the AOD/GA epoch runner (C7).
#[derive(Debug, Error)]
pub enum GaError {
    #[error("history query failed: {0}")]
    History(#[from] crate::history::HistoryError),

    #[error("failed to save evolved parameter bundle: {0}")]
    Save(#[from] crate::params::ParamError),
}
