/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history window invalid: since ({since}) is after until ({until})")]
    InvalidWindow {
        since: chrono::DateTime<chrono::Utc>,
        until: chrono::DateTime<chrono::Utc>,
    },
}
