/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use thiserror::Error;

/// Errors raised while loading, validating, or saving a [`super::ParameterBundle`].
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("cannot read parameter file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse parameter file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field} = {value} out of range {lo}..={hi}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        lo: f64,
        hi: f64,
    },

    #[error("affinity matrix outer key {0:?} is not one of the six canonical task types")]
    InvalidAffinityKey(String),
}
