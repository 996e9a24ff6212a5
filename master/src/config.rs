/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Process-environment configuration for the cluster master.
//!
//! Loaded once at startup from environment variables via `envy`, validated,
//! then wrapped in an `Arc` and shared read-only for the life of the
//! process — the same "load once, validate, never mutate" discipline the
//! node configuration layer uses for its YAML file, adapted to env-var
//! knobs instead of a per-node file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::task::{DEFAULT_SLA_MULTIPLIER, SLA_MULTIPLIER_RANGE};

/// Raw shape deserialised from environment variables (prefix `MASTER_`).
/// Every field has a default so a completely bare environment still loads.
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default = "default_sla_multiplier")]
    sla_multiplier_default: f64,
    #[serde(default = "default_ga_interval_secs")]
    ga_interval_secs: u64,
    #[serde(default = "default_param_reload_interval_secs")]
    param_reload_interval_secs: u64,
    #[serde(default = "default_queue_interval_secs")]
    queue_interval_secs: u64,
    #[serde(default = "default_history_window_hours")]
    history_window_hours: u64,
    #[serde(default = "default_min_history_for_ga")]
    min_history_for_ga: usize,
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
    #[serde(default = "default_param_file_name")]
    param_file_name: String,
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
}

fn default_sla_multiplier() -> f64 {
    DEFAULT_SLA_MULTIPLIER
}
fn default_ga_interval_secs() -> u64 {
    60
}
fn default_param_reload_interval_secs() -> u64 {
    30
}
fn default_queue_interval_secs() -> u64 {
    5
}
fn default_history_window_hours() -> u64 {
    24
}
fn default_min_history_for_ga() -> usize {
    10
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_param_file_name() -> String {
    "ga_output.json".to_string()
}
fn default_listen_addr() -> String {
    "0.0.0.0:7070".to_string()
}

/// Validated, immutable configuration for one master process.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub sla_multiplier_default: f64,
    pub ga_interval: Duration,
    pub param_reload_interval: Duration,
    pub queue_interval: Duration,
    pub history_window: chrono::Duration,
    pub min_history_for_ga: usize,
    pub data_dir: PathBuf,
    pub param_file_path: PathBuf,
    pub listen_addr: String,
}

impl MasterConfig {
    /// Load from `MASTER_*` environment variables, falling back to
    /// documented defaults for anything unset, then validate ranges.
    pub fn load_from_env() -> Result<Self> {
        let raw: RawConfig = envy::prefixed("MASTER_")
            .from_env()
            .context("failed to parse MASTER_* environment variables")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        if !SLA_MULTIPLIER_RANGE.contains(&raw.sla_multiplier_default) {
            anyhow::bail!(
                "MASTER_SLA_MULTIPLIER_DEFAULT {} out of range {:?}",
                raw.sla_multiplier_default,
                SLA_MULTIPLIER_RANGE
            );
        }
        if raw.min_history_for_ga == 0 {
            anyhow::bail!("MASTER_MIN_HISTORY_FOR_GA must be >= 1");
        }

        let param_file_path = raw.data_dir.join(&raw.param_file_name);

        let cfg = MasterConfig {
            sla_multiplier_default: raw.sla_multiplier_default,
            ga_interval: Duration::from_secs(raw.ga_interval_secs),
            param_reload_interval: Duration::from_secs(raw.param_reload_interval_secs),
            queue_interval: Duration::from_secs(raw.queue_interval_secs),
            history_window: chrono::Duration::hours(raw.history_window_hours as i64),
            min_history_for_ga: raw.min_history_for_ga,
            data_dir: raw.data_dir,
            param_file_path,
            listen_addr: raw.listen_addr,
        };

        info!(
            sla_multiplier_default = cfg.sla_multiplier_default,
            ga_interval_secs = cfg.ga_interval.as_secs(),
            param_reload_interval_secs = cfg.param_reload_interval.as_secs(),
            queue_interval_secs = cfg.queue_interval.as_secs(),
            min_history_for_ga = cfg.min_history_for_ga,
            data_dir = %cfg.data_dir.display(),
            "loaded master configuration"
        );

        Ok(cfg)
    }
}

impl Default for MasterConfig {
    /// Defaults with no environment overrides — used by tests and by
    /// `cargo run` against a bare environment.
    fn default() -> Self {
        Self::from_raw(RawConfig {
            sla_multiplier_default: default_sla_multiplier(),
            ga_interval_secs: default_ga_interval_secs(),
            param_reload_interval_secs: default_param_reload_interval_secs(),
            queue_interval_secs: default_queue_interval_secs(),
            history_window_hours: default_history_window_hours(),
            min_history_for_ga: default_min_history_for_ga(),
            data_dir: default_data_dir(),
            param_file_name: default_param_file_name(),
            listen_addr: default_listen_addr(),
        })
        .expect("built-in defaults must validate")
    }
}
