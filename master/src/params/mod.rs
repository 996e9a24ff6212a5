/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Parameter store & hot-reloader (C1).
//!
//! Holds one immutable [`ParameterBundle`] pointer behind an async
//! read-write lock. The bundle is the sole channel through which the GA
//! epoch runner (C7) feeds learned parameters to the online scheduler (C4) —
//! the two subsystems never call each other directly.

pub mod error;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::task::TaskType;
pub use error::ParamError;

// ── Parameter bundle ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Theta {
    pub theta1: f64,
    pub theta2: f64,
    pub theta3: f64,
    pub theta4: f64,
}

impl Theta {
    pub fn as_array(&self) -> [f64; 4] {
        [self.theta1, self.theta2, self.theta3, self.theta4]
    }

    pub fn from_array(v: [f64; 4]) -> Self {
        Theta {
            theta1: v[0],
            theta2: v[1],
            theta3: v[2],
            theta4: v[3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub alpha: f64,
    pub beta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffinityWeights {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeights {
    pub g1: f64,
    pub g2: f64,
    pub g3: f64,
}

/// A complete, immutable snapshot of the parameters the online path reads.
///
/// `affinity_matrix` and `penalty_vector` use plain `String` keys (canonical
/// task-type tag, worker id) rather than typed keys: this is the wire
/// format too, and validation of those keys is exactly the job of
/// [`ParameterBundle::validate`] — keeping them untyped at the struct level
/// means a malformed key is a validation error, not a deserialization
/// panic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterBundle {
    pub theta: Theta,
    pub risk: RiskParams,
    pub affinity_weights: AffinityWeights,
    pub penalty_weights: PenaltyWeights,
    #[serde(default)]
    pub affinity_matrix: HashMap<String, HashMap<String, f64>>,
    #[serde(default)]
    pub penalty_vector: HashMap<String, f64>,
}

impl Default for ParameterBundle {
    fn default() -> Self {
        ParameterBundle {
            theta: Theta {
                theta1: 0.1,
                theta2: 0.1,
                theta3: 0.3,
                theta4: 0.2,
            },
            risk: RiskParams {
                alpha: 10.0,
                beta: 1.0,
            },
            affinity_weights: AffinityWeights {
                a1: 1.0,
                a2: 2.0,
                a3: 0.5,
            },
            penalty_weights: PenaltyWeights {
                g1: 2.0,
                g2: 1.0,
                g3: 0.5,
            },
            affinity_matrix: HashMap::new(),
            penalty_vector: HashMap::new(),
        }
    }
}

impl ParameterBundle {
    /// Affinity lookup with the documented default of `0` when absent.
    pub fn affinity(&self, task_type: TaskType, worker_id: &str) -> f64 {
        self.affinity_matrix
            .get(task_type.as_str())
            .and_then(|row| row.get(worker_id))
            .copied()
            .unwrap_or(0.0)
    }

    /// Penalty lookup with the documented default of `0` when absent.
    pub fn penalty(&self, worker_id: &str) -> f64 {
        self.penalty_vector.get(worker_id).copied().unwrap_or(0.0)
    }

    /// Validate every range from the data model. Called before a bundle is
    /// accepted on load, and again before it is serialized on save.
    pub fn validate(&self) -> Result<(), ParamError> {
        for (field, v) in [
            ("theta1", self.theta.theta1),
            ("theta2", self.theta.theta2),
            ("theta3", self.theta.theta3),
            ("theta4", self.theta.theta4),
        ] {
            check_range(field, v, 0.0, 10.0)?;
        }
        check_range("alpha", self.risk.alpha, 0.0, 1000.0)?;
        check_range("beta", self.risk.beta, 0.0, 100.0)?;
        for (field, v) in [
            ("a1", self.affinity_weights.a1),
            ("a2", self.affinity_weights.a2),
            ("a3", self.affinity_weights.a3),
        ] {
            check_range(field, v, 0.0, 10.0)?;
        }
        for (field, v) in [
            ("g1", self.penalty_weights.g1),
            ("g2", self.penalty_weights.g2),
            ("g3", self.penalty_weights.g3),
        ] {
            check_range(field, v, 0.0, 10.0)?;
        }
        for (type_tag, row) in &self.affinity_matrix {
            if TaskType::parse(type_tag).is_none() {
                return Err(ParamError::InvalidAffinityKey(type_tag.clone()));
            }
            for v in row.values() {
                check_range("affinity_matrix value", *v, -5.0, 5.0)?;
            }
        }
        for v in self.penalty_vector.values() {
            check_range("penalty_vector value", *v, 0.0, 5.0)?;
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, lo: f64, hi: f64) -> Result<(), ParamError> {
    if value.is_nan() || value < lo || value > hi {
        Err(ParamError::OutOfRange {
            field,
            value,
            lo,
            hi,
        })
    } else {
        Ok(())
    }
}

// ── Load / Save ────────────────────────────────────────────────────────────────

/// Read and validate a parameter bundle from `path`.
pub fn load(path: &Path) -> Result<ParameterBundle, ParamError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParamError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let bundle: ParameterBundle =
        serde_json::from_str(&content).map_err(|source| ParamError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    bundle.validate()?;
    Ok(bundle)
}

/// `load`, falling back to [`ParameterBundle::default`] if the file is
/// missing or invalid. Never fails.
pub fn load_or_default(path: &Path) -> ParameterBundle {
    match load(path) {
        Ok(bundle) => bundle,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "parameter file missing or invalid, using defaults");
            ParameterBundle::default()
        }
    }
}

/// Validate, then atomically write `bundle` to `path` (write-to-temp,
/// rename), pretty-printed with 2-space indent per the wire format.
pub fn save(path: &Path, bundle: &ParameterBundle) -> Result<(), ParamError> {
    bundle.validate()?;
    let json = serde_json::to_string_pretty(bundle).map_err(|source| ParamError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, json).map_err(|source| ParamError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| ParamError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

// ── ParameterStore ─────────────────────────────────────────────────────────────

/// Thread-safe holder of the current bundle. Readers clone the `Arc` under
/// a read-lock and then use it without further locking — the bundle is
/// treated as deep-immutable once published.
pub struct ParameterStore {
    current: RwLock<Arc<ParameterBundle>>,
}

impl ParameterStore {
    pub fn new(initial: ParameterBundle) -> Self {
        ParameterStore {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// O(1) snapshot under read-lock; the returned `Arc` is safe to hold for
    /// the duration of one `Select` call without re-reading.
    pub async fn snapshot(&self) -> Arc<ParameterBundle> {
        self.current.read().await.clone()
    }

    /// Attempt to reload from `path` and swap the pointer on success.
    /// Failure is logged; the current bundle is left untouched.
    pub async fn reload_from(&self, path: &Path) {
        match load(path) {
            Ok(bundle) => {
                *self.current.write().await = Arc::new(bundle);
                info!(path = %path.display(), "parameter bundle reloaded");
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "parameter reload failed, keeping current bundle");
            }
        }
    }
}

/// Spawn the background hot-reload ticker: reloads from `path` every
/// `interval`, forever, until the returned handle is aborted.
pub fn spawn_hot_reload(
    store: Arc<ParameterStore>,
    path: std::path::PathBuf,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            store.reload_from(&path).await;
        }
    })
}
