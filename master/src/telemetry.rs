/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Telemetry adapter (C5).
//!
//! Projects live worker state into the minimal [`WorkerView`] RTS needs.
//! Never blocks on network I/O: it reads the [`WorkerRegistry`] (for
//! total/allocated resources) and an in-memory heartbeat snapshot map (for
//! load), both maintained synchronously by the RPC layer's `SendHeartbeat`
//! handler — an external collaborator from this module's point of view.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::registry::WorkerRegistry;
use crate::task::ResourceAmounts;
use crate::worker::WorkerView;

/// The latest heartbeat observed from one worker.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatSnapshot {
    pub cpu_usage: f64,
    pub mem_usage: f64,
    pub gpu_usage: f64,
    pub received_at: DateTime<Utc>,
}

impl HeartbeatSnapshot {
    /// Normalised mean of cpu/mem/gpu utilisation, clamped to `[0, 1+]`
    /// (values above 1 are meaningful — they represent overload).
    fn load(&self) -> f64 {
        let avg = (self.cpu_usage + self.mem_usage + self.gpu_usage) / 3.0;
        avg.max(0.0)
    }
}

/// Heartbeat snapshots keyed by worker id, updated by the `SendHeartbeat`
/// RPC handler and read by the telemetry adapter.
#[derive(Default)]
pub struct HeartbeatStore {
    snapshots: RwLock<HashMap<String, HeartbeatSnapshot>>,
}

impl HeartbeatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, worker_id: &str, snapshot: HeartbeatSnapshot) {
        self.snapshots
            .write()
            .expect("heartbeat store lock poisoned")
            .insert(worker_id.to_string(), snapshot);
    }

    pub fn get(&self, worker_id: &str) -> Option<HeartbeatSnapshot> {
        self.snapshots
            .read()
            .expect("heartbeat store lock poisoned")
            .get(worker_id)
            .copied()
    }
}

pub struct TelemetryAdapter {
    registry: Arc<WorkerRegistry>,
    heartbeats: Arc<HeartbeatStore>,
}

impl TelemetryAdapter {
    pub fn new(registry: Arc<WorkerRegistry>, heartbeats: Arc<HeartbeatStore>) -> Self {
        TelemetryAdapter {
            registry,
            heartbeats,
        }
    }

    /// One view per worker present in the live registry, intersected with
    /// whatever heartbeat data exists (a worker with no heartbeat yet
    /// reports load `0.0` — it has not been observed running anything).
    pub fn get_worker_views(&self) -> HashMap<String, WorkerView> {
        self.registry
            .list_clone()
            .into_iter()
            .filter(|w| w.active)
            .map(|w| {
                let load = self
                    .heartbeats
                    .get(&w.id)
                    .map(|hb| hb.load())
                    .unwrap_or(0.0);
                (
                    w.id.clone(),
                    WorkerView {
                        available: w.available(),
                        load,
                    },
                )
            })
            .collect()
    }

    pub fn get_worker_load(&self, worker_id: &str) -> f64 {
        self.heartbeats
            .get(worker_id)
            .map(|hb| hb.load())
            .unwrap_or(0.0)
    }

    /// Exposed for the registry-side "availables" computation in isolation
    /// (used by tests and by the reconciliation monitor's logging).
    pub fn available_for(&self, worker_id: &str) -> Option<ResourceAmounts> {
        self.registry.get_clone(worker_id).map(|w| w.available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::Worker;

    fn setup() -> (Arc<WorkerRegistry>, Arc<HeartbeatStore>) {
        let registry = Arc::new(WorkerRegistry::new());
        registry.register(Worker::new(
            "w1",
            "http://w1:9000",
            ResourceAmounts::new(8.0, 16.0, 0.0, 2.0),
        ));
        (registry, Arc::new(HeartbeatStore::new()))
    }

    #[test]
    fn worker_with_no_heartbeat_reports_zero_load() {
        let (registry, heartbeats) = setup();
        let adapter = TelemetryAdapter::new(registry, heartbeats);
        let views = adapter.get_worker_views();
        assert_eq!(views["w1"].load, 0.0);
    }

    #[test]
    fn load_averages_three_utilisation_dimensions() {
        let (registry, heartbeats) = setup();
        heartbeats.record(
            "w1",
            HeartbeatSnapshot {
                cpu_usage: 0.9,
                mem_usage: 0.6,
                gpu_usage: 0.3,
                received_at: Utc::now(),
            },
        );
        let adapter = TelemetryAdapter::new(registry, heartbeats);
        let views = adapter.get_worker_views();
        assert!((views["w1"].load - 0.6).abs() < 1e-9);
    }

    #[test]
    fn inactive_workers_are_excluded_from_views() {
        let (registry, heartbeats) = setup();
        registry.set_active("w1", false);
        let adapter = TelemetryAdapter::new(registry, heartbeats);
        assert!(adapter.get_worker_views().is_empty());
    }

    #[test]
    fn available_reflects_registry_allocation_state() {
        let (registry, heartbeats) = setup();
        registry.try_reserve("w1", "t1", &ResourceAmounts::new(2.0, 0.0, 0.0, 0.0));
        let adapter = TelemetryAdapter::new(registry, heartbeats);
        let avail = adapter.available_for("w1").unwrap();
        assert_eq!(avail.cpu, 6.0);
    }
}
