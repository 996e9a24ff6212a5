/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Process lifecycle (C8): wires C1-C7 together in the documented start
//! order and owns every background ticker's join handle so shutdown can
//! cancel and join them in reverse.
//!
//! Start order: persistent store → parameter store (`LoadOrDefault`) → tau
//! store → worker registry, seeded from the store's persisted worker
//! records before anything reads it → telemetry adapter → scheduler →
//! queue processor (reconciled once against the seeded registry, then a
//! 5 s ticker) → history layer → GA runner (60 s ticker), unless the
//! history layer could not be constructed, in which case AOD is logged as
//! disabled and the rest of the process continues unaffected.
//!
//! Reconciliation also re-runs on every `register_worker` call (see
//! [`crate::rpc::MasterServiceImpl`]), since that is the only signal the
//! master gets that a worker has (re)connected after a restart.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::MasterConfig;
use crate::ga::GaRunner;
use crate::history::HistoryLayer;
use crate::params::{self, ParameterStore};
use crate::queue::{self, QueueProcessor, WorkerRpcClient};
use crate::registry::WorkerRegistry;
use crate::rpc::MasterServiceImpl;
use crate::scheduler::Scheduler;
use crate::store::Store;
use crate::tau::TauStore;
use crate::telemetry::{HeartbeatStore, TelemetryAdapter};
use crate::worker::Worker;

/// Every long-lived handle the running process needs to hold or cancel.
pub struct Master {
    pub store: Arc<Store>,
    pub params: Arc<ParameterStore>,
    pub tau_store: Arc<TauStore>,
    pub registry: Arc<WorkerRegistry>,
    pub heartbeats: Arc<HeartbeatStore>,
    pub telemetry: Arc<TelemetryAdapter>,
    pub scheduler: Arc<Scheduler>,
    pub queue: Arc<QueueProcessor>,
    pub history: Option<Arc<HistoryLayer>>,
    pub service: Arc<MasterServiceImpl>,

    queue_ticker: tokio::task::JoinHandle<()>,
    param_ticker: tokio::task::JoinHandle<()>,
    ga_ticker: Option<tokio::task::JoinHandle<()>>,
}

impl Master {
    /// Build and start every component per the documented start order.
    /// `rpc` is injectable so tests can supply a fake worker client; the
    /// real binary passes [`TonicWorkerRpcClient::new`].
    pub async fn start(config: &MasterConfig, rpc: Arc<dyn WorkerRpcClient>) -> anyhow::Result<Self> {
        let store = Arc::new(Store::open(config.data_dir.as_path())?);

        let initial_bundle = params::load_or_default(&config.param_file_path);
        let params_store = Arc::new(ParameterStore::new(initial_bundle));
        let param_ticker = params::spawn_hot_reload(
            params_store.clone(),
            config.param_file_path.clone(),
            config.param_reload_interval,
        );

        let tau_store = Arc::new(TauStore::new());
        let registry = Arc::new(WorkerRegistry::new());
        for record in store.list_workers() {
            registry.register(Worker {
                id: record.worker_id,
                endpoint: record.endpoint,
                total: record.total,
                allocated: crate::task::ResourceAmounts::default(),
                active: record.is_active,
                running: std::collections::HashSet::new(),
                last_heartbeat: record.last_heartbeat,
            });
        }
        let heartbeats = Arc::new(HeartbeatStore::new());
        let telemetry = Arc::new(TelemetryAdapter::new(registry.clone(), heartbeats.clone()));
        let scheduler = Arc::new(Scheduler::new(params_store.clone(), telemetry.clone()));

        let queue_processor = Arc::new(QueueProcessor::new(
            store.clone(),
            registry.clone(),
            scheduler.clone(),
            tau_store.clone(),
            telemetry.clone(),
            rpc,
        ));
        queue_processor.reconcile();
        let queue_ticker = queue::spawn_queue_ticker(queue_processor.clone(), config.queue_interval);

        let history = Some(Arc::new(HistoryLayer::new(store.clone())));
        let ga_ticker = match &history {
            Some(history_layer) => {
                let runner = Arc::new(GaRunner::new(
                    history_layer.clone(),
                    params_store.clone(),
                    config.param_file_path.clone(),
                    config.history_window,
                    config.min_history_for_ga,
                ));
                info!("AOD enabled, starting GA epoch ticker");
                Some(crate::ga::spawn_epoch_ticker(runner, config.ga_interval))
            }
            None => {
                warn!("history layer unavailable, AOD disabled");
                None
            }
        };

        let service = Arc::new(MasterServiceImpl::new(
            store.clone(),
            queue_processor.clone(),
            registry.clone(),
            heartbeats.clone(),
        ));

        Ok(Master {
            store,
            params: params_store,
            tau_store,
            registry,
            heartbeats,
            telemetry,
            scheduler,
            queue: queue_processor,
            history,
            service,
            queue_ticker,
            param_ticker,
            ga_ticker,
        })
    }

    /// Cancel and join every background ticker, reverse of the start order.
    pub async fn shutdown(self) {
        if let Some(handle) = self.ga_ticker {
            handle.abort();
            let _ = handle.await;
        }
        self.param_ticker.abort();
        let _ = self.param_ticker.await;
        self.queue_ticker.abort();
        let _ = self.queue_ticker.await;
        info!("master shutdown complete");
    }
}
