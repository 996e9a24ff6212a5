/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulates a single worker node: registers with the master, sends
//! periodic heartbeats, serves `AssignTask`/`CancelTask`, and reports
//! completion after a simulated run duration proportional to the task's
//! resource request.
//!
//! NOT for production — manual test harness only.

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use cluster_master::proto::cluster_master_v1::master_service_client::MasterServiceClient;
use cluster_master::proto::cluster_master_v1::worker_service_server::{
    WorkerService, WorkerServiceServer,
};
use cluster_master::proto::cluster_master_v1::{
    Ack, AssignTaskRequest, CancelTaskRequest, HeartbeatRequest, ResourceAmounts,
    TaskCompletionReport, WorkerInfo,
};
use rand::Rng;
use tokio::sync::Mutex;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(about = "Run a simulated worker node against a cluster-master instance")]
struct Args {
    #[arg(long)]
    worker_id: String,

    /// Address this simulated worker's WorkerService listens on, e.g. 127.0.0.1:9001
    #[arg(long)]
    listen_addr: String,

    /// Endpoint the master should dial back, usually http://<listen_addr>
    #[arg(long)]
    advertise_endpoint: String,

    #[arg(long)]
    master_addr: String,

    #[arg(long, default_value_t = 8.0)]
    total_cpu: f64,
    #[arg(long, default_value_t = 16384.0)]
    total_memory_mb: f64,
    #[arg(long, default_value_t = 0.0)]
    total_storage_mb: f64,
    #[arg(long, default_value_t = 0.0)]
    total_gpu: f64,

    #[arg(long, default_value_t = 3000)]
    heartbeat_interval_ms: u64,
}

struct RunningTask {
    cancelled: Arc<std::sync::atomic::AtomicBool>,
}

struct WorkerNode {
    worker_id: String,
    master_addr: String,
    running: Mutex<HashMap<String, RunningTask>>,
}

#[tonic::async_trait]
impl WorkerService for WorkerNode {
    async fn assign_task(
        &self,
        request: Request<AssignTaskRequest>,
    ) -> Result<Response<Ack>, Status> {
        let req = request.into_inner();
        let Some(task) = req.task else {
            return Err(Status::invalid_argument("task is required"));
        };
        let task_id = task.task_id.clone();
        let cancelled = Arc::new(std::sync::atomic::AtomicBool::new(false));

        self.running.lock().await.insert(
            task_id.clone(),
            RunningTask {
                cancelled: cancelled.clone(),
            },
        );

        let master_addr = self.master_addr.clone();
        let worker_id = self.worker_id.clone();
        tokio::spawn(async move {
            // Simulated runtime: proportional to requested CPU, capped so the
            // simulator stays responsive.
            let request_amounts = task.request.unwrap_or_default();
            let run_secs = (request_amounts.cpu.max(0.5) * 2.0).min(30.0);
            tokio::time::sleep(std::time::Duration::from_secs_f64(run_secs)).await;

            if cancelled.load(std::sync::atomic::Ordering::SeqCst) {
                info!(task_id, "task was cancelled before completion, skipping report");
                return;
            }

            let status = if rand::thread_rng().gen_bool(0.95) {
                "success"
            } else {
                "failure"
            };

            match MasterServiceClient::connect(master_addr).await {
                Ok(mut client) => {
                    let report = TaskCompletionReport {
                        task_id: task_id.clone(),
                        worker_id,
                        status: status.to_string(),
                        logs: format!("simulated run for {run_secs:.1}s"),
                        completed_at_unix_ms: chrono::Utc::now().timestamp_millis(),
                    };
                    if let Err(err) = client.report_task_completion(report).await {
                        warn!(task_id, error = %err, "failed to report completion");
                    } else {
                        info!(task_id, status, "reported completion");
                    }
                }
                Err(err) => warn!(task_id, error = %err, "failed to connect back to master"),
            }
        });

        Ok(Response::new(Ack {
            ok: true,
            message: String::new(),
        }))
    }

    async fn cancel_task(
        &self,
        request: Request<CancelTaskRequest>,
    ) -> Result<Response<Ack>, Status> {
        let task_id = request.into_inner().task_id;
        if let Some(running) = self.running.lock().await.remove(&task_id) {
            running.cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(Response::new(Ack {
                ok: true,
                message: String::new(),
            }))
        } else {
            Ok(Response::new(Ack {
                ok: false,
                message: format!("task {task_id} not running on this worker"),
            }))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let mut register_client = MasterServiceClient::connect(args.master_addr.clone()).await?;
    register_client
        .register_worker(WorkerInfo {
            worker_id: args.worker_id.clone(),
            endpoint: args.advertise_endpoint.clone(),
            total: Some(ResourceAmounts {
                cpu: args.total_cpu,
                memory_mb: args.total_memory_mb,
                storage_mb: args.total_storage_mb,
                gpu: args.total_gpu,
            }),
        })
        .await?;
    info!(worker_id = %args.worker_id, "registered with master");

    let node = WorkerNode {
        worker_id: args.worker_id.clone(),
        master_addr: args.master_addr.clone(),
        running: Mutex::new(HashMap::new()),
    };

    let heartbeat_worker_id = args.worker_id.clone();
    let heartbeat_master_addr = args.master_addr.clone();
    let heartbeat_interval = std::time::Duration::from_millis(args.heartbeat_interval_ms);
    tokio::spawn(async move {
        let mut client = match MasterServiceClient::connect(heartbeat_master_addr).await {
            Ok(client) => client,
            Err(err) => {
                warn!(error = %err, "heartbeat loop failed to connect, giving up");
                return;
            }
        };
        let mut ticker = tokio::time::interval(heartbeat_interval);
        loop {
            ticker.tick().await;
            let mut rng = rand::thread_rng();
            let heartbeat = HeartbeatRequest {
                worker_id: heartbeat_worker_id.clone(),
                cpu_usage: rng.gen_range(0.1..0.9),
                mem_usage: rng.gen_range(0.1..0.9),
                gpu_usage: rng.gen_range(0.0..0.5),
                running_tasks: vec![],
            };
            if let Err(err) = client.send_heartbeat(heartbeat).await {
                warn!(error = %err, "heartbeat RPC failed");
            }
        }
    });

    let addr = args.listen_addr.parse()?;
    info!(listen_addr = %args.listen_addr, "serving WorkerService");
    tonic::transport::Server::builder()
        .add_service(WorkerServiceServer::new(node))
        .serve(addr)
        .await?;

    Ok(())
}
