/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulates an operator / submission client: reads a workload YAML file
//! and submits each task to the master via `SubmitTask`.
//!
//! NOT for production — manual test harness only.

use std::path::PathBuf;

use clap::Parser;
use cluster_master::proto::cluster_master_v1::master_service_client::MasterServiceClient;
use cluster_master::proto::cluster_master_v1::{ResourceAmounts, SubmitTaskRequest, TaskSpec};
use serde::Deserialize;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(about = "Submit a simulated workload to a cluster-master instance")]
struct Args {
    /// Master gRPC endpoint, e.g. http://127.0.0.1:7070
    #[arg(long, default_value = "http://127.0.0.1:7070")]
    master_addr: String,

    /// Path to a workload YAML file (a list of tasks).
    #[arg(long)]
    workload: PathBuf,

    /// Milliseconds to wait between submissions.
    #[arg(long, default_value_t = 200)]
    interval_ms: u64,
}

#[derive(Debug, Deserialize)]
struct WorkloadTask {
    task_id: String,
    #[serde(default = "default_user")]
    user_id: String,
    #[serde(default)]
    task_type: String,
    #[serde(default)]
    cpu: f64,
    #[serde(default)]
    memory_mb: f64,
    #[serde(default)]
    storage_mb: f64,
    #[serde(default)]
    gpu: f64,
    #[serde(default = "default_sla_multiplier")]
    sla_multiplier: f64,
    #[serde(default = "default_image")]
    docker_image: String,
    #[serde(default)]
    command: Vec<String>,
}

fn default_user() -> String {
    "sim-operator".to_string()
}
fn default_sla_multiplier() -> f64 {
    2.0
}
fn default_image() -> String {
    "busybox:latest".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let workload_raw = std::fs::read_to_string(&args.workload)?;
    let tasks: Vec<WorkloadTask> = serde_yaml::from_str(&workload_raw)?;
    info!(count = tasks.len(), path = %args.workload.display(), "loaded workload");

    let mut client = MasterServiceClient::connect(args.master_addr.clone()).await?;
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(args.interval_ms));

    for task in tasks {
        interval.tick().await;
        let request = SubmitTaskRequest {
            task: Some(TaskSpec {
                task_id: task.task_id.clone(),
                user_id: task.user_id,
                task_type: task.task_type,
                request: Some(ResourceAmounts {
                    cpu: task.cpu,
                    memory_mb: task.memory_mb,
                    storage_mb: task.storage_mb,
                    gpu: task.gpu,
                }),
                sla_multiplier: task.sla_multiplier,
                docker_image: task.docker_image,
                command: task.command,
            }),
        };
        match client.submit_task(request).await {
            Ok(response) => {
                let response = response.into_inner();
                if response.accepted {
                    info!(task_id = %task.task_id, "submitted");
                } else {
                    error!(task_id = %task.task_id, reason = %response.reason, "rejected");
                }
            }
            Err(status) => {
                error!(task_id = %task.task_id, error = %status, "submit_task RPC failed");
            }
        }
    }

    Ok(())
}
