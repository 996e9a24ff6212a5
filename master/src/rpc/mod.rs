/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! gRPC wiring: the `MasterService` server handlers and the
//! `WorkerServiceClient`-backed [`queue::WorkerRpcClient`] implementation
//! dialled against each worker's registered endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use crate::proto::cluster_master_v1::master_service_server::MasterService;
use crate::proto::cluster_master_v1::worker_service_client::WorkerServiceClient;
use crate::proto::cluster_master_v1::{
    self, Ack, AssignTaskRequest as ProtoAssignTaskRequest, CancelTaskRequest, CancelTaskResponse,
    HeartbeatRequest, SubmitTaskRequest, SubmitTaskResponse, TaskCompletionReport, WorkerInfo,
};
use crate::queue::{CompletionReport, QueueError, QueueProcessor, WorkerRpcClient};
use crate::registry::WorkerRegistry;
use crate::store::{Store, TaskRecord, WorkerRecord};
use crate::task::ResourceAmounts;
use crate::telemetry::{HeartbeatSnapshot, HeartbeatStore};
use crate::worker::Worker;

/// Dial timeout for a fresh connection to a worker endpoint.
const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

fn proto_to_resources(amounts: &cluster_master_v1::ResourceAmounts) -> ResourceAmounts {
    ResourceAmounts::new(amounts.cpu, amounts.memory_mb, amounts.storage_mb, amounts.gpu)
}

fn resources_to_proto(amounts: &ResourceAmounts) -> cluster_master_v1::ResourceAmounts {
    cluster_master_v1::ResourceAmounts {
        cpu: amounts.cpu,
        memory_mb: amounts.memory_mb,
        storage_mb: amounts.storage_mb,
        gpu: amounts.gpu,
    }
}

fn task_record_to_proto(task: &TaskRecord, arrival: i64, deadline: i64) -> ProtoAssignTaskRequest {
    ProtoAssignTaskRequest {
        task: Some(cluster_master_v1::TaskSpec {
            task_id: task.task_id.clone(),
            user_id: task.user_id.clone(),
            task_type: task.task_type.as_str().to_string(),
            request: Some(resources_to_proto(&task.request)),
            sla_multiplier: task.sla_multiplier,
            docker_image: task.docker_image.clone(),
            command: task.command.clone(),
        }),
        arrival_unix_ms: arrival,
        deadline_unix_ms: deadline,
    }
}

/// Dials a worker's `WorkerService` endpoint per call. Workers are few and
/// calls infrequent (dispatch, cancel) relative to heartbeat traffic, so a
/// connection pool is not worth the added complexity until profiling says
/// otherwise.
pub struct TonicWorkerRpcClient;

impl TonicWorkerRpcClient {
    pub fn new() -> Self {
        TonicWorkerRpcClient
    }

    async fn connect(
        &self,
        endpoint: &str,
    ) -> Result<WorkerServiceClient<tonic::transport::Channel>, QueueError> {
        let channel = tonic::transport::Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| QueueError::DispatchFailed {
                worker_id: endpoint.to_string(),
                message: e.to_string(),
            })?
            .timeout(DIAL_TIMEOUT)
            .connect()
            .await
            .map_err(|e| QueueError::DispatchFailed {
                worker_id: endpoint.to_string(),
                message: e.to_string(),
            })?;
        Ok(WorkerServiceClient::new(channel))
    }
}

impl Default for TonicWorkerRpcClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerRpcClient for TonicWorkerRpcClient {
    async fn assign_task(&self, endpoint: &str, task: &TaskRecord) -> Result<(), QueueError> {
        let mut client = self.connect(endpoint).await?;
        let request = task_record_to_proto(
            task,
            task.submitted_at.timestamp_millis(),
            task.deadline.timestamp_millis(),
        );
        let ack = client
            .assign_task(Request::new(request))
            .await
            .map_err(|e| QueueError::DispatchFailed {
                worker_id: endpoint.to_string(),
                message: e.to_string(),
            })?
            .into_inner();
        if ack.ok {
            Ok(())
        } else {
            Err(QueueError::DispatchFailed {
                worker_id: endpoint.to_string(),
                message: ack.message,
            })
        }
    }

    async fn cancel_task(&self, endpoint: &str, task_id: &str) -> Result<(), QueueError> {
        let mut client = self.connect(endpoint).await?;
        let ack = client
            .cancel_task(Request::new(CancelTaskRequest {
                task_id: task_id.to_string(),
            }))
            .await
            .map_err(|e| QueueError::DispatchFailed {
                worker_id: endpoint.to_string(),
                message: e.to_string(),
            })?
            .into_inner();
        if ack.ok {
            Ok(())
        } else {
            Err(QueueError::DispatchFailed {
                worker_id: endpoint.to_string(),
                message: ack.message,
            })
        }
    }
}

/// `MasterService` server implementation. Thin: every handler validates
/// its request and delegates to [`QueueProcessor`] / [`WorkerRegistry`].
#[derive(Clone)]
pub struct MasterServiceImpl {
    store: Arc<Store>,
    queue: Arc<QueueProcessor>,
    registry: Arc<WorkerRegistry>,
    heartbeats: Arc<HeartbeatStore>,
}

impl MasterServiceImpl {
    pub fn new(
        store: Arc<Store>,
        queue: Arc<QueueProcessor>,
        registry: Arc<WorkerRegistry>,
        heartbeats: Arc<HeartbeatStore>,
    ) -> Self {
        MasterServiceImpl {
            store,
            queue,
            registry,
            heartbeats,
        }
    }
}

#[tonic::async_trait]
impl MasterService for MasterServiceImpl {
    async fn submit_task(
        &self,
        request: Request<SubmitTaskRequest>,
    ) -> Result<Response<SubmitTaskResponse>, Status> {
        let task = request
            .into_inner()
            .task
            .ok_or_else(|| Status::invalid_argument("task is required"))?;
        let request_amounts = task
            .request
            .as_ref()
            .map(proto_to_resources)
            .unwrap_or_default();
        let raw_type = if task.task_type.is_empty() {
            None
        } else {
            Some(task.task_type.as_str())
        };

        let result = self.queue.submit(
            task.task_id.clone(),
            task.user_id,
            raw_type,
            request_amounts,
            task.sla_multiplier,
            task.docker_image,
            task.command,
        );

        match result {
            Ok(()) => Ok(Response::new(SubmitTaskResponse {
                accepted: true,
                task_id: task.task_id,
                reason: String::new(),
            })),
            Err(err) => {
                warn!(error = %err, task_id = %task.task_id, "task submission rejected");
                Ok(Response::new(SubmitTaskResponse {
                    accepted: false,
                    task_id: task.task_id,
                    reason: err.to_string(),
                }))
            }
        }
    }

    async fn cancel_task(
        &self,
        request: Request<CancelTaskRequest>,
    ) -> Result<Response<CancelTaskResponse>, Status> {
        let task_id = request.into_inner().task_id;
        match self.queue.cancel(&task_id).await {
            Ok(()) => Ok(Response::new(CancelTaskResponse {
                accepted: true,
                reason: String::new(),
            })),
            Err(err) => Ok(Response::new(CancelTaskResponse {
                accepted: false,
                reason: err.to_string(),
            })),
        }
    }

    async fn report_task_completion(
        &self,
        request: Request<TaskCompletionReport>,
    ) -> Result<Response<Ack>, Status> {
        let report = request.into_inner();
        let completion = CompletionReport {
            task_id: report.task_id,
            worker_id: report.worker_id,
            status: report.status,
            logs: report.logs,
        };
        match self.queue.on_completion(completion) {
            Ok(()) => Ok(Response::new(Ack {
                ok: true,
                message: String::new(),
            })),
            Err(err) => {
                warn!(error = %err, "completion report rejected");
                Ok(Response::new(Ack {
                    ok: false,
                    message: err.to_string(),
                }))
            }
        }
    }

    async fn register_worker(
        &self,
        request: Request<WorkerInfo>,
    ) -> Result<Response<Ack>, Status> {
        let info = request.into_inner();
        let total = info
            .total
            .as_ref()
            .map(proto_to_resources)
            .unwrap_or_default();

        self.registry
            .register(Worker::new(info.worker_id.clone(), info.endpoint.clone(), total));
        if let Err(err) = self.store.upsert_worker(WorkerRecord {
            worker_id: info.worker_id.clone(),
            endpoint: info.endpoint,
            total,
            allocated: ResourceAmounts::default(),
            is_active: true,
            last_heartbeat: None,
        }) {
            warn!(error = %err, worker_id = %info.worker_id, "failed to persist newly registered worker");
        }
        // A (re)connecting worker is the only signal a restart happened;
        // reconcile immediately so a crashed master's stale in-memory
        // allocation never outlives this registration.
        self.queue.reconcile();
        info!(worker_id = %info.worker_id, "worker registered");

        Ok(Response::new(Ack {
            ok: true,
            message: String::new(),
        }))
    }

    async fn send_heartbeat(
        &self,
        request: Request<HeartbeatRequest>,
    ) -> Result<Response<Ack>, Status> {
        let hb = request.into_inner();
        self.registry.touch_heartbeat(&hb.worker_id, Utc::now());
        self.heartbeats.record(
            &hb.worker_id,
            HeartbeatSnapshot {
                cpu_usage: hb.cpu_usage,
                mem_usage: hb.mem_usage,
                gpu_usage: hb.gpu_usage,
                received_at: Utc::now(),
            },
        );
        Ok(Response::new(Ack {
            ok: true,
            message: String::new(),
        }))
    }
}
