/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::sync::Arc;

use cluster_master::config::MasterConfig;
use cluster_master::lifecycle::Master;
use cluster_master::proto::cluster_master_v1::master_service_server::MasterServiceServer;
use cluster_master::queue::WorkerRpcClient;
use cluster_master::rpc::TonicWorkerRpcClient;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = MasterConfig::load_from_env()?;
    info!(listen_addr = %config.listen_addr, "starting cluster master");

    let rpc: Arc<dyn WorkerRpcClient> = Arc::new(TonicWorkerRpcClient::new());
    let master = Master::start(&config, rpc).await?;

    let addr = config.listen_addr.parse()?;
    let service = (*master.service).clone();

    tonic::transport::Server::builder()
        .add_service(MasterServiceServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}
