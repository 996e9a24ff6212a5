/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Risk-aware task-scheduling master for a container compute cluster.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── proto/       – generated gRPC/protobuf types & stubs
//! ├── config.rs    – process-environment configuration
//! ├── task.rs      – task/type/resource domain types
//! ├── worker.rs    – worker registry entry + scheduler-facing view
//! ├── registry.rs  – the single worker allocation lock
//! ├── params/      – GA-evolved parameter bundle & hot-reloader (C1)
//! ├── tau.rs       – per-task-type EMA runtime baseline (C2)
//! ├── telemetry.rs – live worker view projection (C5)
//! ├── scheduler/   – risk-aware earliest-deadline dispatch (C4)
//! ├── queue/       – queue processor & resource accountant (C6)
//! ├── store/       – persistent NDJSON-backed collections
//! ├── history/     – historical join + per-worker aggregates (C3)
//! ├── ga/          – offline parameter evolution (C7)
//! ├── rpc/         – gRPC server handlers + worker RPC client
//! └── lifecycle.rs – process wiring and start/stop order (C8)
//! ```

pub mod config;
pub mod ga;
pub mod history;
pub mod lifecycle;
pub mod params;
pub mod proto;
pub mod queue;
pub mod registry;
pub mod rpc;
pub mod scheduler;
pub mod store;
pub mod task;
pub mod tau;
pub mod telemetry;
pub mod worker;
