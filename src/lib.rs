//! streamgate - HTTP byte-range gateway for channel-stored media
//!
//! Turns files stored as channel messages on a chunk-oriented backing
//! service into plain HTTP resources with full `Range` support. A fixed
//! pool of backing clients shares the transfer load; every route is
//! gated by a per-file hash so message ids alone grant nothing.
//!
//! # Architecture
//!
//! - [`pool`]: fixed client pool with least-loaded selection and RAII
//!   workload accounting
//! - [`resolver`]: message-to-`FileHandle` resolution with a process-wide
//!   cache
//! - [`planner`]: maps a byte range onto aligned chunk fetches with
//!   dynamic chunk sizing
//! - [`reader`]: lazy chunk stream that trims boundary parts and treats
//!   short chunks as authoritative EOF
//! - [`secure_link`]: route-id grammar and the fail-closed hash gate
//! - [`server`]: axum routes (`/dl/:id`, `/watch/:id`, `/status`) wiring
//!   the pieces into streaming responses
//! - [`dir_source`]: directory-backed transport for local serving and
//!   development
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use streamgate::config::GateConfig;
//! use streamgate::dir_source::DirSource;
//! use streamgate::pool::ClientPool;
//! use streamgate::server::{serve, AppState};
//! use streamgate::transfer::Transport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GateConfig::default();
//!     let transports: Vec<Arc<dyn Transport>> = (0..config.pool_size)
//!         .map(|_| Arc::new(DirSource::new(&config.library_root)) as _)
//!         .collect();
//!     let pool = ClientPool::new(transports)?;
//!     serve(Arc::new(AppState::new(config, pool))).await
//! }
//! ```

pub mod config;
pub mod dir_source;
pub mod error;
pub mod metrics;
pub mod models;
pub mod planner;
pub mod pool;
pub mod reader;
pub mod resolver;
pub mod secure_link;
pub mod server;
pub mod transfer;

#[doc(hidden)]
pub mod testutil;

pub use config::GateConfig;
pub use error::{GateError, Result};
pub use models::{ByteRange, FileHandle, FileMeta};
pub use planner::{ChunkPlan, ChunkPlanner};
pub use pool::{BackingClient, ClientPool, WorkloadGuard};
pub use resolver::FileResolver;
pub use server::AppState;
pub use transfer::{ChunkSource, MessageSource, Transport};
