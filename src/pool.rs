//! Client pool and load balancer
//!
//! Owns the fixed set of backing clients created at startup. Each client
//! carries an atomic workload counter (in-flight transfers); selection is
//! a linear least-loaded scan. A racy read-then-select only costs balance
//! accuracy, never correctness, so plain relaxed atomics suffice.

use crate::error::{GateError, Result};
use crate::transfer::Transport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One authenticated connection to the backing chunk-transfer service
pub struct BackingClient {
    /// Stable identity, equal to the client's index in the pool
    id: usize,
    /// The transport this client speaks through
    transport: Arc<dyn Transport>,
    /// Count of in-flight transfers attributed to this client
    workload: AtomicU64,
}

impl BackingClient {
    /// Stable pool index of this client
    pub fn id(&self) -> usize {
        self.id
    }

    /// The underlying transport
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Current workload sample
    pub fn workload(&self) -> u64 {
        self.workload.load(Ordering::Relaxed)
    }

    /// Attribute a new in-flight transfer to this client
    ///
    /// The returned guard decrements the counter exactly once when
    /// dropped, which covers normal completion, early EOF, fetch errors
    /// and client disconnects alike.
    pub fn begin_transfer(self: &Arc<Self>) -> WorkloadGuard {
        self.workload.fetch_add(1, Ordering::Relaxed);
        WorkloadGuard {
            client: Arc::clone(self),
        }
    }
}

impl std::fmt::Debug for BackingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackingClient")
            .field("id", &self.id)
            .field("workload", &self.workload())
            .finish()
    }
}

/// RAII handle for one in-flight transfer
///
/// Dropping the guard releases the workload accounting. The streaming
/// body owns its guard, so every exit path through the HTTP layer ends
/// with exactly one decrement.
pub struct WorkloadGuard {
    client: Arc<BackingClient>,
}

impl WorkloadGuard {
    /// The client this transfer is attributed to
    pub fn client(&self) -> &Arc<BackingClient> {
        &self.client
    }
}

impl Drop for WorkloadGuard {
    fn drop(&mut self) {
        self.client.workload.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Fixed pool of backing clients with least-loaded selection
pub struct ClientPool {
    clients: Vec<Arc<BackingClient>>,
}

impl ClientPool {
    /// Build a pool from the transports created at startup
    ///
    /// An empty transport list is a fatal startup condition, not a
    /// runtime error.
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Result<Self> {
        if transports.is_empty() {
            return Err(GateError::ConfigError(
                "client pool requires at least one backing client".to_string(),
            ));
        }

        let clients = transports
            .into_iter()
            .enumerate()
            .map(|(id, transport)| {
                Arc::new(BackingClient {
                    id,
                    transport,
                    workload: AtomicU64::new(0),
                })
            })
            .collect();

        Ok(ClientPool { clients })
    }

    /// Select the least-loaded client; ties break to the lowest index
    ///
    /// Never blocks and always returns a client: the pool is non-empty by
    /// construction.
    pub fn pick_least_loaded(&self) -> Arc<BackingClient> {
        let picked = self
            .clients
            .iter()
            .min_by_key(|c| c.workload())
            .expect("pool is never empty");

        debug!(
            "Picked client {} (workload={}) of {}",
            picked.id(),
            picked.workload(),
            self.clients.len()
        );
        Arc::clone(picked)
    }

    /// Client by pool index
    pub fn get(&self, id: usize) -> Option<&Arc<BackingClient>> {
        self.clients.get(id)
    }

    /// Number of clients in the pool
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether the pool is empty (never true after construction)
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Workload sample per client, indexed by client id
    pub fn workloads(&self) -> Vec<u64> {
        self.clients.iter().map(|c| c.workload()).collect()
    }

    /// Sum of all clients' workloads
    pub fn total_workload(&self) -> u64 {
        self.clients.iter().map(|c| c.workload()).sum()
    }
}
