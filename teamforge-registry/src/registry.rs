//! ABOUTME: Keyed worker registry: typed clients, reachability status, concurrent health probing
//! ABOUTME: The workers map is a single read-write lock; readers receive a snapshot copy

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use teamforge_core::rpc::HealthResponse;
use tracing::warn;

use crate::client::WorkerClient;
use crate::discovery::DiscoveredWorker;
use crate::error::{RegistryError, Result};

/// Reachability as last observed by a health probe or a proxied call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Unknown,
    Reachable,
    Unreachable,
}

/// Aggregate reachability across the whole registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

struct Entry {
    id: String,
    name: String,
    url: String,
    client: Arc<WorkerClient>,
    status: WorkerStatus,
    info: Option<HealthResponse>,
    worker_type: Option<String>,
    version: Option<String>,
}

/// A snapshot of one worker's registry entry, safe to hand to callers without
/// exposing the lock or the client itself. `worker_type`/`version` come from
/// the worker's own `/config` route; `available` mirrors `status == Reachable`.
#[derive(Debug, Clone)]
pub struct WorkerInfo {
    pub id: String,
    pub name: String,
    pub url: String,
    pub status: WorkerStatus,
    pub health: Option<HealthResponse>,
    pub worker_type: Option<String>,
    pub version: Option<String>,
    pub available: bool,
}

impl From<&Entry> for WorkerInfo {
    fn from(e: &Entry) -> Self {
        Self {
            id: e.id.clone(),
            name: e.name.clone(),
            url: e.url.clone(),
            status: e.status,
            health: e.info.clone(),
            worker_type: e.worker_type.clone(),
            version: e.version.clone(),
            available: e.status == WorkerStatus::Reachable,
        }
    }
}

/// Keyed, concurrency-safe worker registry.
pub struct Registry {
    workers: RwLock<HashMap<String, Entry>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
        }
    }

    /// Build a registry from a discovery pass, registering every discovered worker.
    pub fn from_discovered(discovered: Vec<DiscoveredWorker>) -> Self {
        let registry = Self::new();
        for worker in discovered {
            registry.register(worker);
        }
        registry
    }

    /// Register (or replace) a worker entry. Status starts `unknown`.
    pub fn register(&self, worker: DiscoveredWorker) {
        let client = Arc::new(WorkerClient::new(worker.url.clone(), worker.api_key.clone()));
        let entry = Entry {
            id: worker.id.clone(),
            name: worker.name,
            url: worker.url,
            client,
            status: WorkerStatus::Unknown,
            info: None,
            worker_type: None,
            version: None,
        };
        self.workers.write().insert(worker.id, entry);
    }

    pub fn client(&self, id: &str) -> Result<Arc<WorkerClient>> {
        self.workers
            .read()
            .get(id)
            .map(|e| e.client.clone())
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// Snapshot of one worker's entry.
    pub fn get(&self, id: &str) -> Option<WorkerInfo> {
        self.workers.read().get(id).map(WorkerInfo::from)
    }

    /// Snapshot of every worker's entry, sorted by id for deterministic output.
    pub fn list(&self) -> Vec<WorkerInfo> {
        let mut infos: Vec<WorkerInfo> = self.workers.read().values().map(WorkerInfo::from).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Record the outcome of a proxied call: success marks the worker
    /// reachable, a transport/RPC error marks it unreachable.
    pub fn record_proxy_outcome(&self, id: &str, reachable: bool) {
        if let Some(entry) = self.workers.write().get_mut(id) {
            entry.status = if reachable {
                WorkerStatus::Reachable
            } else {
                WorkerStatus::Unreachable
            };
        }
    }

    /// Probe every registered worker's health and identity concurrently. Each
    /// worker's `/health` and `/config` probes race independently; a slow or
    /// hung worker does not delay the others beyond its own requests.
    /// `worker_type`/`version` are only refreshed when `/config` succeeds, so a
    /// flapping `/config` route doesn't erase previously-cached identity.
    pub async fn perform_health_checks(&self) {
        let targets: Vec<(String, Arc<WorkerClient>)> = {
            let workers = self.workers.read();
            workers.iter().map(|(id, e)| (id.clone(), e.client.clone())).collect()
        };

        let probes = targets.into_iter().map(|(id, client)| {
            tokio::spawn(async move {
                let health = client.get_health().await;
                let config = client.get_config().await;
                (id, health, config)
            })
        });

        for probe in probes {
            match probe.await {
                Ok((id, health_result, config_result)) => {
                    let mut workers = self.workers.write();
                    let Some(entry) = workers.get_mut(&id) else { continue };
                    match health_result {
                        Ok(health) => {
                            entry.status = WorkerStatus::Reachable;
                            entry.info = Some(health);
                        }
                        Err(e) => {
                            warn!(worker = %id, error = %e, "health probe failed");
                            entry.status = WorkerStatus::Unreachable;
                            entry.info = None;
                        }
                    }
                    match config_result {
                        Ok(config) => {
                            entry.worker_type = Some(config.worker_type);
                            entry.version = Some(config.version);
                        }
                        Err(e) => warn!(worker = %id, error = %e, "config probe failed"),
                    }
                }
                Err(e) => warn!(error = %e, "health probe task panicked"),
            }
        }
    }

    /// `healthy` iff every worker is reachable, `degraded` iff at least one
    /// is, `unhealthy` otherwise. An empty registry is `healthy` vacuously.
    pub fn aggregate_health(&self) -> AggregateHealth {
        let workers = self.workers.read();
        if workers.is_empty() {
            return AggregateHealth::Healthy;
        }
        let reachable = workers.values().filter(|e| e.status == WorkerStatus::Reachable).count();
        if reachable == workers.len() {
            AggregateHealth::Healthy
        } else if reachable > 0 {
            AggregateHealth::Degraded
        } else {
            AggregateHealth::Unhealthy
        }
    }

    /// Tear down every client. Clients hold no persistent connections beyond
    /// `reqwest`'s pooled sockets, so this simply drops the entries.
    pub fn close(&self) {
        self.workers.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(id: &str) -> DiscoveredWorker {
        DiscoveredWorker {
            id: id.to_string(),
            name: id.to_string(),
            url: "http://localhost:1".to_string(),
            api_key: String::new(),
        }
    }

    #[test]
    fn empty_registry_is_healthy() {
        let registry = Registry::new();
        assert_eq!(registry.aggregate_health(), AggregateHealth::Healthy);
    }

    #[test]
    fn register_starts_unknown() {
        let registry = Registry::new();
        registry.register(worker("a"));
        assert_eq!(registry.get("a").unwrap().status, WorkerStatus::Unknown);
    }

    #[test]
    fn aggregate_health_reflects_mixed_reachability() {
        let registry = Registry::new();
        registry.register(worker("a"));
        registry.register(worker("b"));
        registry.record_proxy_outcome("a", true);
        assert_eq!(registry.aggregate_health(), AggregateHealth::Degraded);
        registry.record_proxy_outcome("b", true);
        assert_eq!(registry.aggregate_health(), AggregateHealth::Healthy);
        registry.record_proxy_outcome("a", false);
        registry.record_proxy_outcome("b", false);
        assert_eq!(registry.aggregate_health(), AggregateHealth::Unhealthy);
    }

    #[test]
    fn unknown_worker_client_lookup_errors() {
        let registry = Registry::new();
        assert!(registry.client("ghost").is_err());
    }

    #[test]
    fn list_is_sorted_and_is_a_snapshot() {
        let registry = Registry::new();
        registry.register(worker("b"));
        registry.register(worker("a"));
        let ids: Vec<String> = registry.list().into_iter().map(|w| w.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn close_clears_all_entries() {
        let registry = Registry::new();
        registry.register(worker("a"));
        registry.close();
        assert!(registry.list().is_empty());
    }
}
