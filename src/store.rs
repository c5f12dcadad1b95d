//! The store answers utilization and studio queries from memory where it
//! can and falls back to the upstream API otherwise.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::cache::{UtilizationCache, DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::directory::{StudioDirectory, StudioLookup, Studios};
use crate::responses::{current_workload, UtilizationResponse};
use crate::upstream::FitxClient;

/// Result of one upstream utilization fetch, shared by everyone waiting on it
type FetchOutcome = Option<Arc<UtilizationResponse>>;

/// Receives the outcome of a fetch once the fetching caller publishes it
type InFlight = watch::Receiver<Option<FetchOutcome>>;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long an enriched utilization snapshot is served from memory
    pub utilization_ttl: Duration,
    pub cache_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            utilization_ttl: DEFAULT_TTL,
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

pub struct Store {
    client: FitxClient,
    directory: StudioDirectory,
    cache: UtilizationCache,
    // Studios with an upstream fetch running. Concurrent misses for the same
    // id subscribe to that fetch instead of starting their own.
    in_flight: DashMap<u64, InFlight>,
}

enum Role {
    Fetch(watch::Sender<Option<FetchOutcome>>),
    Wait(InFlight),
}

/// Removes the in-flight marker when the fetching caller finishes or is
/// dropped mid-fetch.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<u64, InFlight>,
    studio_id: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.studio_id);
    }
}

impl Store {
    /// Build a store and load the studio directory once.
    ///
    /// A failed initial load is logged; the directory is retried on the
    /// next studio listing or scheduled refresh.
    pub async fn new(client: FitxClient, config: StoreConfig) -> Self {
        let store = Self {
            client,
            directory: StudioDirectory::new(),
            cache: UtilizationCache::with_capacity(config.utilization_ttl, config.cache_capacity),
            in_flight: DashMap::new(),
        };
        store.update_studios().await;
        store
    }

    pub fn directory(&self) -> &StudioDirectory {
        &self.directory
    }

    pub fn cache(&self) -> &UtilizationCache {
        &self.cache
    }

    /// Enriched utilization for a studio, `None` if upstream could not
    /// deliver it.
    ///
    /// Concurrent misses for one studio share a single upstream call and
    /// all receive its outcome, failures included.
    pub async fn get_utilization(&self, studio_id: u64) -> Option<Arc<UtilizationResponse>> {
        loop {
            if let Some(hit) = self.cache.get(studio_id) {
                debug!(studio_id, "utilization cache hit");
                return Some(hit);
            }

            let role = match self.in_flight.entry(studio_id) {
                Entry::Occupied(entry) => Role::Wait(entry.get().clone()),
                Entry::Vacant(entry) => {
                    let (tx, rx) = watch::channel(None);
                    entry.insert(rx);
                    Role::Fetch(tx)
                }
            };

            match role {
                Role::Fetch(tx) => {
                    let _guard = InFlightGuard {
                        in_flight: &self.in_flight,
                        studio_id,
                    };
                    let outcome = self.fetch_utilization(studio_id).await;
                    tx.send_replace(Some(outcome.clone()));
                    return outcome;
                }
                Role::Wait(mut rx) => {
                    if let Some(outcome) = wait_for_fetch(&mut rx).await {
                        return outcome;
                    }
                    // The fetching caller was dropped before publishing; retry.
                }
            }
        }
    }

    async fn fetch_utilization(&self, studio_id: u64) -> FetchOutcome {
        let studio = self.directory.lookup(studio_id);
        let magicline_id = studio.magicline_id;
        debug!(studio_id, magicline_id, "utilization cache miss");

        let mut utilization = match self.client.fetch_utilization(magicline_id).await {
            Ok(utilization) => utilization,
            Err(e) => {
                error!(studio_id, magicline_id, error = %e, "could not fetch utilization");
                return None;
            }
        };

        enrich(studio_id, studio, &mut utilization);

        let snapshot = Arc::new(utilization);
        self.cache.set(studio_id, snapshot.clone());
        Some(snapshot)
    }

    /// All known studios, loading the directory first if it is empty.
    pub async fn get_studios(&self) -> Option<Studios> {
        match self.directory.list(&self.client).await {
            Ok(studios) => Some(studios),
            Err(e) => {
                error!(error = %e, "could not load studio directory");
                None
            }
        }
    }

    /// Reload the studio directory from upstream.
    pub async fn update_studios(&self) -> Option<Studios> {
        match self.directory.refresh(&self.client).await {
            Ok(studios) => Some(studios),
            Err(e) => {
                warn!(error = %e, "studio directory refresh failed, keeping previous set");
                None
            }
        }
    }

    pub fn studio_exists(&self, studio_id: u64) -> bool {
        self.directory.exists(studio_id)
    }
}

fn enrich(studio_id: u64, studio: StudioLookup, utilization: &mut UtilizationResponse) {
    utilization.uuid = studio.uuid;
    utilization.name = studio.name;
    utilization.workload = match current_workload(&utilization.items) {
        Some(workload) => workload,
        None => {
            error!(studio_id, "no current data point in utilization");
            0
        }
    };
}

/// Wait for the fetching caller to publish its outcome. `None` means it went
/// away without publishing.
async fn wait_for_fetch(rx: &mut InFlight) -> Option<FetchOutcome> {
    loop {
        if let Some(outcome) = rx.borrow_and_update().clone() {
            return Some(outcome);
        }
        if rx.changed().await.is_err() {
            return rx.borrow().clone();
        }
    }
}
