//! In-memory studio directory.
//!
//! The directory is an immutable snapshot behind a lock. A refresh builds
//! the new set off-lock and swaps the `Arc` in one step, so readers always
//! see one complete generation of studios.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::error::UpstreamError;
use crate::responses::StudioInfo;
use crate::upstream::FitxClient;

/// Shared, immutable view of all known studios
pub type Studios = Arc<Vec<StudioInfo>>;

/// Internal id used when a studio is not in the directory
pub const UNKNOWN_MAGICLINE_ID: u64 = 0;

#[derive(Debug, Default)]
pub struct StudioDirectory {
    studios: RwLock<Studios>,
}

impl StudioDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Studios {
        self.studios
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a complete new set of studios.
    pub fn replace(&self, studios: Vec<StudioInfo>) -> Studios {
        let studios = Arc::new(studios);
        *self.studios.write().unwrap_or_else(PoisonError::into_inner) = studios.clone();
        studios
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Fetch the full directory from upstream and replace the current set.
    ///
    /// On failure the current set is left untouched.
    pub async fn refresh(&self, client: &FitxClient) -> Result<Studios, UpstreamError> {
        let response = client.fetch_studios().await?;
        let studios = self.replace(response.content);
        info!(count = studios.len(), "studio directory refreshed");
        Ok(studios)
    }

    /// Current set, refreshed first when nothing is known yet.
    pub async fn list(&self, client: &FitxClient) -> Result<Studios, UpstreamError> {
        let current = self.snapshot();
        if !current.is_empty() {
            return Ok(current);
        }
        self.refresh(client).await
    }

    pub fn find(&self, studio_id: u64) -> Option<StudioInfo> {
        self.snapshot()
            .iter()
            .find(|studio| studio.id == studio_id)
            .cloned()
    }

    pub fn exists(&self, studio_id: u64) -> bool {
        self.snapshot().iter().any(|studio| studio.id == studio_id)
    }

    /// Upstream id, uuid and name of a studio, all read from one directory
    /// generation. Unknown studios resolve to [`UNKNOWN_MAGICLINE_ID`] and
    /// empty strings.
    pub fn lookup(&self, studio_id: u64) -> StudioLookup {
        match self.find(studio_id) {
            Some(studio) => StudioLookup {
                magicline_id: studio.magicline_id,
                uuid: studio.uuid,
                name: studio.name,
            },
            None => {
                warn!(studio_id, "studio not in directory, using sentinel magicline id");
                StudioLookup {
                    magicline_id: UNKNOWN_MAGICLINE_ID,
                    uuid: String::new(),
                    name: String::new(),
                }
            }
        }
    }
}

/// Directory fields needed to query and enrich a utilization snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct StudioLookup {
    pub magicline_id: u64,
    pub uuid: String,
    pub name: String,
}
