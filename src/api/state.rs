use std::sync::Arc;

use crate::{
    db::Cache,
    models::Region,
    services::{
        discovery::RandomSource, AvailabilityResolver, CatalogApi, DiscoveryEngine,
        HistoryLedger, RatingsApi,
    },
};

/// Shared application state
///
/// Services are built once at startup and shared by reference; the cache and
/// ledger handles are cheap clones of the same underlying store.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DiscoveryEngine>,
    pub catalog: Arc<dyn CatalogApi>,
    /// Absent when no ratings key is configured
    pub ratings: Option<Arc<dyn RatingsApi>>,
    pub availability: AvailabilityResolver,
    pub history: HistoryLedger,
    pub default_region: Region,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        ratings: Option<Arc<dyn RatingsApi>>,
        history: HistoryLedger,
        cache: Cache,
        random: Arc<dyn RandomSource>,
        default_region: Region,
    ) -> Self {
        let availability = AvailabilityResolver::new(catalog.clone(), cache.clone());
        let engine = DiscoveryEngine::new(
            catalog.clone(),
            cache,
            history.clone(),
            availability.clone(),
            random,
            default_region.clone(),
        );

        Self {
            engine: Arc::new(engine),
            catalog,
            ratings,
            availability,
            history,
            default_region,
        }
    }

    /// Region named by a request, or the configured default
    pub fn region_or_default(&self, code: Option<&str>) -> crate::error::AppResult<Region> {
        match code {
            Some(code) => Region::parse(code),
            None => Ok(self.default_region.clone()),
        }
    }
}
