use std::sync::Arc;

use crate::{
    cached,
    db::{
        cache::{AVAILABILITY_TTL, REGION_PROVIDERS_TTL},
        Cache, CacheKey,
    },
    error::AppResult,
    models::{MovieId, Provider, Region, WatchProviders},
    services::catalog::CatalogApi,
};

/// Region-scoped watch provider lookups
///
/// The catalog answers availability for every region at once; each region is
/// cached under its own key so a later request for another region is served
/// without a second upstream call.
#[derive(Clone)]
pub struct AvailabilityResolver {
    catalog: Arc<dyn CatalogApi>,
    cache: Cache,
}

impl AvailabilityResolver {
    pub fn new(catalog: Arc<dyn CatalogApi>, cache: Cache) -> Self {
        Self { catalog, cache }
    }

    /// Offers for one movie in one region. A region with no offers resolves to an empty set.
    pub async fn resolve_movie(&self, movie_id: MovieId, region: &Region) -> AppResult<WatchProviders> {
        cached!(
            self.cache,
            CacheKey::Availability {
                movie_id,
                region: region.clone(),
            },
            AVAILABILITY_TTL,
            self.fetch_movie(movie_id, region)
        )
    }

    /// Every provider operating in a region, by display priority
    pub async fn resolve_region_catalog(&self, region: &Region) -> AppResult<Vec<Provider>> {
        cached!(
            self.cache,
            CacheKey::RegionProviders(region.clone()),
            REGION_PROVIDERS_TTL,
            self.fetch_region_catalog(region)
        )
    }

    /// True when the provider streams the movie in the region
    pub async fn offers_provider(
        &self,
        movie_id: MovieId,
        region: &Region,
        provider_id: u32,
    ) -> AppResult<bool> {
        let providers = self.resolve_movie(movie_id, region).await?;
        Ok(providers.streams_on(provider_id))
    }

    /// Display name of a provider, falling back to its id when the region catalog is unavailable
    pub async fn provider_name(&self, region: &Region, provider_id: u32) -> String {
        match self.resolve_region_catalog(region).await {
            Ok(providers) => {
                if let Some(provider) = providers.into_iter().find(|p| p.id == provider_id) {
                    return provider.name;
                }
            }
            Err(e) => {
                tracing::warn!(region = %region, provider_id, error = %e, "Provider name lookup failed");
            }
        }
        format!("provider {}", provider_id)
    }

    /// Fetches all regions, warms the cache for the others and returns the requested one
    async fn fetch_movie(&self, movie_id: MovieId, region: &Region) -> AppResult<WatchProviders> {
        let availability = self.catalog.movie_providers(movie_id).await?;

        let mut requested = WatchProviders::default();
        for (code, providers) in availability.results {
            let other = match Region::parse(&code) {
                Ok(other) => other,
                Err(_) => {
                    tracing::debug!(movie_id, code = %code, "Skipping unknown region code");
                    continue;
                }
            };

            if &other == region {
                requested = providers;
            } else {
                self.cache.set(
                    &CacheKey::Availability {
                        movie_id,
                        region: other,
                    },
                    &providers,
                    AVAILABILITY_TTL,
                );
            }
        }

        tracing::debug!(
            movie_id,
            region = %region,
            offers = !requested.is_empty(),
            catalog = self.catalog.name(),
            "Availability resolved"
        );

        Ok(requested)
    }

    async fn fetch_region_catalog(&self, region: &Region) -> AppResult<Vec<Provider>> {
        let mut providers = self.catalog.region_providers(region).await?;
        providers.sort_by(|a, b| {
            a.display_priority
                .cmp(&b.display_priority)
                .then_with(|| a.name.cmp(&b.name))
        });

        tracing::info!(region = %region, providers = providers.len(), "Region provider catalog loaded");
        Ok(providers)
    }
}
