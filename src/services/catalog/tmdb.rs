/// TMDB catalog
///
/// Endpoints used:
/// 1. Discover: /discover/movie → filtered pages (cached by the engine, keyed on query fingerprint)
/// 2. Search: /search/movie → title matches
/// 3. Details: /movie/{id}?append_to_response=credits,videos,watch/providers
/// 4. Availability: /movie/{id}/watch/providers → every region in one response
/// 5. Region catalog: /watch/providers/movie?watch_region={region}
/// 6. Lists: /movie/now_playing, /movie/popular
use crate::{
    cached,
    db::{
        cache::{DETAILS_TTL, LIST_TTL},
        Cache, CacheKey,
    },
    error::{AppError, AppResult},
    models::{
        ApiRegionProviders, ListKind, MovieDetails, MovieId, MoviePage, Provider, Region,
        RegionAvailability,
    },
    services::{
        catalog::{client::ResilientClient, CatalogApi},
        discovery::query::DiscoverQuery,
    },
};

/// Query parameter carrying the TMDB v3 key
pub const TMDB_KEY_PARAM: &str = "api_key";

const DETAILS_APPENDS: &str = "credits,videos,watch/providers";

#[derive(Clone)]
pub struct TmdbCatalog {
    client: ResilientClient,
    cache: Cache,
}

impl TmdbCatalog {
    pub fn new(client: ResilientClient, cache: Cache) -> Self {
        Self { client, cache }
    }

    async fn fetch_search(&self, text: &str, page: u32) -> AppResult<MoviePage> {
        self.client
            .fetch_json(
                "/search/movie",
                &[
                    ("query", text.to_string()),
                    ("page", page.to_string()),
                    ("include_adult", "false".to_string()),
                ],
            )
            .await
    }

    async fn fetch_details(&self, movie_id: MovieId) -> AppResult<MovieDetails> {
        self.client
            .fetch_json(
                &format!("/movie/{}", movie_id),
                &[("append_to_response", DETAILS_APPENDS.to_string())],
            )
            .await
    }

    async fn fetch_list(&self, kind: ListKind, region: &Region, page: u32) -> AppResult<MoviePage> {
        self.client
            .fetch_json(
                kind.path(),
                &[("region", region.to_string()), ("page", page.to_string())],
            )
            .await
    }
}

#[async_trait::async_trait]
impl CatalogApi for TmdbCatalog {
    async fn discover(&self, query: &DiscoverQuery, page: u32) -> AppResult<MoviePage> {
        let page = self
            .client
            .fetch_json::<MoviePage>("/discover/movie", &query.params_for_page(page))
            .await?;

        tracing::debug!(
            page = page.page,
            results = page.results.len(),
            total_pages = page.total_pages,
            "Discover page fetched"
        );

        Ok(page)
    }

    async fn search(&self, text: &str, page: u32) -> AppResult<MoviePage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::Search {
                query: text.to_string(),
                page,
            },
            LIST_TTL,
            self.fetch_search(text, page)
        )
    }

    async fn movie_details(&self, movie_id: MovieId) -> AppResult<MovieDetails> {
        cached!(
            self.cache,
            CacheKey::MovieDetails(movie_id),
            DETAILS_TTL,
            self.fetch_details(movie_id)
        )
    }

    async fn movie_providers(&self, movie_id: MovieId) -> AppResult<RegionAvailability> {
        self.client
            .fetch_json(&format!("/movie/{}/watch/providers", movie_id), &[])
            .await
    }

    async fn region_providers(&self, region: &Region) -> AppResult<Vec<Provider>> {
        let response: ApiRegionProviders = self
            .client
            .fetch_json(
                "/watch/providers/movie",
                &[("watch_region", region.to_string())],
            )
            .await?;

        Ok(response
            .results
            .into_iter()
            .map(|p| p.into_provider(region))
            .collect())
    }

    async fn list(&self, kind: ListKind, region: &Region, page: u32) -> AppResult<MoviePage> {
        cached!(
            self.cache,
            CacheKey::List {
                kind,
                region: region.clone(),
                page,
            },
            LIST_TTL,
            self.fetch_list(kind, region, page)
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
