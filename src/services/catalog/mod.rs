/// Movie catalog and ratings abstraction
///
/// The discovery engine, availability resolver and HTTP handlers only talk to
/// these traits. Implementations own the wire format and any caching of
/// responses that are not region- or query-derived.
use crate::{
    error::AppResult,
    models::{ExternalRatings, ListKind, MovieDetails, MovieId, MoviePage, Provider, Region, RegionAvailability},
    services::discovery::query::DiscoverQuery,
};

pub mod client;
pub mod omdb;
pub mod tmdb;

pub use client::{ResilientClient, RetryPolicy, ReqwestTransport, Transport};
pub use omdb::OmdbRatings;
pub use tmdb::TmdbCatalog;

/// Read access to the movie catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogApi: Send + Sync {
    /// One page of a filtered discover query
    async fn discover(&self, query: &DiscoverQuery, page: u32) -> AppResult<MoviePage>;

    /// Free-text title search
    async fn search(&self, text: &str, page: u32) -> AppResult<MoviePage>;

    /// Full details including credits, videos and per-region providers
    async fn movie_details(&self, movie_id: MovieId) -> AppResult<MovieDetails>;

    /// Watch providers for every region the catalog knows about
    async fn movie_providers(&self, movie_id: MovieId) -> AppResult<RegionAvailability>;

    /// Every provider operating in a region
    async fn region_providers(&self, region: &Region) -> AppResult<Vec<Provider>>;

    async fn list(&self, kind: ListKind, region: &Region, page: u32) -> AppResult<MoviePage>;

    /// Catalog name for logging
    fn name(&self) -> &'static str;
}

/// Third-party ratings lookup by IMDb id
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingsApi: Send + Sync {
    async fn ratings(&self, imdb_id: &str) -> AppResult<ExternalRatings>;
}
