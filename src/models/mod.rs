use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Display};

use crate::error::{AppError, AppResult};

pub mod criteria;
pub mod interaction;
pub mod movie;

pub use criteria::{Bounds, FilterCriteria, SortBy, SortField, SortOrder};
pub use interaction::{InteractionKind, LegacyHistory};
pub use movie::{
    CastMember, Credits, ExternalRatings, Genre, ListKind, MovieDetails, MovieId, MoviePage,
    MovieSummary, ProviderOffer, RegionAvailability, Video, Videos, WatchProviders,
};

/// ISO 3166-1 alpha-2 country code scoping provider availability
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region(String);

impl Region {
    /// Validates and upper-cases a region code
    pub fn parse(code: &str) -> AppResult<Self> {
        let code = code.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::InvalidInput(format!(
                "Region must be a two-letter ISO country code, got '{}'",
                code
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Region {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Region::parse(&value)
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.0
    }
}

/// A streaming, rental or purchase service as offered in one region
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: u32,
    pub name: String,
    pub logo_path: Option<String>,
    pub display_priority: u32,
}

// ============================================================================
// TMDB wire types
// ============================================================================

/// Entry of `GET /watch/providers/movie?watch_region=XX`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRegionProvider {
    pub provider_id: u32,
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub display_priority: u32,
    #[serde(default)]
    pub display_priorities: HashMap<String, u32>,
}

impl ApiRegionProvider {
    /// Converts to a provider, using the region's own display priority when listed
    pub fn into_provider(self, region: &Region) -> Provider {
        let display_priority = self
            .display_priorities
            .get(region.as_str())
            .copied()
            .unwrap_or(self.display_priority);

        Provider {
            id: self.provider_id,
            name: self.provider_name,
            logo_path: self.logo_path,
            display_priority,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRegionProviders {
    #[serde(default)]
    pub results: Vec<ApiRegionProvider>,
}

// ============================================================================
// OMDb wire types
// ============================================================================

pub const IMDB_SOURCE: &str = "Internet Movie Database";
pub const ROTTEN_TOMATOES_SOURCE: &str = "Rotten Tomatoes";

#[derive(Debug, Clone, Deserialize)]
pub struct OmdbRating {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// Response of `GET /?i=<imdb id>`
#[derive(Debug, Clone, Deserialize)]
pub struct OmdbResponse {
    #[serde(rename = "Ratings", default)]
    pub ratings: Vec<OmdbRating>,
    #[serde(rename = "Response", default)]
    pub response: Option<String>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}

impl From<OmdbResponse> for ExternalRatings {
    fn from(response: OmdbResponse) -> Self {
        let value_for = |source: &str| {
            response
                .ratings
                .iter()
                .find(|r| r.source == source)
                .map(|r| r.value.clone())
        };

        ExternalRatings {
            imdb: value_for(IMDB_SOURCE),
            rotten_tomatoes: value_for(ROTTEN_TOMATOES_SOURCE),
        }
    }
}
