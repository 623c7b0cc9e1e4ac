use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// TMDB-assigned movie identifier
pub type MovieId = i64;

/// List-level movie data as returned by discover, search and list endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

impl MovieSummary {
    /// Year component of the release date, when the upstream supplied one
    pub fn release_year(&self) -> Option<i32> {
        release_year(self.release_date.as_deref())
    }
}

fn release_year(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(0..4)).and_then(|y| y.parse().ok())
}

/// One page of a paginated movie listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MoviePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<MovieSummary>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Videos {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A single provider offer inside a region's availability block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderOffer {
    pub provider_id: u32,
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub display_priority: u32,
}

/// Offers for one movie in one region, grouped by monetisation type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WatchProviders {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<ProviderOffer>,
    #[serde(default)]
    pub rent: Vec<ProviderOffer>,
    #[serde(default)]
    pub buy: Vec<ProviderOffer>,
    #[serde(default)]
    pub free: Vec<ProviderOffer>,
    #[serde(default)]
    pub ads: Vec<ProviderOffer>,
}

impl WatchProviders {
    /// True when the provider streams the movie without a per-title payment
    pub fn streams_on(&self, provider_id: u32) -> bool {
        self.flatrate
            .iter()
            .chain(self.free.iter())
            .chain(self.ads.iter())
            .any(|offer| offer.provider_id == provider_id)
    }

    pub fn is_empty(&self) -> bool {
        self.flatrate.is_empty()
            && self.rent.is_empty()
            && self.buy.is_empty()
            && self.free.is_empty()
            && self.ads.is_empty()
    }
}

/// Region-keyed availability, as served by `/movie/{id}/watch/providers`
/// and the `watch/providers` details appendix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RegionAvailability {
    #[serde(default)]
    pub results: HashMap<String, WatchProviders>,
}

/// Full movie record, fetched when a candidate is picked or displayed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub credits: Option<Credits>,
    #[serde(default)]
    pub videos: Option<Videos>,
    #[serde(default, rename = "watch/providers")]
    pub watch_providers: Option<RegionAvailability>,
}

impl MovieDetails {
    pub fn release_year(&self) -> Option<i32> {
        release_year(self.release_date.as_deref())
    }

    /// YouTube key of the first official trailer
    pub fn trailer_key(&self) -> Option<&str> {
        self.videos.as_ref().and_then(|videos| {
            videos
                .results
                .iter()
                .find(|v| v.site == "YouTube" && v.video_type == "Trailer")
                .map(|v| v.key.as_str())
        })
    }

    /// Offers for a region from the appended provider map
    pub fn providers_in(&self, region: &str) -> Option<&WatchProviders> {
        self.watch_providers
            .as_ref()
            .and_then(|map| map.results.get(region))
    }

    pub fn summary(&self) -> MovieSummary {
        MovieSummary {
            id: self.id,
            title: self.title.clone(),
            release_date: self.release_date.clone(),
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            poster_path: self.poster_path.clone(),
            genre_ids: self.genres.iter().map(|g| g.id).collect(),
        }
    }
}

/// Lists served without filter criteria
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    NowPlaying,
    Popular,
}

impl ListKind {
    pub fn path(&self) -> &'static str {
        match self {
            ListKind::NowPlaying => "/movie/now_playing",
            ListKind::Popular => "/movie/popular",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::NowPlaying => "now_playing",
            ListKind::Popular => "popular",
        }
    }
}

/// Third-party ratings for a movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExternalRatings {
    pub imdb: Option<String>,
    pub rotten_tomatoes: Option<String>,
}
