use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Inclusive optional bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: Copy + PartialOrd> Bounds<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn unbounded() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    pub fn contains(&self, value: T) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Popularity,
    VoteAverage,
    VoteCount,
    ReleaseDate,
    Revenue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortField {
    fn as_str(&self) -> &'static str {
        match self {
            SortField::Popularity => "popularity",
            SortField::VoteAverage => "vote_average",
            SortField::VoteCount => "vote_count",
            SortField::ReleaseDate => "primary_release_date",
            SortField::Revenue => "revenue",
        }
    }
}

/// Upstream `sort_by` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortBy(pub SortField, pub SortOrder);

impl Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let order = match self.1 {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        write!(f, "{}.{}", self.0.as_str(), order)
    }
}

/// User-selected discovery filters
///
/// Owned by the caller. The discovery engine only ever reads it and builds
/// its relaxed queries from a working copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterCriteria {
    pub genre_id: Option<u32>,
    pub provider_id: Option<u32>,
    pub min_rating: f32,
    pub min_vote_count: u32,
    /// ISO 3166-1 alpha-2; the configured default region applies when absent
    pub region: Option<String>,
    pub year: Bounds<i32>,
    pub rating: Bounds<f32>,
    /// Minutes
    pub runtime: Bounds<u32>,
    pub language: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            genre_id: None,
            provider_id: None,
            min_rating: 6.5,
            min_vote_count: 250,
            region: None,
            year: Bounds::unbounded(),
            rating: Bounds::unbounded(),
            runtime: Bounds::unbounded(),
            language: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl FilterCriteria {
    /// Effective rating floor: the larger of `min_rating` and `rating.min`
    pub fn rating_floor(&self) -> f32 {
        match self.rating.min {
            Some(min) if min > self.min_rating => min,
            _ => self.min_rating,
        }
    }

    pub fn sort(&self) -> SortBy {
        SortBy(self.sort_by, self.sort_order)
    }
}
