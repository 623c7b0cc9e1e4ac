use crate::models::{Bounds, FilterCriteria, MovieSummary, Region, SortBy};

/// Certification ceiling and excluded genres for family picks
const FAMILY_CERTIFICATION_COUNTRY: &str = "US";
const FAMILY_CERTIFICATION_MAX: &str = "PG";
const FAMILY_EXCLUDED_GENRES: [u32; 2] = [27, 53]; // Horror, Thriller

/// Filter loosening applied at a relaxation step
///
/// Caps only ever lower a threshold and flags only ever drop a constraint, so
/// merging overrides can never tighten a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overrides {
    pub rating_cap: Option<f32>,
    pub vote_count_cap: Option<u32>,
    pub drop_genre: bool,
    /// Drops year, runtime and upper rating bounds
    pub drop_bounds: bool,
    pub drop_provider: bool,
}

impl Overrides {
    pub const NONE: Overrides = Overrides {
        rating_cap: None,
        vote_count_cap: None,
        drop_genre: false,
        drop_bounds: false,
        drop_provider: false,
    };

    pub fn merge(self, other: Overrides) -> Overrides {
        Overrides {
            rating_cap: lowest(self.rating_cap, other.rating_cap),
            vote_count_cap: lowest(self.vote_count_cap, other.vote_count_cap),
            drop_genre: self.drop_genre || other.drop_genre,
            drop_bounds: self.drop_bounds || other.drop_bounds,
            drop_provider: self.drop_provider || other.drop_provider,
        }
    }
}

fn lowest<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b < a { b } else { a }),
        (a, None) => a,
        (None, b) => b,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxationStep {
    pub label: &'static str,
    pub overrides: Overrides,
}

/// Quality thresholds loosen before intent constraints (genre, then provider) are dropped
pub const RELAXATION_STEPS: [RelaxationStep; 5] = [
    RelaxationStep {
        label: "as requested",
        overrides: Overrides::NONE,
    },
    RelaxationStep {
        label: "lower thresholds",
        overrides: Overrides {
            rating_cap: Some(6.0),
            vote_count_cap: Some(100),
            ..Overrides::NONE
        },
    },
    RelaxationStep {
        label: "drop genre",
        overrides: Overrides {
            drop_genre: true,
            ..Overrides::NONE
        },
    },
    RelaxationStep {
        label: "lower thresholds further",
        overrides: Overrides {
            rating_cap: Some(4.0),
            vote_count_cap: Some(10),
            drop_bounds: true,
            ..Overrides::NONE
        },
    },
    RelaxationStep {
        label: "drop provider",
        overrides: Overrides {
            drop_provider: true,
            ..Overrides::NONE
        },
    },
];

/// Overrides of steps `0..=step`, merged
pub fn cumulative_overrides(step: usize) -> Overrides {
    RELAXATION_STEPS
        .iter()
        .take(step + 1)
        .fold(Overrides::NONE, |acc, s| acc.merge(s.overrides))
}

/// A provider filter always carries the region it was resolved for
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFilter {
    pub provider_id: u32,
    pub region: Region,
}

/// A discover request built from criteria at one relaxation step
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverQuery {
    pub genre_id: Option<u32>,
    pub provider: Option<ProviderFilter>,
    pub min_rating: f32,
    pub max_rating: Option<f32>,
    pub min_vote_count: u32,
    pub year: Bounds<i32>,
    pub runtime: Bounds<u32>,
    pub language: Option<String>,
    pub sort: SortBy,
    pub family_friendly: bool,
}

impl DiscoverQuery {
    pub fn build(criteria: &FilterCriteria, region: &Region, overrides: &Overrides) -> Self {
        let min_rating = match overrides.rating_cap {
            Some(cap) => criteria.rating_floor().min(cap),
            None => criteria.rating_floor(),
        };
        let min_vote_count = match overrides.vote_count_cap {
            Some(cap) => criteria.min_vote_count.min(cap),
            None => criteria.min_vote_count,
        };

        let provider = if overrides.drop_provider {
            None
        } else {
            criteria.provider_id.map(|provider_id| ProviderFilter {
                provider_id,
                region: region.clone(),
            })
        };

        let (year, runtime, max_rating) = if overrides.drop_bounds {
            (Bounds::unbounded(), Bounds::unbounded(), None)
        } else {
            (criteria.year, criteria.runtime, criteria.rating.max)
        };

        Self {
            genre_id: if overrides.drop_genre {
                None
            } else {
                criteria.genre_id
            },
            provider,
            min_rating,
            max_rating,
            min_vote_count,
            year,
            runtime,
            language: criteria.language.clone(),
            sort: criteria.sort(),
            family_friendly: false,
        }
    }

    pub fn family_friendly(mut self, enabled: bool) -> Self {
        self.family_friendly = enabled;
        self
    }

    /// Upstream query parameters, without the page number
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sort_by", self.sort.to_string()),
            ("include_adult", "false".to_string()),
            ("vote_average.gte", format!("{:.1}", self.min_rating)),
            ("vote_count.gte", self.min_vote_count.to_string()),
        ];

        if let Some(max) = self.max_rating {
            params.push(("vote_average.lte", format!("{:.1}", max)));
        }
        if let Some(genre_id) = self.genre_id {
            params.push(("with_genres", genre_id.to_string()));
        }
        if let Some(min) = self.year.min {
            params.push(("primary_release_date.gte", format!("{}-01-01", min)));
        }
        if let Some(max) = self.year.max {
            params.push(("primary_release_date.lte", format!("{}-12-31", max)));
        }
        if let Some(min) = self.runtime.min {
            params.push(("with_runtime.gte", min.to_string()));
        }
        if let Some(max) = self.runtime.max {
            params.push(("with_runtime.lte", max.to_string()));
        }
        if let Some(language) = &self.language {
            params.push(("with_original_language", language.clone()));
        }
        if let Some(provider) = &self.provider {
            params.push(("with_watch_providers", provider.provider_id.to_string()));
            params.push(("watch_region", provider.region.to_string()));
        }
        if self.family_friendly {
            params.push(("certification_country", FAMILY_CERTIFICATION_COUNTRY.to_string()));
            params.push(("certification.lte", FAMILY_CERTIFICATION_MAX.to_string()));
            let excluded: Vec<String> = FAMILY_EXCLUDED_GENRES.iter().map(|g| g.to_string()).collect();
            params.push(("without_genres", excluded.join(",")));
        }

        params
    }

    pub fn params_for_page(&self, page: u32) -> Vec<(&'static str, String)> {
        let mut params = self.params();
        params.push(("page", page.to_string()));
        params
    }

    /// Stable identity of the query, used as cache key component
    pub fn fingerprint(&self) -> String {
        self.params()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Local re-check of the thresholds the upstream was asked to apply
    pub fn admits(&self, movie: &MovieSummary) -> bool {
        let rating_ok = movie.vote_average >= self.min_rating
            && self.max_rating.map_or(true, |max| movie.vote_average <= max);
        let votes_ok = movie.vote_count >= self.min_vote_count;
        let genre_ok = self
            .genre_id
            .map_or(true, |genre| movie.genre_ids.contains(&genre));
        let year_ok = match movie.release_year() {
            Some(year) => self.year.contains(year),
            None => self.year.is_unbounded(),
        };
        let family_ok = !self.family_friendly
            || !movie
                .genre_ids
                .iter()
                .any(|g| FAMILY_EXCLUDED_GENRES.contains(g));

        rating_ok && votes_ok && genre_ok && year_ok && family_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortField, SortOrder};

    fn region() -> Region {
        Region::parse("US").unwrap()
    }

    fn criteria() -> FilterCriteria {
        FilterCriteria {
            genre_id: Some(35),
            provider_id: Some(8),
            min_rating: 7.0,
            min_vote_count: 500,
            region: Some("US".to_string()),
            year: Bounds::new(Some(1990), Some(2009)),
            rating: Bounds::new(None, Some(9.0)),
            runtime: Bounds::new(Some(80), Some(130)),
            language: Some("en".to_string()),
            sort_by: SortField::VoteAverage,
            sort_order: SortOrder::Desc,
        }
    }

    fn movie(id: i64, rating: f32, votes: u32, genres: &[u32], date: Option<&str>) -> MovieSummary {
        MovieSummary {
            id,
            title: format!("Movie {}", id),
            release_date: date.map(str::to_string),
            vote_average: rating,
            vote_count: votes,
            poster_path: None,
            genre_ids: genres.to_vec(),
        }
    }

    fn has(params: &[(&'static str, String)], key: &str) -> bool {
        params.iter().any(|(k, _)| *k == key)
    }

    #[test]
    fn test_step_zero_is_unmodified() {
        let query = DiscoverQuery::build(&criteria(), &region(), &cumulative_overrides(0));
        assert_eq!(query.min_rating, 7.0);
        assert_eq!(query.min_vote_count, 500);
        assert_eq!(query.genre_id, Some(35));
        assert_eq!(query.provider.as_ref().unwrap().provider_id, 8);
        assert_eq!(query.sort.to_string(), "vote_average.desc");
    }

    #[test]
    fn test_overrides_are_cumulative() {
        let step3 = cumulative_overrides(3);
        assert_eq!(step3.rating_cap, Some(4.0));
        assert_eq!(step3.vote_count_cap, Some(10));
        assert!(step3.drop_genre);
        assert!(step3.drop_bounds);
        assert!(!step3.drop_provider);

        let last = cumulative_overrides(RELAXATION_STEPS.len() - 1);
        assert!(last.drop_genre && last.drop_provider);
    }

    #[test]
    fn test_caps_never_raise_thresholds() {
        let mut loose = criteria();
        loose.min_rating = 3.0;
        loose.min_vote_count = 5;
        let query = DiscoverQuery::build(&loose, &region(), &cumulative_overrides(1));
        assert_eq!(query.min_rating, 3.0);
        assert_eq!(query.min_vote_count, 5);
    }

    #[test]
    fn test_caller_criteria_untouched() {
        let original = criteria();
        let copy = original.clone();
        let _ = DiscoverQuery::build(&copy, &region(), &cumulative_overrides(4));
        assert_eq!(original, copy);
    }

    #[test]
    fn test_provider_filter_travels_with_region() {
        let variants = [
            criteria(),
            FilterCriteria {
                provider_id: None,
                ..criteria()
            },
            FilterCriteria::default(),
        ];

        for criteria in variants.iter() {
            for step in 0..RELAXATION_STEPS.len() {
                for family in [false, true] {
                    let params =
                        DiscoverQuery::build(criteria, &region(), &cumulative_overrides(step))
                            .family_friendly(family)
                            .params();
                    assert_eq!(
                        has(&params, "with_watch_providers"),
                        has(&params, "watch_region"),
                        "step {} params {:?}",
                        step,
                        params
                    );
                }
            }
        }
    }

    #[test]
    fn test_provider_params_use_region() {
        let gb = Region::parse("gb").unwrap();
        let params = DiscoverQuery::build(&criteria(), &gb, &Overrides::NONE).params();
        assert!(params.contains(&("with_watch_providers", "8".to_string())));
        assert!(params.contains(&("watch_region", "GB".to_string())));
    }

    #[test]
    fn test_drop_provider_removes_both_params() {
        let params = DiscoverQuery::build(&criteria(), &region(), &cumulative_overrides(4)).params();
        assert!(!has(&params, "with_watch_providers"));
        assert!(!has(&params, "watch_region"));
        assert!(!has(&params, "with_genres"));
        assert!(!has(&params, "primary_release_date.gte"));
    }

    #[test]
    fn test_full_params() {
        let params = DiscoverQuery::build(&criteria(), &region(), &Overrides::NONE)
            .params_for_page(3);
        for expected in [
            ("vote_average.gte", "7.0"),
            ("vote_average.lte", "9.0"),
            ("vote_count.gte", "500"),
            ("with_genres", "35"),
            ("primary_release_date.gte", "1990-01-01"),
            ("primary_release_date.lte", "2009-12-31"),
            ("with_runtime.gte", "80"),
            ("with_runtime.lte", "130"),
            ("with_original_language", "en"),
            ("page", "3"),
        ] {
            assert!(
                params.contains(&(expected.0, expected.1.to_string())),
                "missing {:?}",
                expected
            );
        }
    }

    #[test]
    fn test_family_params() {
        let params = DiscoverQuery::build(&FilterCriteria::default(), &region(), &Overrides::NONE)
            .family_friendly(true)
            .params();
        assert!(params.contains(&("certification.lte", "PG".to_string())));
        assert!(params.contains(&("without_genres", "27,53".to_string())));
    }

    #[test]
    fn test_fingerprint_differs_per_step_and_ignores_page() {
        let base = DiscoverQuery::build(&criteria(), &region(), &cumulative_overrides(0));
        let relaxed = DiscoverQuery::build(&criteria(), &region(), &cumulative_overrides(1));
        assert_ne!(base.fingerprint(), relaxed.fingerprint());
        assert!(!base.fingerprint().contains("page="));
    }

    #[test]
    fn test_admits_checks_thresholds() {
        let query = DiscoverQuery::build(&criteria(), &region(), &Overrides::NONE);
        assert!(query.admits(&movie(1, 7.5, 900, &[35], Some("1999-05-01"))));
        assert!(!query.admits(&movie(2, 6.9, 900, &[35], Some("1999-05-01"))));
        assert!(!query.admits(&movie(3, 7.5, 100, &[35], Some("1999-05-01"))));
        assert!(!query.admits(&movie(4, 7.5, 900, &[18], Some("1999-05-01"))));
        assert!(!query.admits(&movie(5, 7.5, 900, &[35], Some("2015-05-01"))));
        assert!(!query.admits(&movie(6, 7.5, 900, &[35], None)));
        assert!(!query.admits(&movie(7, 9.5, 900, &[35], Some("1999-05-01"))));
    }

    #[test]
    fn test_family_rejects_excluded_genres() {
        let query = DiscoverQuery::build(&FilterCriteria::default(), &region(), &Overrides::NONE)
            .family_friendly(true);
        assert!(!query.admits(&movie(1, 8.0, 900, &[27], Some("2001-01-01"))));
        assert!(query.admits(&movie(2, 8.0, 900, &[16], Some("2001-01-01"))));
    }

    #[test]
    fn test_relaxation_never_rejects_previously_admitted() {
        let mut samples = Vec::new();
        let mut id = 0;
        for rating in [3.0, 4.5, 6.2, 7.1, 8.8, 9.4] {
            for votes in [5, 50, 150, 600] {
                for genres in [vec![35], vec![18], vec![]] {
                    for date in [Some("1995-01-01"), Some("2020-01-01"), None] {
                        id += 1;
                        samples.push(movie(id, rating, votes, &genres, date));
                    }
                }
            }
        }

        for criteria in [criteria(), FilterCriteria::default()] {
            for family in [false, true] {
                for step in 0..RELAXATION_STEPS.len() - 1 {
                    let current =
                        DiscoverQuery::build(&criteria, &region(), &cumulative_overrides(step))
                            .family_friendly(family);
                    let next =
                        DiscoverQuery::build(&criteria, &region(), &cumulative_overrides(step + 1))
                            .family_friendly(family);
                    for sample in &samples {
                        if current.admits(sample) {
                            assert!(
                                next.admits(sample),
                                "step {} admitted {:?} but step {} did not",
                                step,
                                sample,
                                step + 1
                            );
                        }
                    }
                }
            }
        }
    }
}
