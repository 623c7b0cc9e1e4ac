use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    cached,
    db::{cache::LIST_TTL, Cache, CacheKey},
    error::{AppError, AppResult},
    models::{FilterCriteria, InteractionKind, MovieDetails, MovieId, MoviePage, MovieSummary, Region},
    services::{availability::AvailabilityResolver, catalog::CatalogApi, history::HistoryLedger},
};

pub mod query;
pub mod random;

use query::{cumulative_overrides, DiscoverQuery, RELAXATION_STEPS};
pub use random::{RandomSource, SeededRandom};

const RANDOM_PAGES: RangeInclusive<u32> = 1..=50;
const PROVIDER_PAGES: RangeInclusive<u32> = 1..=20;

const DEFAULT_EXCLUSIONS: [InteractionKind; 2] =
    [InteractionKind::Shown, InteractionKind::NotInterested];
const FAMILY_EXCLUSIONS: [InteractionKind; 3] = [
    InteractionKind::Shown,
    InteractionKind::NotInterested,
    InteractionKind::DinnerDisliked,
];

/// How a recommendation is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Uniform pick among unseen candidates
    #[default]
    Random,
    /// First unseen candidate streaming on the provider, in upstream order
    Provider { provider_id: u32 },
    /// Provider pick restricted to family-friendly titles
    Family { provider_id: u32 },
}

impl DiscoveryMode {
    pub fn required_provider(&self) -> Option<u32> {
        match self {
            DiscoveryMode::Random => None,
            DiscoveryMode::Provider { provider_id } | DiscoveryMode::Family { provider_id } => {
                Some(*provider_id)
            }
        }
    }

    pub fn is_family(&self) -> bool {
        matches!(self, DiscoveryMode::Family { .. })
    }

    fn page_range(&self) -> RangeInclusive<u32> {
        match self {
            DiscoveryMode::Random => RANDOM_PAGES,
            _ => PROVIDER_PAGES,
        }
    }

    fn exclusions(&self) -> &'static [InteractionKind] {
        if self.is_family() {
            &FAMILY_EXCLUSIONS
        } else {
            &DEFAULT_EXCLUSIONS
        }
    }
}

/// A chosen movie and how far the filters had to be relaxed to find it
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub movie: MovieDetails,
    pub relaxation_step: usize,
    pub relaxation: &'static str,
    /// Human-readable notes for the UI, e.g. that the search was broadened
    pub notices: Vec<String>,
}

/// Picks one previously-unseen movie per call
///
/// Each call walks the relaxation table in order and stops at the first step
/// that yields a candidate. The pick is recorded in the shown set only after
/// it is final, and only if no newer call has started in the meantime.
pub struct DiscoveryEngine {
    catalog: Arc<dyn CatalogApi>,
    cache: Cache,
    history: HistoryLedger,
    availability: AvailabilityResolver,
    random: Arc<dyn RandomSource>,
    default_region: Region,
    generation: AtomicU64,
}

impl DiscoveryEngine {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        cache: Cache,
        history: HistoryLedger,
        availability: AvailabilityResolver,
        random: Arc<dyn RandomSource>,
        default_region: Region,
    ) -> Self {
        Self {
            catalog,
            cache,
            history,
            availability,
            random,
            default_region,
            generation: AtomicU64::new(0),
        }
    }

    /// Finds the next movie to show
    ///
    /// Fails with `NoCandidatesFound` once every relaxation step is exhausted,
    /// and with `Superseded` when a newer call started before this one committed.
    pub async fn next_recommendation(
        &self,
        criteria: &FilterCriteria,
        mode: DiscoveryMode,
    ) -> AppResult<Recommendation> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let region = match &criteria.region {
            Some(code) => Region::parse(code)?,
            None => self.default_region.clone(),
        };

        let mut working = criteria.clone();
        if let Some(provider_id) = mode.required_provider() {
            working.provider_id = Some(provider_id);
        }

        let excluded = self.history.exclusion_set(mode.exclusions()).await?;

        tracing::info!(
            ticket,
            mode = ?mode,
            region = %region,
            excluded = excluded.len(),
            "Discovery started"
        );

        for (step, relaxation) in RELAXATION_STEPS.iter().enumerate() {
            self.ensure_current(ticket)?;

            let query = DiscoverQuery::build(&working, &region, &cumulative_overrides(step))
                .family_friendly(mode.is_family());
            let candidates = self.candidates(&query, mode, &excluded).await?;

            tracing::debug!(
                step,
                relaxation = relaxation.label,
                candidates = candidates.len(),
                "Relaxation step evaluated"
            );

            if candidates.is_empty() {
                continue;
            }

            let pick = match mode.required_provider() {
                None => {
                    let index = self.random.index_below(candidates.len());
                    candidates.get(index).cloned()
                }
                Some(provider_id) => {
                    let found = self
                        .first_on_provider(&candidates, &region, provider_id, ticket)
                        .await?;
                    if found.is_none() {
                        tracing::info!(
                            step,
                            provider_id,
                            scanned = candidates.len(),
                            "No candidate on provider, relaxing"
                        );
                    }
                    found
                }
            };

            let Some(pick) = pick else {
                continue;
            };

            let movie = self.catalog.movie_details(pick.id).await?;

            self.ensure_current(ticket)?;
            self.history.mark_shown(movie.id).await?;

            let notices = if step == 0 {
                Vec::new()
            } else {
                vec![self.broadened_notice(mode, &region, relaxation.label).await]
            };

            tracing::info!(
                movie_id = movie.id,
                title = %movie.title,
                step,
                relaxation = relaxation.label,
                "Recommendation selected"
            );

            return Ok(Recommendation {
                movie,
                relaxation_step: step,
                relaxation: relaxation.label,
                notices,
            });
        }

        let provider = match mode.required_provider() {
            Some(provider_id) => Some(self.availability.provider_name(&region, provider_id).await),
            None => None,
        };

        tracing::warn!(mode = ?mode, region = %region, "Relaxation exhausted without a candidate");
        Err(AppError::NoCandidatesFound { provider })
    }

    /// Unseen candidates on one randomly sampled page
    async fn candidates(
        &self,
        query: &DiscoverQuery,
        mode: DiscoveryMode,
        excluded: &HashSet<MovieId>,
    ) -> AppResult<Vec<MovieSummary>> {
        let range = mode.page_range();
        let page_number = self.random.page_in(range.clone());
        let mut page = self.discover_page(query, page_number).await?;

        // Sampled past the end of a small result set; retry once inside it
        if page.results.is_empty() && page.total_pages > 0 && page_number > page.total_pages {
            let last = page.total_pages.min(*range.end());
            let retry = self.random.page_in(1..=last);
            tracing::debug!(
                sampled = page_number,
                total_pages = page.total_pages,
                retry,
                "Page out of range, resampling"
            );
            page = self.discover_page(query, retry).await?;
        }

        Ok(page
            .results
            .into_iter()
            .filter(|movie| !excluded.contains(&movie.id) && query.admits(movie))
            .collect())
    }

    async fn discover_page(&self, query: &DiscoverQuery, page: u32) -> AppResult<MoviePage> {
        cached!(
            self.cache,
            CacheKey::Discover {
                fingerprint: query.fingerprint(),
                page,
            },
            LIST_TTL,
            self.catalog.discover(query, page)
        )
    }

    /// Linear scan in upstream order; the first candidate streaming on the provider wins
    async fn first_on_provider(
        &self,
        candidates: &[MovieSummary],
        region: &Region,
        provider_id: u32,
        ticket: u64,
    ) -> AppResult<Option<MovieSummary>> {
        for candidate in candidates {
            self.ensure_current(ticket)?;
            if self
                .availability
                .offers_provider(candidate.id, region, provider_id)
                .await?
            {
                return Ok(Some(candidate.clone()));
            }
        }
        Ok(None)
    }

    async fn broadened_notice(&self, mode: DiscoveryMode, region: &Region, label: &str) -> String {
        match mode.required_provider() {
            Some(provider_id) => {
                let name = self.availability.provider_name(region, provider_id).await;
                format!(
                    "Nothing new on {} matched your exact filters, search broadened ({})",
                    name, label
                )
            }
            None => format!(
                "Nothing new matched your exact filters, search broadened ({})",
                label
            ),
        }
    }

    fn ensure_current(&self, ticket: u64) -> AppResult<()> {
        let current = self.generation.load(Ordering::SeqCst);
        if current != ticket {
            tracing::debug!(ticket, current, "Discovery superseded");
            return Err(AppError::Superseded);
        }
        Ok(())
    }
}
