pub mod availability;
pub mod catalog;
pub mod discovery;
pub mod history;

pub use availability::AvailabilityResolver;
pub use catalog::{CatalogApi, RatingsApi};
pub use discovery::{DiscoveryEngine, DiscoveryMode, Recommendation};
pub use history::HistoryLedger;
