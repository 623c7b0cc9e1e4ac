pub mod cache;
pub mod sqlite;

mod macros;

pub use cache::Cache;
pub use cache::CacheKey;
pub use cache::Cached;
pub use sqlite::create_pool;
