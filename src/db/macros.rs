/// Stale-while-revalidate read through the in-process cache.
///
/// A fresh entry is returned as-is. On a miss or a stale entry the provided
/// future is awaited, its value stored under `$key` with `$ttl`, and returned.
/// If that refetch fails while a stale value exists, the stale value is
/// returned and the failure is logged.
///
/// # Arguments
/// * `$cache`: the [`Cache`](crate::db::Cache) to read and write.
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) for the value.
/// * `$ttl`: `Duration` the fetched value stays fresh.
/// * `$fetch`: a future resolving to `AppResult<T>`.
///
/// # Example
/// ```rust,ignore
/// let details: MovieDetails = cached!(
///     self.cache,
///     CacheKey::MovieDetails(id),
///     DETAILS_TTL,
///     self.fetch_details(id)
/// )?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $fetch:expr) => {{
        let key = $key;
        match $cache.get(&key)? {
            Some(hit) if !hit.is_stale => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(hit.value)
            }
            previous => {
                tracing::debug!(key = %key, stale = previous.is_some(), "Cache refresh");
                match $fetch.await {
                    Ok(value) => {
                        $cache.set(&key, &value, $ttl);
                        Ok(value)
                    }
                    Err(e) => match previous {
                        Some(hit) => {
                            tracing::warn!(
                                key = %key,
                                error = %e,
                                "Refresh failed, serving stale entry"
                            );
                            Ok(hit.value)
                        }
                        None => Err(e),
                    },
                }
            }
        }
    }};
}
