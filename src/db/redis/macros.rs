/// Read-through caching over the Redis response cache.
///
/// Returns the cached value for `$key` when present. Otherwise awaits `$block`,
/// hands the result to the background writer with `$ttl` seconds to live, and
/// returns it.
///
/// # Arguments
/// * `$cache`: A [`Cache`](crate::db::Cache) (`get_from_cache` + `set_in_background`).
/// * `$key`: The [`CacheKey`](crate::db::CacheKey) for the response.
/// * `$ttl`: Time-to-live in seconds.
/// * `$block`: Future producing `AppResult<T>` on a miss.
///
/// # Example
/// ```rust,ignore
/// let detail = cached!(cache, CacheKey::Details(ShowType::Series, id), DETAILS_TTL, async move {
///     client.fetch_details_uncached(&id).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            tracing::debug!(key = %key, "Cache hit");
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
