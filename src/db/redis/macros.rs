/// Read-through caching for an optional Redis cache.
///
/// With `Some(cache)`, a hit is returned directly. On a miss the block is
/// awaited, a successful value is queued for writing and then returned. With
/// `None` the block is simply awaited. Cache failures never fail the call.
///
/// # Arguments
/// * `$cache`: an `Option<&Cache>`.
/// * `$key`: the `CacheKey` to read and write.
/// * `$ttl`: time-to-live for a stored value, in seconds.
/// * `$block`: a future producing `Result<T, E>` where `T: Serialize + DeserializeOwned`.
///
/// # Example
/// ```rust,ignore
/// let movies = cached!(self.cache.as_ref(), CacheKey::MovieSearch(query.to_string()), 3600, async move {
///     fetch_search_results(query).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache {
            Some(cache) => {
                let key = $key;
                if let Some(hit) = cache.lookup(&key).await {
                    tracing::debug!(key = %key, "Cache hit");
                    Ok(hit)
                } else {
                    match $block.await {
                        Ok(value) => {
                            cache.set_in_background(&key, &value, $ttl);
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    }
                }
            }
            None => $block.await,
        }
    }};
}
