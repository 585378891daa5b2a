//! Per-user analytics cache keys and invalidation.

use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, warn};

use crate::schemas::CachedData;

pub type AnalyticsCache = Cache<String, CachedData>;

/// Cache with the given time-to-live that supports prefix invalidation.
pub fn build_cache(ttl: Duration) -> AnalyticsCache {
    Cache::builder()
        .max_capacity(1000)
        .time_to_live(ttl)
        .support_invalidation_closures()
        .build()
}

fn user_prefix(user_id: i32) -> String {
    format!("user:{}:", user_id)
}

/// Key for one cached analytics result of a user.
pub fn cache_key(user_id: i32, kind: &str, params: &str) -> String {
    format!("{}{}:{}", user_prefix(user_id), kind, params)
}

/// Drops every cached analytics result of `user_id`.
pub fn invalidate_user(cache: &AnalyticsCache, user_id: i32) {
    let prefix = user_prefix(user_id);
    debug!("Invalidating analytics cache for user {}", user_id);
    if let Err(e) = cache.invalidate_entries_if(move |key, _| key.starts_with(&prefix)) {
        warn!("Failed to invalidate analytics cache for user {}: {}", user_id, e);
    }
}
