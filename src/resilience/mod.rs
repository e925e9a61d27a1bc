pub mod cache;
pub mod circuit;
pub mod rate_limit;

use crate::error::WeatherError;
use cache::TtlCache;
use circuit::{CircuitBreaker, CircuitBreakerSettings};
use rate_limit::DailyRateLimiter;
use std::future::Future;
use std::time::Duration;

/// Composition point for one logical upstream operation: cache lookup,
/// rate-limiter admission, then the circuit-breaker-gated network call,
/// populating the cache on success. No retries — a failure at any stage
/// is returned to the caller as that stage's error.
pub struct OperationGuard<T> {
    cache: TtlCache<T>,
    limiter: DailyRateLimiter,
    breaker: CircuitBreaker,
}

impl<T: Clone + Send + Sync + 'static> OperationGuard<T> {
    pub fn new(
        name: &'static str,
        cache_ttl: Duration,
        sweep_interval: Duration,
        breaker_settings: CircuitBreakerSettings,
        daily_limit: u32,
    ) -> Self {
        Self {
            cache: TtlCache::new(name, cache_ttl, sweep_interval),
            limiter: DailyRateLimiter::new(name, daily_limit),
            breaker: CircuitBreaker::new(name, breaker_settings),
        }
    }

    pub async fn run<F, Fut>(&self, cache_key: &str, call: F) -> Result<T, WeatherError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, WeatherError>>,
    {
        if let Some(value) = self.cache.get(cache_key) {
            return Ok(value);
        }

        let value = self
            .limiter
            .execute_with_limit(self.breaker.execute(call()))
            .await?;

        self.cache.put(cache_key, value.clone());
        Ok(value)
    }
}
