use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub openweather_geocoding_path: String,
    pub openweather_weather_path: String,
    pub openweather_air_pollution_path: String,
    pub geocoding_cache_ttl_ms: u64,
    pub weather_cache_ttl_ms: u64,
    pub air_pollution_cache_ttl_ms: u64,
    pub cache_sweep_interval_ms: u64,
    pub breaker_failure_threshold: u32,
    pub breaker_call_timeout_ms: u64,
    pub breaker_retry_timeout_ms: u64,
    pub breaker_half_open_success_threshold: u32,
    pub rate_limit_daily: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_or("SERVER_PORT", 8080),
            openweather_api_key: env::var("OPENWEATHER_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENWEATHER_API_KEY not set"))?,
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            openweather_geocoding_path: env::var("OPENWEATHER_GEOCODING_PATH")
                .unwrap_or_else(|_| "/geo/1.0/direct".to_string()),
            openweather_weather_path: env::var("OPENWEATHER_WEATHER_PATH")
                .unwrap_or_else(|_| "/data/2.5/weather".to_string()),
            openweather_air_pollution_path: env::var("OPENWEATHER_AIR_POLLUTION_PATH")
                .unwrap_or_else(|_| "/data/2.5/air_pollution".to_string()),
            // Geocoding results are effectively static, weather goes stale
            // quickly, air pollution sits in between.
            geocoding_cache_ttl_ms: parse_or("GEOCODING_CACHE_TTL_MS", 43_200_000),
            weather_cache_ttl_ms: parse_or("WEATHER_CACHE_TTL_MS", 600_000),
            air_pollution_cache_ttl_ms: parse_or("AIR_POLLUTION_CACHE_TTL_MS", 3_600_000),
            cache_sweep_interval_ms: parse_or("CACHE_SWEEP_INTERVAL_MS", 300_000),
            breaker_failure_threshold: parse_or("BREAKER_FAILURE_THRESHOLD", 5),
            breaker_call_timeout_ms: parse_or("BREAKER_CALL_TIMEOUT_MS", 10_000),
            breaker_retry_timeout_ms: parse_or("BREAKER_RETRY_TIMEOUT_MS", 60_000),
            breaker_half_open_success_threshold: parse_or("BREAKER_HALF_OPEN_SUCCESS_THRESHOLD", 3),
            rate_limit_daily: parse_or("RATE_LIMIT_DAILY", 1000),
        })
    }
}

#[cfg(test)]
impl Config {
    /// Fixed settings for unit tests: generous TTLs and quota so only
    /// tests that tighten them hit the limits.
    pub(crate) fn for_tests() -> Self {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            openweather_api_key: "test-key".to_string(),
            openweather_base_url: "http://localhost".to_string(),
            openweather_geocoding_path: "/geo/1.0/direct".to_string(),
            openweather_weather_path: "/data/2.5/weather".to_string(),
            openweather_air_pollution_path: "/data/2.5/air_pollution".to_string(),
            geocoding_cache_ttl_ms: 60_000,
            weather_cache_ttl_ms: 60_000,
            air_pollution_cache_ttl_ms: 60_000,
            cache_sweep_interval_ms: 300_000,
            breaker_failure_threshold: 5,
            breaker_call_timeout_ms: 10_000,
            breaker_retry_timeout_ms: 60_000,
            breaker_half_open_success_threshold: 3,
            rate_limit_daily: 1000,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
