use crate::config::Config;
use crate::error::WeatherError;
use crate::resilience::circuit::CircuitBreakerSettings;
use crate::resilience::OperationGuard;
use crate::upstream::types::{
    AirPollutionData, AirPollutionResponse, CurrentWeatherResponse, GeocodeEntry,
};
use crate::upstream::UpstreamApi;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Weather for one resolved city, in the shape returned to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    pub city: String,
    pub temperature: f64,
    pub description: String,
    pub humidity: i64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub coordinates: Coordinates,
}

impl WeatherData {
    fn from_current(city: &str, weather: &CurrentWeatherResponse, coordinates: Coordinates) -> Self {
        let description = weather
            .weather
            .as_ref()
            .and_then(|w| w.first())
            .map(|w| w.description.clone())
            .unwrap_or_else(|| "No description available".to_string());

        Self {
            city: normalize_city_name(city),
            temperature: weather.main.as_ref().map(|m| m.temp).unwrap_or(0.0),
            description,
            humidity: weather.main.as_ref().map(|m| m.humidity).unwrap_or(0),
            pressure: weather.main.as_ref().map(|m| m.pressure).unwrap_or(0.0),
            wind_speed: weather.wind.as_ref().map(|w| w.speed).unwrap_or(0.0),
            coordinates,
        }
    }
}

/// Aggregate result of one multi-city request. Individual city failures
/// live inside the value; they never fail the request as a whole.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiCityWeatherResponse {
    pub weather_data: Vec<WeatherData>,
    pub total_cities: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub failed_cities: Vec<String>,
}

impl MultiCityWeatherResponse {
    fn empty() -> Self {
        Self {
            weather_data: Vec::new(),
            total_cities: 0,
            successful_requests: 0,
            failed_requests: 0,
            failed_cities: Vec::new(),
        }
    }
}

/// Air pollution payload in the shape returned to callers. The upstream
/// `lat`/`lon` pair becomes the `latitude`/`longitude` naming used
/// everywhere else on the outward surface; absent coordinates and an
/// empty measurement list are omitted rather than serialized as null.
#[derive(Debug, Clone, Serialize)]
pub struct AirPollutionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coord: Option<Coordinates>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<AirPollutionData>,
}

impl From<AirPollutionResponse> for AirPollutionReport {
    fn from(response: AirPollutionResponse) -> Self {
        Self {
            coord: response.coord.map(|c| Coordinates {
                latitude: c.lat,
                longitude: c.lon,
            }),
            list: response.list,
        }
    }
}

/// Outcome of one per-city pipeline.
enum CityOutcome {
    Success(WeatherData),
    Failure { city: String, reason: String },
}

/// Orchestration layer in front of the upstream provider. Each logical
/// upstream operation gets its own cache, rate limiter, and circuit
/// breaker, shared across all concurrent requests.
#[derive(Clone)]
pub struct WeatherService {
    upstream: Arc<dyn UpstreamApi>,
    geocoding: Arc<OperationGuard<Vec<GeocodeEntry>>>,
    weather: Arc<OperationGuard<CurrentWeatherResponse>>,
    air_pollution: Arc<OperationGuard<AirPollutionResponse>>,
}

impl WeatherService {
    pub fn new(config: &Config, upstream: Arc<dyn UpstreamApi>) -> Self {
        let breaker_settings = CircuitBreakerSettings {
            failure_threshold: config.breaker_failure_threshold,
            call_timeout: Duration::from_millis(config.breaker_call_timeout_ms),
            retry_timeout: Duration::from_millis(config.breaker_retry_timeout_ms),
            half_open_success_threshold: config.breaker_half_open_success_threshold,
        };
        let sweep_interval = Duration::from_millis(config.cache_sweep_interval_ms);

        Self {
            upstream,
            geocoding: Arc::new(OperationGuard::new(
                "geocoding-api",
                Duration::from_millis(config.geocoding_cache_ttl_ms),
                sweep_interval,
                breaker_settings,
                config.rate_limit_daily,
            )),
            weather: Arc::new(OperationGuard::new(
                "weather-api",
                Duration::from_millis(config.weather_cache_ttl_ms),
                sweep_interval,
                breaker_settings,
                config.rate_limit_daily,
            )),
            air_pollution: Arc::new(OperationGuard::new(
                "air-pollution-api",
                Duration::from_millis(config.air_pollution_cache_ttl_ms),
                sweep_interval,
                breaker_settings,
                config.rate_limit_daily,
            )),
        }
    }

    /// Single-point air pollution lookup.
    pub async fn current_air_pollution(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<AirPollutionReport, WeatherError> {
        tracing::debug!(
            "Fetching air pollution data for coordinates: lat={}, lon={}",
            latitude,
            longitude
        );
        let key = format!("air_pollution:{:.6}:{:.6}", latitude, longitude);
        let upstream = self.upstream.clone();
        let response = self
            .air_pollution
            .run(&key, || async move {
                upstream.air_pollution(latitude, longitude).await
            })
            .await?;
        Ok(response.into())
    }

    /// Resolves weather for every city concurrently and merges the
    /// partial successes and failures into one bounded response.
    ///
    /// `weather_data` is in completion order, not input order.
    pub async fn multi_city_weather(&self, cities: &[String]) -> MultiCityWeatherResponse {
        if cities.is_empty() {
            return MultiCityWeatherResponse::empty();
        }

        tracing::info!("Fetching weather data for {} cities: {:?}", cities.len(), cities);

        let mut pipelines = JoinSet::new();
        let mut spawned_cities = HashMap::new();
        for city in cities {
            let service = self.clone();
            let task_city = city.clone();
            let handle = pipelines.spawn(async move {
                match service.weather_for_city(&task_city).await {
                    Ok(data) => CityOutcome::Success(data),
                    Err(err) => {
                        tracing::warn!(
                            "Failed to retrieve weather for city: {} - {}",
                            task_city,
                            err
                        );
                        CityOutcome::Failure {
                            city: task_city,
                            reason: err.to_string(),
                        }
                    }
                }
            });
            spawned_cities.insert(handle.id(), city.clone());
        }

        let total_cities = cities.len();
        let mut weather_data = Vec::new();
        let mut failed_cities = Vec::new();
        while let Some(joined) = pipelines.join_next_with_id().await {
            match joined {
                Ok((_, CityOutcome::Success(data))) => weather_data.push(data),
                Ok((_, CityOutcome::Failure { city, reason })) => {
                    tracing::debug!("Recording failure for city {}: {}", city, reason);
                    failed_cities.push(city);
                }
                // A panicked task still counts against its city so the
                // response totals stay consistent.
                Err(err) => {
                    let city = spawned_cities
                        .get(&err.id())
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string());
                    tracing::error!("City pipeline task for {} failed: {}", city, err);
                    failed_cities.push(city);
                }
            }
        }

        MultiCityWeatherResponse {
            successful_requests: weather_data.len(),
            failed_requests: failed_cities.len(),
            total_cities,
            weather_data,
            failed_cities,
        }
    }

    /// One per-city pipeline: geocode, then fetch current weather for
    /// the resolved coordinates. Both legs go through their guards.
    async fn weather_for_city(&self, city: &str) -> Result<WeatherData, WeatherError> {
        let entries = self.city_coordinates(city).await?;
        let Some(entry) = entries.first() else {
            return Err(WeatherError::CityNotFound(city.to_string()));
        };

        let coordinates = Coordinates {
            latitude: entry.lat,
            longitude: entry.lon,
        };
        let weather = self.current_weather(coordinates).await?;
        Ok(WeatherData::from_current(city, &weather, coordinates))
    }

    async fn city_coordinates(&self, city: &str) -> Result<Vec<GeocodeEntry>, WeatherError> {
        let key = format!("geocoding:{}", city.trim().to_lowercase());
        let upstream = self.upstream.clone();
        let city = city.to_string();
        self.geocoding
            .run(&key, || async move { upstream.geocode(&city).await })
            .await
    }

    async fn current_weather(
        &self,
        coordinates: Coordinates,
    ) -> Result<CurrentWeatherResponse, WeatherError> {
        let key = format!(
            "weather:{:.6}:{:.6}",
            coordinates.latitude, coordinates.longitude
        );
        let upstream = self.upstream.clone();
        self.weather
            .run(&key, || async move {
                upstream
                    .current_weather(coordinates.latitude, coordinates.longitude)
                    .await
            })
            .await
    }
}

/// Canonical display form: first letter uppercase, remainder lowercase.
fn normalize_city_name(city: &str) -> String {
    let trimmed = city.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => trimmed.to_string(),
    }
}
