pub mod openweather;
pub mod types;

use crate::error::WeatherError;
use async_trait::async_trait;
use types::{AirPollutionResponse, CurrentWeatherResponse, GeocodeEntry};

/// Raw network calls against the upstream provider, one method per
/// logical operation. The service drives these through its resilience
/// guards; implementations do no caching, limiting, or retrying of
/// their own.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    async fn geocode(&self, city: &str) -> Result<Vec<GeocodeEntry>, WeatherError>;

    async fn current_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentWeatherResponse, WeatherError>;

    async fn air_pollution(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<AirPollutionResponse, WeatherError>;
}
