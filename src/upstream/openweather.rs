use super::types::*;
use super::UpstreamApi;
use crate::config::Config;
use crate::error::WeatherError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub struct OpenWeatherClient {
    client: Client,
    config: Config,
}

impl OpenWeatherClient {
    pub fn new(config: Config) -> Self {
        let client = Client::builder()
            .user_agent("WeatherGateway/1.0")
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.config.openweather_base_url, path);

        let response = self.client.get(&url).query(params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(WeatherError::UpstreamCall(format!(
                "HTTP {}: {}",
                status,
                truncate(&body)
            )));
        }

        serde_json::from_str(&body).map_err(WeatherError::from)
    }
}

#[async_trait]
impl UpstreamApi for OpenWeatherClient {
    async fn geocode(&self, city: &str) -> Result<Vec<GeocodeEntry>, WeatherError> {
        self.get_json(
            &self.config.openweather_geocoding_path,
            &[
                ("q", city),
                ("limit", "1"),
                ("appid", &self.config.openweather_api_key),
            ],
        )
        .await
    }

    async fn current_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentWeatherResponse, WeatherError> {
        self.get_json(
            &self.config.openweather_weather_path,
            &[
                ("lat", &latitude.to_string()),
                ("lon", &longitude.to_string()),
                ("units", "metric"),
                ("appid", &self.config.openweather_api_key),
            ],
        )
        .await
    }

    async fn air_pollution(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<AirPollutionResponse, WeatherError> {
        self.get_json(
            &self.config.openweather_air_pollution_path,
            &[
                ("lat", &latitude.to_string()),
                ("lon", &longitude.to_string()),
                ("appid", &self.config.openweather_api_key),
            ],
        )
        .await
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
