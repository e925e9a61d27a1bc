use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::service::{AirPollutionReport, MultiCityWeatherResponse, WeatherService};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub weather_service: WeatherService,
}

// Request/Response types
#[derive(Debug, Deserialize)]
pub struct AirPollutionQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct MultiCityRequest {
    pub cities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

impl ApiError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            error: "API_ERROR".to_string(),
            message: message.into(),
        }
    }
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_air_pollution(
    State(state): State<AppState>,
    Query(params): Query<AirPollutionQuery>,
) -> Result<Json<AirPollutionReport>, (StatusCode, Json<ApiError>)> {
    match state
        .weather_service
        .current_air_pollution(params.latitude, params.longitude)
        .await
    {
        Ok(response) => {
            tracing::info!("Successfully processed air pollution request");
            Ok(Json(response))
        }
        Err(err) => {
            tracing::error!("Error while processing air pollution request: {}", err);
            Err((err.status_code(), Json(ApiError::new(err.to_string()))))
        }
    }
}

pub async fn multi_city_weather(
    State(state): State<AppState>,
    Json(request): Json<MultiCityRequest>,
) -> Result<Json<MultiCityWeatherResponse>, (StatusCode, Json<ApiError>)> {
    if request.cities.iter().any(|city| city.trim().is_empty()) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("City names cannot be null or empty")),
        ));
    }

    let response = state
        .weather_service
        .multi_city_weather(&request.cities)
        .await;
    tracing::info!(
        "Successfully processed multi-city weather request for {} cities",
        response.total_cities
    );
    Ok(Json(response))
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/getCurrentAirPollution", get(get_air_pollution))
        .route("/api/v1/weather/multi-city", post(multi_city_weather))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::WeatherError;
    use crate::upstream::types::{AirPollutionResponse, CurrentWeatherResponse, GeocodeEntry};
    use crate::upstream::UpstreamApi;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Fails every call as if the upstream were unreachable.
    struct UnreachableUpstream;

    #[async_trait]
    impl UpstreamApi for UnreachableUpstream {
        async fn geocode(&self, _city: &str) -> Result<Vec<GeocodeEntry>, WeatherError> {
            Err(WeatherError::UpstreamCall("connection refused".into()))
        }

        async fn current_weather(
            &self,
            _latitude: f64,
            _longitude: f64,
        ) -> Result<CurrentWeatherResponse, WeatherError> {
            Err(WeatherError::UpstreamCall("connection refused".into()))
        }

        async fn air_pollution(
            &self,
            _latitude: f64,
            _longitude: f64,
        ) -> Result<AirPollutionResponse, WeatherError> {
            Err(WeatherError::UpstreamCall("connection refused".into()))
        }
    }

    fn state() -> AppState {
        AppState {
            weather_service: WeatherService::new(
                &Config::for_tests(),
                Arc::new(UnreachableUpstream),
            ),
        }
    }

    #[tokio::test]
    async fn health_reports_healthy_with_the_crate_version() {
        let response = health().await;
        assert_eq!(response.0.status, "healthy");
        assert_eq!(response.0.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn blank_city_names_are_rejected_before_any_lookup() {
        let request = MultiCityRequest {
            cities: vec!["Toronto".to_string(), "   ".to_string()],
        };

        let result = multi_city_weather(State(state()), Json(request)).await;

        let (status, body) = result.expect_err("blank names should be rejected");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.message, "City names cannot be null or empty");
    }

    #[tokio::test]
    async fn upstream_failure_surfaces_as_bad_gateway_envelope() {
        let query = AirPollutionQuery {
            latitude: 1.0,
            longitude: 2.0,
        };

        let result = get_air_pollution(State(state()), Query(query)).await;

        let (status, body) = result.expect_err("should surface the upstream failure");
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.0.error, "API_ERROR");
    }
}
