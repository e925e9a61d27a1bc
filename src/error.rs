use axum::http::StatusCode;
use thiserror::Error;

/// Failures produced by the resilience layer and the upstream client.
///
/// Cache misses are not represented here; they are internal to the
/// service and resolved by calling upstream.
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Rate limit exceeded for [{operation}]. Daily limit: {limit}")]
    RateLimitExceeded { operation: &'static str, limit: u32 },
    #[error("Circuit breaker [{operation}] is open")]
    CircuitOpen { operation: &'static str },
    #[error("Operation [{operation}] timed out after {timeout_ms}ms")]
    CircuitTimeout {
        operation: &'static str,
        timeout_ms: u64,
    },
    #[error("Upstream call failed: {0}")]
    UpstreamCall(String),
    #[error("Failed to parse upstream response: {0}")]
    ResponseParse(String),
    #[error("City not found: {0}")]
    CityNotFound(String),
}

impl WeatherError {
    /// HTTP status used by the route layer when a single-point
    /// operation surfaces this error to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WeatherError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            WeatherError::CircuitOpen { .. } | WeatherError::CircuitTimeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            WeatherError::CityNotFound(_) => StatusCode::NOT_FOUND,
            WeatherError::UpstreamCall(_) => StatusCode::BAD_GATEWAY,
            WeatherError::ResponseParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::UpstreamCall(err.to_string())
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::ResponseParse(err.to_string())
    }
}
