use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod resilience;
mod routes;
mod service;
mod upstream;

use config::Config;
use routes::{create_router, AppState};
use service::WeatherService;
use upstream::openweather::OpenWeatherClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_gateway_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let addr = format!("{}:{}", config.server_host, config.server_port);

    // Initialize upstream client and the guarded service around it
    let upstream = Arc::new(OpenWeatherClient::new(config.clone()));
    let weather_service = WeatherService::new(&config, upstream);

    // Create application state
    let state = AppState { weather_service };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
