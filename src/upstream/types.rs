use serde::{Deserialize, Serialize};

/// One match from the geocoding API (`/geo/1.0/direct`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeEntry {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeatherResponse {
    pub name: Option<String>,
    pub main: Option<WeatherMain>,
    pub weather: Option<Vec<WeatherDescription>>,
    pub wind: Option<WeatherWind>,
    pub coord: Option<Coord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherMain {
    pub temp: f64,
    pub humidity: i64,
    pub pressure: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherDescription {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherWind {
    pub speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirPollutionResponse {
    pub coord: Option<Coord>,
    pub list: Vec<AirPollutionData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirPollutionData {
    pub main: AirQualityIndex,
    pub components: PollutionComponents,
    pub dt: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirQualityIndex {
    pub aqi: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollutionComponents {
    pub co: f64,
    pub no: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
}
