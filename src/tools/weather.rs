//! OpenWeatherMap tools
//!
//! `weather` looks up current conditions by city name and
//! `weather_coordinates` by latitude/longitude. Both share one
//! [`OpenWeatherService`] and return the same normalized document:
//! temperatures in Celsius and Fahrenheit, wind in m/s and mph.

use super::error::ToolError;
use super::http::ApiClient;
use super::spec::{ParamSpec, ParamType, ToolSpec};
use super::trait_def::Tool;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

const ENDPOINT: &str = "weather";
const MS_TO_MPH: f64 = 2.237;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    round1(kelvin - 273.15)
}

pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    round1((kelvin - 273.15) * 9.0 / 5.0 + 32.0)
}

fn temperature_pair(kelvin: Option<f64>) -> Value {
    match kelvin {
        Some(k) => json!({
            "celsius": kelvin_to_celsius(k),
            "fahrenheit": kelvin_to_fahrenheit(k),
        }),
        None => Value::Null,
    }
}

/// Normalizes a raw OpenWeatherMap `weather` response
///
/// Fails when the document has no `main.temp`, which every successful
/// response carries.
pub fn normalize_weather(raw: &Value) -> Result<Value, ToolError> {
    let main = &raw["main"];
    let temp = main["temp"].as_f64().ok_or_else(|| {
        ToolError::invalid_response("OpenWeatherMap response has no temperature")
    })?;

    let condition = &raw["weather"][0];
    let wind = &raw["wind"];
    let sys = &raw["sys"];
    let wind_speed = wind["speed"].as_f64();

    Ok(json!({
        "location": {
            "city": raw["name"],
            "country": sys["country"],
            "coordinates": {
                "latitude": raw["coord"]["lat"],
                "longitude": raw["coord"]["lon"],
            },
        },
        "weather": {
            "condition": condition["main"],
            "description": condition["description"],
            "icon": condition["icon"],
        },
        "temperature": {
            "current": temperature_pair(Some(temp)),
            "feels_like": temperature_pair(main["feels_like"].as_f64()),
            "min": temperature_pair(main["temp_min"].as_f64()),
            "max": temperature_pair(main["temp_max"].as_f64()),
        },
        "humidity": main["humidity"],
        "pressure": main["pressure"],
        "visibility": raw["visibility"],
        "wind": {
            "speed_ms": wind_speed,
            "speed_mph": wind_speed.map(|s| round1(s * MS_TO_MPH)),
            "direction_degrees": wind["deg"],
            "gust_ms": wind["gust"],
        },
        "clouds": {
            "coverage_percent": raw["clouds"]["all"],
        },
        "sun": {
            "sunrise_utc": sys["sunrise"],
            "sunset_utc": sys["sunset"],
        },
        "timezone_offset": raw["timezone"],
    }))
}

/// Credentials and HTTP client shared by both weather tools
#[derive(Debug)]
pub struct OpenWeatherService {
    api: ApiClient,
    api_key: Option<String>,
}

impl OpenWeatherService {
    pub fn new(api: ApiClient, api_key: Option<String>) -> Self {
        Self { api, api_key }
    }

    async fn current(&self, mut query: BTreeMap<String, String>) -> Result<Value, ToolError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ToolError::authentication(
                "OpenWeatherMap API key not configured. Set OPENWEATHER_API_KEY.",
            )
        })?;

        query.insert("units".to_string(), "standard".to_string());
        let raw = self
            .api
            .get_json(ENDPOINT, &query, Some(("appid", api_key)))
            .await?;
        normalize_weather(&raw)
    }
}

pub struct WeatherTool {
    service: Arc<OpenWeatherService>,
    spec: ToolSpec,
}

impl WeatherTool {
    pub fn new(service: Arc<OpenWeatherService>) -> Self {
        let spec = ToolSpec::new(
            "weather",
            "Get the current weather for a city (temperature, conditions, humidity, wind)",
        )
        .with_param(ParamSpec::required(
            "city",
            ParamType::String,
            "City name, optionally with a country code, e.g. \"London,UK\"",
        ));
        Self { service, spec }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, params: &Map<String, Value>) -> Result<Value, ToolError> {
        let checked = self.spec.check(params)?;
        let city = checked.str("city").unwrap_or_default().trim().to_string();
        info!(city = %city, "Getting weather for city");

        let mut query = BTreeMap::new();
        query.insert("q".to_string(), city);
        self.service.current(query).await
    }
}

pub struct WeatherCoordinatesTool {
    service: Arc<OpenWeatherService>,
    spec: ToolSpec,
}

impl WeatherCoordinatesTool {
    pub fn new(service: Arc<OpenWeatherService>) -> Self {
        let spec = ToolSpec::new(
            "weather_coordinates",
            "Get the current weather at geographic coordinates",
        )
        .with_param(ParamSpec::required(
            "lat",
            ParamType::Number,
            "Latitude in degrees (-90 to 90)",
        ))
        .with_param(ParamSpec::required(
            "lon",
            ParamType::Number,
            "Longitude in degrees (-180 to 180)",
        ));
        Self { service, spec }
    }
}

#[async_trait]
impl Tool for WeatherCoordinatesTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, params: &Map<String, Value>) -> Result<Value, ToolError> {
        let checked = self.spec.check(params)?;
        let lat = checked.f64("lat").unwrap_or_default();
        let lon = checked.f64("lon").unwrap_or_default();

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ToolError::invalid_parameters(format!(
                "coordinates out of range: lat={}, lon={}",
                lat, lon
            )));
        }
        info!(lat, lon, "Getting weather for coordinates");

        let mut query = BTreeMap::new();
        query.insert("lat".to_string(), lat.to_string());
        query.insert("lon".to_string(), lon.to_string());
        self.service.current(query).await
    }
}
