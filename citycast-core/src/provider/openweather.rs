use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::FetchError,
    model::{Condition, ForecastEntry, Suggestion, WeatherSnapshot},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const CURRENT_PATH: &str = "/data/2.5/weather";
const FORECAST_PATH: &str = "/data/2.5/forecast";
const GEOCODING_PATH: &str = "/geo/1.0/direct";
const UNITS: &str = "metric";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the provider at another host, e.g. a proxy or a mock server.
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            api_key,
            base_url,
            http: Client::new(),
        }
    }

    async fn fetch_body(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, path);

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|err| {
                let err = err.without_url();
                tracing::warn!(error = %err, "OpenWeather {what} request got no response");
                FetchError::network(err)
            })?;

        let status = res.status();
        // A response arrived, so a body that cannot be read is malformed.
        let body = res.text().await.map_err(|err| {
            let err = err.without_url();
            tracing::warn!(error = %err, "Failed to read OpenWeather {what} response body");
            FetchError::malformed(err.to_string())
        })?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body = %truncate_body(&body),
                "OpenWeather {what} request failed"
            );
            return Err(FetchError::from_status(status.as_u16(), provider_message(&body)));
        }

        Ok(body)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T, FetchError> {
        let body = self.fetch_body(path, query, what).await?;
        serde_json::from_str(&body).map_err(|err| {
            tracing::warn!(error = %err, "Failed to parse OpenWeather {what} JSON");
            FetchError::malformed(err.to_string())
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OwWeather {
    id: u32,
    main: String,
    description: String,
    icon: String,
}

impl From<OwWeather> for Condition {
    fn from(w: OwWeather) -> Self {
        Condition {
            id: w.id,
            main: w.main,
            description: w.description,
            icon: w.icon,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: u32,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    deg: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: Option<i64>,
    #[serde(default)]
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwForecastMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    name: String,
    #[serde(default)]
    country: String,
    state: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, city: &str) -> Result<WeatherSnapshot, FetchError> {
        let parsed: OwCurrentResponse = self
            .fetch_json(CURRENT_PATH, &[("q", city), ("units", UNITS)], "current")
            .await?;

        let condition = parsed
            .weather
            .into_iter()
            .next()
            .map(Condition::from)
            .unwrap_or_else(unknown_condition);

        let observation_time = parsed.dt.and_then(unix_to_utc).unwrap_or_else(Utc::now);

        Ok(WeatherSnapshot {
            location_name: parsed.name,
            country: parsed.sys.country.unwrap_or_default(),
            condition,
            temperature_c: parsed.main.temp,
            feels_like_c: parsed.main.feels_like,
            humidity_pct: parsed.main.humidity,
            pressure_hpa: parsed.main.pressure,
            wind_speed_mps: parsed.wind.speed,
            temp_min_c: parsed.main.temp_min,
            temp_max_c: parsed.main.temp_max,
            wind_deg: parsed.wind.deg,
            observation_time,
        })
    }

    async fn forecast(&self, city: &str) -> Result<Vec<ForecastEntry>, FetchError> {
        let parsed: OwForecastResponse = self
            .fetch_json(FORECAST_PATH, &[("q", city), ("units", UNITS)], "forecast")
            .await?;

        let entries = parsed
            .list
            .into_iter()
            .map(|entry| {
                let condition = entry
                    .weather
                    .into_iter()
                    .next()
                    .map(Condition::from)
                    .unwrap_or_else(unknown_condition);

                ForecastEntry {
                    time: unix_to_utc(entry.dt).unwrap_or_else(Utc::now),
                    temperature_c: entry.main.temp,
                    icon: condition.icon,
                    description: condition.description,
                }
            })
            .collect();

        Ok(entries)
    }

    async fn suggest(&self, query: &str, limit: u8) -> Result<Vec<Suggestion>, FetchError> {
        let limit = limit.to_string();
        let parsed: serde_json::Value = self
            .fetch_json(GEOCODING_PATH, &[("q", query), ("limit", limit.as_str())], "geocoding")
            .await?;

        if !parsed.is_array() {
            tracing::debug!("OpenWeather geocoding returned a non-array body; no suggestions");
            return Ok(Vec::new());
        }

        let entries: Vec<OwGeoEntry> = serde_json::from_value(parsed)
            .map_err(|err| FetchError::malformed(err.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|e| Suggestion {
                name: e.name,
                country: e.country,
                state: e.state,
                lat: e.lat,
                lon: e.lon,
            })
            .collect())
    }
}

fn unknown_condition() -> Condition {
    Condition {
        id: 0,
        main: "Unknown".to_string(),
        description: "Unknown".to_string(),
        icon: String::new(),
    }
}

/// Pull the provider's own `message` out of an error body, if it has one.
fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<OwErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
