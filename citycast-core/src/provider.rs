use crate::{
    error::FetchError,
    model::{ForecastEntry, Suggestion, WeatherSnapshot},
    provider::openweather::OpenWeatherProvider,
    runtime_env::RuntimeEnv,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions for a city name.
    async fn current(&self, city: &str) -> Result<WeatherSnapshot, FetchError>;

    /// Upcoming forecast slots for a city name, chronological, untruncated.
    async fn forecast(&self, city: &str) -> Result<Vec<ForecastEntry>, FetchError>;

    /// Candidate places for a partial name. A response that is not a list
    /// means "no results", not an error.
    async fn suggest(&self, query: &str, limit: u8) -> Result<Vec<Suggestion>, FetchError>;
}

/// Where weather data comes from for the lifetime of a controller.
#[derive(Debug, Clone)]
pub enum WeatherSource {
    Live(Arc<dyn WeatherProvider>),
    /// No credential: placeholder data, never a network call.
    Synthetic,
}

impl WeatherSource {
    /// Pick the source from the resolved runtime environment.
    pub fn from_env(env: &RuntimeEnv, base_url: Option<&str>) -> Self {
        match env.api_key() {
            Some(key) => {
                let provider = match base_url {
                    Some(url) => OpenWeatherProvider::with_base_url(key.to_owned(), url),
                    None => OpenWeatherProvider::new(key.to_owned()),
                };
                WeatherSource::Live(Arc::new(provider))
            }
            None => {
                tracing::info!(
                    "No API key configured; using synthetic weather data. \
                     Get a free key from https://openweathermap.org/api"
                );
                WeatherSource::Synthetic
            }
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, WeatherSource::Live(_))
    }
}
