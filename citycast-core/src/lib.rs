//! Core library for the `citycast` weather lookup.
//!
//! This crate defines:
//! - Runtime credential discovery (env var or container-written env file)
//! - Settings persisted on disk
//! - The OpenWeatherMap client and the synthetic fallback used without a key
//! - The view controller that turns typing and searches into view state
//!
//! It is used by `citycast-cli`, but can also drive other front-ends.

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod provider;
pub mod runtime_env;
pub mod synthetic;

pub use config::Config;
pub use controller::{Phase, ViewSettings, ViewState, WeatherController};
pub use error::FetchError;
pub use model::{Condition, ForecastDays, ForecastEntry, Suggestion, WeatherReport, WeatherSnapshot};
pub use provider::{WeatherProvider, WeatherSource};
pub use runtime_env::{DiscoveryPolicy, EnvFile, EnvSource, KeyCheck, ProcessEnv, RuntimeEnv};
