//! Placeholder weather for running without a credential.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::model::{Condition, ForecastDays, ForecastEntry, WeatherReport, WeatherSnapshot};

const BASE_TEMP_C: f64 = 22.0;
const MAX_FORECAST_DROP: u8 = 4;

/// (icon, description) pairs the forecast slots are drawn from.
const FORECAST_CONDITIONS: [(&str, &str); 9] = [
    ("01d", "clear sky"),
    ("02d", "few clouds"),
    ("03d", "scattered clouds"),
    ("04d", "broken clouds"),
    ("09d", "shower rain"),
    ("10d", "rain"),
    ("11d", "thunderstorm"),
    ("13d", "snow"),
    ("50d", "mist"),
];

#[derive(Debug)]
pub struct SyntheticWeather<R = StdRng> {
    rng: R,
}

impl SyntheticWeather<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Same seed, same forecast.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SyntheticWeather<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Fixed clear-sky conditions labelled with the requested city.
    pub fn current(&self, city: &str, now: DateTime<Utc>) -> WeatherSnapshot {
        WeatherSnapshot {
            location_name: city.to_string(),
            country: "GB".to_string(),
            condition: Condition {
                id: 800,
                main: "Clear".to_string(),
                description: "clear sky".to_string(),
                icon: "01d".to_string(),
            },
            temperature_c: BASE_TEMP_C,
            feels_like_c: 23.0,
            humidity_pct: 65,
            pressure_hpa: 1015,
            wind_speed_mps: 3.5,
            temp_min_c: None,
            temp_max_c: None,
            wind_deg: None,
            observation_time: now,
        }
    }

    /// One entry per day starting tomorrow.
    pub fn forecast(&mut self, days: usize, now: DateTime<Utc>) -> Vec<ForecastEntry> {
        (1..=days)
            .map(|day| {
                let (icon, description) =
                    FORECAST_CONDITIONS[self.rng.gen_range(0..FORECAST_CONDITIONS.len())];
                let drop = self.rng.gen_range(0..=MAX_FORECAST_DROP);

                ForecastEntry {
                    time: now + Duration::days(day as i64),
                    temperature_c: BASE_TEMP_C - f64::from(drop),
                    icon: icon.to_string(),
                    description: description.to_string(),
                }
            })
            .collect()
    }

    pub fn report(&mut self, city: &str, days: ForecastDays, now: DateTime<Utc>) -> WeatherReport {
        WeatherReport {
            current: self.current(city, now),
            forecast: self.forecast(days.count(), now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_uses_requested_city_and_length() {
        let now = Utc::now();
        let mut synthetic = SyntheticWeather::seeded(7);

        for days in [ForecastDays::Four, ForecastDays::Five] {
            let report = synthetic.report("Reykjavík", days, now);
            assert_eq!(report.current.location_name, "Reykjavík");
            assert_eq!(report.current.display_temperature(), 22);
            assert_eq!(report.current.condition.description, "clear sky");
            assert_eq!(report.forecast.len(), days.count());
        }
    }

    #[test]
    fn forecast_is_daily_from_tomorrow_within_range() {
        let now = Utc::now();
        let forecast = SyntheticWeather::seeded(1).forecast(5, now);

        for (i, entry) in forecast.iter().enumerate() {
            assert_eq!(entry.time, now + Duration::days(i as i64 + 1));
            assert!((18.0..=22.0).contains(&entry.temperature_c));
            assert!(
                FORECAST_CONDITIONS
                    .iter()
                    .any(|(icon, desc)| *icon == entry.icon && *desc == entry.description)
            );
        }
    }

    #[test]
    fn same_seed_same_forecast() {
        let now = Utc::now();
        let a = SyntheticWeather::seeded(42).forecast(5, now);
        let b = SyntheticWeather::seeded(42).forecast(5, now);
        assert_eq!(a, b);
    }
}
