use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Weather condition as reported by the provider (id, group, text, icon code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl Condition {
    /// Large icon URL, as used for the current-conditions card.
    pub fn icon_url(&self) -> String {
        format!("{ICON_BASE_URL}/{}@2x.png", self.icon)
    }
}

/// Current conditions for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub country: String,
    pub condition: Condition,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub wind_speed_mps: f64,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub wind_deg: Option<u16>,
    pub observation_time: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Temperature as displayed: rounded to the nearest whole degree.
    pub fn display_temperature(&self) -> i64 {
        self.temperature_c.round() as i64
    }

    pub fn display_feels_like(&self) -> i64 {
        self.feels_like_c.round() as i64
    }
}

/// One future forecast slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub icon: String,
    pub description: String,
}

impl ForecastEntry {
    pub fn display_temperature(&self) -> i64 {
        self.temperature_c.round() as i64
    }

    pub fn icon_url(&self) -> String {
        format!("{ICON_BASE_URL}/{}.png", self.icon)
    }
}

/// Current conditions plus the truncated forecast for the same city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: WeatherSnapshot,
    pub forecast: Vec<ForecastEntry>,
}

/// Candidate place returned by the geocoding lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Suggestion {
    /// Dropdown label, e.g. "Portland, Oregon, US".
    pub fn label(&self) -> String {
        match self.state.as_deref() {
            Some(state) if !state.is_empty() => {
                format!("{}, {}, {}", self.name, state, self.country)
            }
            _ => format!("{}, {}", self.name, self.country),
        }
    }
}

/// Number of forecast entries a deployment shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ForecastDays {
    Four,
    #[default]
    Five,
}

impl ForecastDays {
    pub const fn count(self) -> usize {
        match self {
            ForecastDays::Four => 4,
            ForecastDays::Five => 5,
        }
    }
}

impl TryFrom<u8> for ForecastDays {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(ForecastDays::Four),
            5 => Ok(ForecastDays::Five),
            other => Err(format!("forecast length must be 4 or 5, got {other}")),
        }
    }
}

impl From<ForecastDays> for u8 {
    fn from(days: ForecastDays) -> Self {
        days.count() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(temp: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            location_name: "Oslo".into(),
            country: "NO".into(),
            condition: Condition {
                id: 800,
                main: "Clear".into(),
                description: "clear sky".into(),
                icon: "01d".into(),
            },
            temperature_c: temp,
            feels_like_c: temp - 1.5,
            humidity_pct: 40,
            pressure_hpa: 1012,
            wind_speed_mps: 2.0,
            temp_min_c: None,
            temp_max_c: None,
            wind_deg: None,
            observation_time: Utc::now(),
        }
    }

    #[test]
    fn display_temperature_rounds_half_away_from_zero() {
        assert_eq!(snapshot(21.5).display_temperature(), 22);
        assert_eq!(snapshot(21.49).display_temperature(), 21);
        assert_eq!(snapshot(-3.5).display_temperature(), -4);
    }

    #[test]
    fn icon_urls() {
        let snap = snapshot(10.0);
        assert_eq!(
            snap.condition.icon_url(),
            "https://openweathermap.org/img/wn/01d@2x.png"
        );
    }

    #[test]
    fn suggestion_label_includes_state_when_present() {
        let mut s = Suggestion {
            name: "Portland".into(),
            country: "US".into(),
            state: Some("Oregon".into()),
            lat: None,
            lon: None,
        };
        assert_eq!(s.label(), "Portland, Oregon, US");
        s.state = None;
        assert_eq!(s.label(), "Portland, US");
    }

    #[test]
    fn forecast_days_only_accepts_four_or_five() {
        assert_eq!(ForecastDays::try_from(4), Ok(ForecastDays::Four));
        assert_eq!(ForecastDays::try_from(5), Ok(ForecastDays::Five));
        assert!(ForecastDays::try_from(7).is_err());
        assert_eq!(u8::from(ForecastDays::Four), 4);
    }
}
