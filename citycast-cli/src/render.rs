//! Plain-text rendering of view state.

use std::fmt::Write;

use chrono::Local;
use citycast_core::{Suggestion, WeatherReport, WeatherSnapshot};

pub fn report(report: &WeatherReport) -> String {
    let current = &report.current;
    let mut out = String::new();

    let _ = writeln!(out, "{}", location(current));
    let _ = writeln!(
        out,
        "  {}°C  {}",
        current.display_temperature(),
        current.condition.description
    );
    let _ = writeln!(out, "  Feels like: {}°C", current.display_feels_like());
    if let (Some(min), Some(max)) = (current.temp_min_c, current.temp_max_c) {
        let _ = writeln!(out, "  Low/High: {}°C / {}°C", min.round(), max.round());
    }
    let _ = writeln!(out, "  Humidity: {}%", current.humidity_pct);
    match current.wind_deg {
        Some(deg) => {
            let _ = writeln!(out, "  Wind: {} m/s from {}°", current.wind_speed_mps, deg);
        }
        None => {
            let _ = writeln!(out, "  Wind: {} m/s", current.wind_speed_mps);
        }
    }
    let _ = writeln!(out, "  Pressure: {} hPa", current.pressure_hpa);

    if !report.forecast.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}-Day Forecast", report.forecast.len());
        for entry in &report.forecast {
            let _ = writeln!(
                out,
                "  {}  {:>4}°C  {}",
                entry.time.with_timezone(&Local).format("%a"),
                entry.display_temperature(),
                entry.description
            );
        }
    }

    out
}

pub fn favorites(cards: &[WeatherSnapshot]) -> String {
    let mut out = String::new();
    if cards.is_empty() {
        return out;
    }

    let _ = writeln!(out, "Favorites");
    for card in cards {
        let _ = writeln!(
            out,
            "  {:<24} {:>4}°C  {}",
            location(card),
            card.display_temperature(),
            card.condition.description
        );
    }
    out
}

pub fn suggestions(list: &[Suggestion]) -> String {
    if list.is_empty() {
        return "No matching places.\n".to_string();
    }

    list.iter()
        .enumerate()
        .map(|(i, s)| format!("  {}. {}\n", i + 1, s.label()))
        .collect()
}

fn location(snapshot: &WeatherSnapshot) -> String {
    if snapshot.country.is_empty() {
        snapshot.location_name.clone()
    } else {
        format!("{}, {}", snapshot.location_name, snapshot.country)
    }
}

/// Split a comma-separated list of city names, dropping blanks.
pub fn parse_city_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
