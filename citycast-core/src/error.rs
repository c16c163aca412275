//! Failures of a weather lookup.
//!
//! `Display` of every variant is the message shown to the user, so the
//! controller can publish `err.to_string()` as-is.

use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Failed to fetch weather data";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Invalid API key. Please verify your OpenWeatherMap API key is correct.")]
    Unauthorized,

    #[error("City not found. Please check the city name and try again.")]
    NotFound,

    #[error("Error {status}: {}", .message.as_deref().unwrap_or(GENERIC_FAILURE))]
    Status { status: u16, message: Option<String> },

    /// The request never produced a response (DNS, refused, reset, timeout).
    #[error(
        "Network error: Unable to connect to weather service. Please check your internet connection."
    )]
    Network(String),

    #[error("Error: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Classify a non-success HTTP status. `message` is the provider's own
    /// error text, if the body carried one.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => FetchError::Unauthorized,
            404 => FetchError::NotFound,
            _ => FetchError::Status {
                status,
                message: message.filter(|m| !m.trim().is_empty()),
            },
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if detail.trim().is_empty() {
            FetchError::Malformed(GENERIC_FAILURE.to_string())
        } else {
            FetchError::Malformed(detail)
        }
    }

    pub fn network(detail: impl ToString) -> Self {
        FetchError::Network(detail.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_ignores_provider_message() {
        let err = FetchError::from_status(401, Some("something else".into()));
        assert_eq!(
            err.to_string(),
            "Invalid API key. Please verify your OpenWeatherMap API key is correct."
        );
    }

    #[test]
    fn not_found_message() {
        let err = FetchError::from_status(404, None);
        assert_eq!(
            err.to_string(),
            "City not found. Please check the city name and try again."
        );
    }

    #[test]
    fn other_status_uses_provider_message_or_generic() {
        let err = FetchError::from_status(429, Some("rate limited".into()));
        assert_eq!(err.to_string(), "Error 429: rate limited");

        let err = FetchError::from_status(500, Some("   ".into()));
        assert_eq!(err.to_string(), "Error 500: Failed to fetch weather data");
    }

    #[test]
    fn network_message_hides_detail() {
        let err = FetchError::network("connection refused");
        assert!(err.to_string().starts_with("Network error:"));
        assert!(!err.to_string().contains("refused"));
    }

    #[test]
    fn malformed_falls_back_to_generic() {
        assert_eq!(
            FetchError::malformed("").to_string(),
            "Error: Failed to fetch weather data"
        );
        assert_eq!(
            FetchError::malformed("missing field `main`").to_string(),
            "Error: missing field `main`"
        );
    }
}
