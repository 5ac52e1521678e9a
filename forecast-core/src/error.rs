use thiserror::Error;

/// Failure while talking to the weather data source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error while requesting {endpoint}: {source}")]
    Network {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Weather API {endpoint} request failed with status {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("Malformed {endpoint} response: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },

    /// The task running the request died before producing a result.
    #[error("{endpoint} request aborted: {reason}")]
    Aborted {
        endpoint: &'static str,
        reason: String,
    },
}

impl FetchError {
    /// Short, non-technical message for the user-facing alert.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => {
                "Could not reach the weather service. Check your connection and retry."
            }
            FetchError::Api { status: 401, .. } => {
                "The weather service rejected the API key. Run `forecast configure`."
            }
            FetchError::Api { .. } => "The weather service returned an error. Please retry.",
            FetchError::Malformed { .. } => {
                "The weather service sent data that could not be read. Please retry."
            }
            FetchError::Aborted { .. } => "The weather refresh stopped unexpectedly. Please retry.",
        }
    }
}

/// Reasons the location provider could not produce a coordinate.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location service unavailable")]
    Unavailable,

    #[error("Location request timed out after {0} ms")]
    Timeout(u128),

    #[error("Location lookup failed: {0}")]
    Lookup(String),
}

/// The presentation selector was handed an observation it cannot classify.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeError {
    #[error("Invalid observation at {timestamp}: missing weather condition")]
    InvalidObservation { timestamp: i64 },
}
