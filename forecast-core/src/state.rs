//! Display state and the reducer that sequences location → fetch → ready.
//!
//! `AppState` is an immutable record. Every input (a resolved location, a
//! fetch result, a user tap, a retry) is an [`Event`]; [`AppState::reduce`]
//! consumes the old state and returns the new one plus an optional
//! [`Command`] the driver has to execute.
//!
//! Fetches are tagged with the generation that issued them. A result whose
//! generation no longer matches the state is discarded, so a slow response
//! for an earlier coordinate can never overwrite newer data.

use serde::Serialize;

use crate::{
    error::{FetchError, ThemeError},
    model::{Coordinate, CurrentWeather, Forecast, WeatherObservation},
    theme::{PresentationTheme, select_theme},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailureKind {
    Network,
    Api,
    MalformedResponse,
    Aborted,
}

/// What went wrong with the last refresh, kept in state for the error alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub kind: FetchFailureKind,
    pub message: String,
    pub detail: String,
}

impl From<&FetchError> for FetchFailure {
    fn from(err: &FetchError) -> Self {
        let kind = match err {
            FetchError::Network { .. } => FetchFailureKind::Network,
            FetchError::Api { .. } => FetchFailureKind::Api,
            FetchError::Malformed { .. } => FetchFailureKind::MalformedResponse,
            FetchError::Aborted { .. } => FetchFailureKind::Aborted,
        };

        Self {
            kind,
            message: err.user_message().to_string(),
            detail: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    AwaitingLocation,
    FetchingWeather,
    Ready,
    Failed(FetchFailure),
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::AwaitingLocation => "awaiting_location",
            Phase::FetchingWeather => "fetching_weather",
            Phase::Ready => "ready",
            Phase::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub enum Event {
    LocationResolved {
        coordinate: Coordinate,
        notice: Option<String>,
    },
    WeatherFetched {
        generation: u64,
        result: Result<CurrentWeather, FetchError>,
    },
    ForecastFetched {
        generation: u64,
        result: Result<Forecast, FetchError>,
    },
    EntrySelected {
        generation: u64,
        index: usize,
    },
    RetryRequested,
}

/// Side effect requested by the reducer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Fetch current conditions and the forecast for `coordinate`, tagging
    /// both results with `generation`.
    Fetch {
        coordinate: Coordinate,
        generation: u64,
    },
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    phase: Phase,
    coordinate: Option<Coordinate>,
    notice: Option<String>,
    generation: u64,
    current: Option<CurrentWeather>,
    forecast: Option<Forecast>,
    selected: Option<usize>,
    /// Current conditions could not be fetched. The forecast is still usable.
    current_failure: Option<FetchFailure>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reduce(self, event: Event) -> (AppState, Option<Command>) {
        match event {
            Event::LocationResolved { coordinate, notice } => {
                let state = AppState {
                    coordinate: Some(coordinate),
                    notice,
                    ..self
                };
                state.begin_fetch()
            }

            Event::WeatherFetched { generation, result } => {
                if generation != self.generation {
                    tracing::debug!(
                        generation,
                        current = self.generation,
                        "discarding stale current-weather result"
                    );
                    return (self, None);
                }
                match result {
                    Ok(current) => (
                        AppState {
                            current: Some(current),
                            ..self
                        },
                        None,
                    ),
                    Err(err) => {
                        tracing::warn!(error = %err, "current conditions unavailable");
                        (
                            AppState {
                                current_failure: Some(FetchFailure::from(&err)),
                                ..self
                            },
                            None,
                        )
                    }
                }
            }

            Event::ForecastFetched { generation, result } => {
                if generation != self.generation {
                    tracing::debug!(
                        generation,
                        current = self.generation,
                        "discarding stale forecast result"
                    );
                    return (self, None);
                }
                match result {
                    Ok(forecast) => (self.populate_forecast(forecast), None),
                    Err(err) => (self.fail(&err), None),
                }
            }

            Event::EntrySelected { generation, index } => {
                let len = self.forecast.as_ref().map_or(0, Forecast::len);
                if self.phase != Phase::Ready || generation != self.generation || index >= len {
                    tracing::debug!(
                        generation,
                        index,
                        len,
                        "ignoring selection outside the displayed forecast"
                    );
                    return (self, None);
                }
                (
                    AppState {
                        selected: Some(index),
                        ..self
                    },
                    None,
                )
            }

            Event::RetryRequested => {
                if self.can_retry() {
                    self.begin_fetch()
                } else {
                    (self, None)
                }
            }
        }
    }

    fn begin_fetch(self) -> (AppState, Option<Command>) {
        let Some(coordinate) = self.coordinate else {
            return (self, None);
        };
        let generation = self.generation + 1;
        let state = AppState {
            phase: Phase::FetchingWeather,
            generation,
            current: None,
            forecast: None,
            selected: None,
            current_failure: None,
            ..self
        };
        (
            state,
            Some(Command::Fetch {
                coordinate,
                generation,
            }),
        )
    }

    /// A fresh list always resets the selection to its soonest entry: the
    /// previous selection pointed into a list that no longer exists.
    fn populate_forecast(self, forecast: Forecast) -> AppState {
        let selected = if forecast.is_empty() { None } else { Some(0) };
        AppState {
            phase: Phase::Ready,
            forecast: Some(forecast),
            selected,
            ..self
        }
    }

    fn fail(self, err: &FetchError) -> AppState {
        tracing::warn!(error = %err, "weather refresh failed");
        AppState {
            phase: Phase::Failed(FetchFailure::from(err)),
            ..self
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current(&self) -> Option<&CurrentWeather> {
        self.current.as_ref()
    }

    pub fn forecast(&self) -> Option<&Forecast> {
        self.forecast.as_ref()
    }

    pub fn forecast_entries(&self) -> &[WeatherObservation] {
        self.forecast.as_ref().map_or(&[], |f| f.entries.as_slice())
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_forecast(&self) -> Option<&WeatherObservation> {
        self.selected.and_then(|i| self.forecast_entries().get(i))
    }

    /// Computed on every read from the selected forecast entry.
    pub fn theme(&self) -> Result<Option<PresentationTheme>, ThemeError> {
        self.selected_forecast().map(select_theme).transpose()
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match &self.phase {
            Phase::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn current_failure(&self) -> Option<&FetchFailure> {
        self.current_failure.as_ref()
    }

    /// A failed forecast, or a ready forecast missing its current conditions.
    pub fn can_retry(&self) -> bool {
        let incomplete = match self.phase {
            Phase::Failed(_) => true,
            Phase::Ready => self.current_failure.is_some(),
            _ => false,
        };
        incomplete && self.coordinate.is_some()
    }

    pub fn is_fetching(&self) -> bool {
        self.phase == Phase::FetchingWeather
    }
}
