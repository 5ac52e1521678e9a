//! Everything a renderer needs to draw one frame, derived from [`AppState`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    model::WeatherObservation,
    provider::icon_url,
    state::AppState,
    theme::PresentationTheme,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentSummary {
    pub description: Option<String>,
    pub temp: f64,
    pub feels_like: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDetail {
    pub time: Option<DateTime<Utc>>,
    pub main: Option<String>,
    pub description: Option<String>,
    pub temp: f64,
    pub temp_max: f64,
    pub temp_min: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastTile {
    pub index: usize,
    pub time: Option<DateTime<Utc>>,
    pub temp: f64,
    pub icon_url: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayModel {
    pub phase: &'static str,
    pub location_name: Option<String>,
    pub notice: Option<String>,
    pub error: Option<String>,
    /// A retry would fetch something that is missing.
    pub can_retry: bool,
    pub current: Option<CurrentSummary>,
    pub selected: Option<ForecastDetail>,
    pub forecast: Vec<ForecastTile>,
    pub theme: Option<PresentationTheme>,
    /// Generation the tiles belong to; selections must carry it back.
    pub generation: u64,
}

impl DisplayModel {
    pub fn from_state(state: &AppState, icon_host: &str) -> Self {
        let location_name = state
            .current()
            .map(|c| c.location_name.clone())
            .or_else(|| state.forecast().map(|f| f.location_name.clone()))
            .filter(|name| !name.is_empty());

        let current = state.current().map(|c| CurrentSummary {
            description: c.observation.description().map(str::to_string),
            temp: c.observation.temp,
            feels_like: c.observation.feels_like,
        });

        let theme = match state.theme() {
            Ok(theme) => theme,
            Err(err) => {
                tracing::error!(error = %err, "selected forecast entry cannot be themed");
                None
            }
        };

        let forecast = state
            .forecast_entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| ForecastTile {
                index,
                time: entry.observed_at(),
                temp: entry.temp,
                icon_url: entry.icon().map(|icon| icon_url(icon_host, icon)),
                selected: state.selected_index() == Some(index),
            })
            .collect();

        Self {
            phase: state.phase().label(),
            location_name,
            notice: state.notice().map(str::to_string),
            error: state
                .failure()
                .or(state.current_failure())
                .map(|f| f.message.clone()),
            can_retry: state.can_retry(),
            current,
            selected: state.selected_forecast().map(detail),
            forecast,
            theme,
            generation: state.generation(),
        }
    }
}

fn detail(entry: &WeatherObservation) -> ForecastDetail {
    ForecastDetail {
        time: entry.observed_at(),
        main: entry.condition_main().map(str::to_string),
        description: entry.description().map(str::to_string),
        temp: entry.temp,
        temp_max: entry.temp_max,
        temp_min: entry.temp_min,
        feels_like: entry.feels_like,
        humidity: entry.humidity,
        pressure: entry.pressure,
        wind_speed: entry.wind_speed,
    }
}
