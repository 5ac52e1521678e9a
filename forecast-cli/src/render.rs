//! Plain-text rendering of a [`DisplayModel`].

use chrono::{DateTime, Local, Utc};
use forecast_core::{
    DisplayModel, Units,
    display::{ForecastDetail, ForecastTile},
    theme::TextColor,
};
use std::fmt;

const PLACEHOLDER: &str = "--";

fn local_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.with_timezone(&Local).format("%a %d %b %H:%M").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn temp(value: f64, units: Units) -> String {
    format!("{value:.1}{}", units.temperature_suffix())
}

pub fn tile_label(tile: &ForecastTile, units: Units) -> String {
    format!("{}  {}", local_time(tile.time), temp(tile.temp, units))
}

/// One full text frame for a [`DisplayModel`].
struct Frame<'a> {
    model: &'a DisplayModel,
    units: Units,
}

impl Frame<'_> {
    fn write_detail(&self, f: &mut fmt::Formatter<'_>, detail: &ForecastDetail) -> fmt::Result {
        let units = self.units;
        writeln!(
            f,
            "{} ({})",
            detail.main.as_deref().unwrap_or(PLACEHOLDER),
            detail.description.as_deref().unwrap_or(PLACEHOLDER),
        )?;
        writeln!(f, "  Time:        {}", local_time(detail.time))?;
        writeln!(f, "  Temperature: {}", temp(detail.temp, units))?;
        writeln!(f, "  Feels like:  {}", temp(detail.feels_like, units))?;
        writeln!(
            f,
            "  High / Low:  {} / {}",
            temp(detail.temp_max, units),
            temp(detail.temp_min, units)
        )?;
        writeln!(f, "  Humidity:    {}%", detail.humidity)?;
        writeln!(f, "  Pressure:    {} hPa", detail.pressure)?;
        writeln!(
            f,
            "  Wind:        {:.1} {}",
            detail.wind_speed,
            units.speed_suffix()
        )
    }
}

impl fmt::Display for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.model;
        let units = self.units;

        writeln!(
            f,
            "Weather Forecast: {}",
            model.location_name.as_deref().unwrap_or(PLACEHOLDER)
        )?;

        if let Some(theme) = model.theme {
            let text = match theme.text_color {
                TextColor::Black => "black",
                TextColor::White => "white",
            };
            writeln!(
                f,
                "Background: {} (text: {text})",
                theme.background.asset_file()
            )?;
        }

        if let Some(error) = &model.error {
            writeln!(f, "\n! {error}")?;
        }

        if let Some(current) = &model.current {
            writeln!(
                f,
                "\nNow: {}, {} (feels like {})",
                current.description.as_deref().unwrap_or(PLACEHOLDER),
                temp(current.temp, units),
                temp(current.feels_like, units)
            )?;
        }

        match &model.selected {
            Some(detail) => {
                writeln!(f)?;
                self.write_detail(f, detail)?;
            }
            None if model.phase == "fetching_weather" || model.phase == "awaiting_location" => {
                writeln!(f, "\nFetching weather data...")?;
            }
            None => {}
        }

        if !model.forecast.is_empty() {
            writeln!(f)?;
            for tile in &model.forecast {
                let marker = if tile.selected { '>' } else { ' ' };
                writeln!(f, "{marker} {}", tile_label(tile, units))?;
            }
        }

        Ok(())
    }
}

pub fn render(model: &DisplayModel, units: Units) -> String {
    Frame { model, units }.to_string()
}
