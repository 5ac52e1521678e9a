use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    error::FetchError,
    model::{Condition, Coordinate, CurrentWeather, Forecast, Units, WeatherObservation},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    units: Units,
    http: Client,
}

impl std::fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("base_url", &self.base_url)
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct OpenWeatherProviderBuilder {
    api_key: String,
    base_url: String,
    units: Units,
}

impl OpenWeatherProviderBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn build(self) -> Result<OpenWeatherProvider> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(OpenWeatherProvider {
            api_key: self.api_key,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            units: self.units,
            http,
        })
    }
}

impl OpenWeatherProvider {
    pub fn builder(api_key: String) -> OpenWeatherProviderBuilder {
        OpenWeatherProviderBuilder {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: Units::default(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        coordinate: &Coordinate,
    ) -> Result<T, FetchError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();

        tracing::debug!(endpoint, %coordinate, units = %self.units, "requesting OpenWeather data");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("units", self.units.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|source| network(endpoint, source))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| network(endpoint, source))?;

        if !status.is_success() {
            tracing::warn!(endpoint, status = status.as_u16(), "OpenWeather request rejected");
            return Err(FetchError::Api {
                endpoint,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|err| FetchError::Malformed {
            endpoint,
            reason: err.to_string(),
        })
    }
}

// The request URL carries the API key, so it is stripped before the error
// can reach a log line or the user.
fn network(endpoint: &'static str, source: reqwest::Error) -> FetchError {
    FetchError::Network {
        endpoint,
        source: source.without_url(),
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize, Default)]
struct OwWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize, Default)]
struct OwSys {
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwObservation {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
}

impl OwObservation {
    fn into_observation(self, fallback_sunset: Option<i64>) -> WeatherObservation {
        let condition = self.weather.into_iter().next().map(|w| Condition {
            main: w.main,
            description: w.description,
            icon: w.icon,
        });

        WeatherObservation {
            timestamp: self.dt,
            condition,
            temp: self.main.temp,
            temp_min: self.main.temp_min,
            temp_max: self.main.temp_max,
            feels_like: self.main.feels_like,
            humidity: self.main.humidity,
            pressure: self.main.pressure,
            wind_speed: self.wind.speed,
            sunset: self.sys.sunset.or(fallback_sunset),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    #[serde(flatten)]
    observation: OwObservation,
}

#[derive(Debug, Deserialize, Default)]
struct OwCity {
    #[serde(default)]
    name: String,
    sunrise: Option<i64>,
    sunset: Option<i64>,
    /// Shift from UTC in seconds.
    #[serde(default)]
    timezone: i64,
}

const DAY: i64 = 86_400;

impl OwCity {
    /// Sunset that governs `dt`: the city's sunset moved onto the local day
    /// of `dt`, or the previous day's sunset when `dt` falls before that
    /// day's sunrise.
    fn sunset_for(&self, dt: i64) -> Option<i64> {
        let sunset = self.sunset?;
        let local_day = |t: i64| (t + self.timezone).div_euclid(DAY);
        let day = local_day(dt);
        let mut shifted = sunset + DAY * (day - local_day(sunset));

        if let Some(sunrise) = self.sunrise {
            let sunrise = sunrise + DAY * (day - local_day(sunrise));
            if dt < sunrise {
                shifted -= DAY;
            }
        }
        Some(shifted)
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    city: OwCity,
    list: Vec<OwObservation>,
}

fn current_from_response(parsed: OwCurrentResponse) -> CurrentWeather {
    CurrentWeather {
        location_name: parsed.name,
        observation: parsed.observation.into_observation(None),
    }
}

fn forecast_from_response(parsed: OwForecastResponse) -> Forecast {
    let city = parsed.city;
    let entries = parsed
        .list
        .into_iter()
        .map(|entry| {
            let sunset = city.sunset_for(entry.dt);
            entry.into_observation(sunset)
        })
        .collect();

    Forecast {
        location_name: city.name,
        entries,
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, coordinate: &Coordinate) -> Result<CurrentWeather, FetchError> {
        let parsed: OwCurrentResponse = self.get_json("weather", coordinate).await?;
        Ok(current_from_response(parsed))
    }

    async fn forecast(&self, coordinate: &Coordinate) -> Result<Forecast, FetchError> {
        let parsed: OwForecastResponse = self.get_json("forecast", coordinate).await?;
        let forecast = forecast_from_response(parsed);
        tracing::debug!(entries = forecast.len(), "forecast received");
        Ok(forecast)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
