use crate::{
    Config,
    error::FetchError,
    model::{Coordinate, CurrentWeather, Forecast},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Default host serving condition icons.
pub const DEFAULT_ICON_HOST: &str = "openweathermap.org";

/// Read-only source of current conditions and forecasts for a coordinate.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, coordinate: &Coordinate) -> Result<CurrentWeather, FetchError>;

    async fn forecast(&self, coordinate: &Coordinate) -> Result<Forecast, FetchError>;
}

/// URL of the 2x icon for an observation's icon code.
pub fn icon_url(host: &str, icon: &str) -> String {
    format!("http://{host}/img/wn/{icon}@2x.png")
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<OpenWeatherProvider> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
                 Hint: run `forecast configure` or set {}.",
            crate::config::API_KEY_ENV
        )
    })?;

    OpenWeatherProvider::builder(api_key.to_owned())
        .base_url(config.api_base_url())
        .units(config.units)
        .build()
}
