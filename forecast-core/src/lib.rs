//! Core library for the `forecast` viewer.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather data source abstraction and its OpenWeather implementation
//! - Location providers with a fallback coordinate
//! - The theme selector and the reducer-driven display state
//!
//! It is used by `forecast-cli`, but any renderer can drive a [`Session`] and
//! draw the resulting [`DisplayModel`].

pub mod config;
pub mod display;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod session;
pub mod state;
pub mod theme;

pub use config::Config;
pub use display::DisplayModel;
pub use error::{FetchError, LocationError, ThemeError};
pub use location::{LocationProvider, LocationRequest};
pub use model::{Coordinate, CurrentWeather, Forecast, Units, WeatherObservation};
pub use provider::WeatherProvider;
pub use session::Session;
pub use state::{AppState, Event, Phase};
pub use theme::{BackgroundImage, PresentationTheme, TextColor, select_theme};
