//! Maps a weather observation to the background image and text color shown
//! behind it.

use serde::{Deserialize, Serialize};

use crate::{error::ThemeError, model::WeatherObservation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundImage {
    Sunny,
    Night,
    Rainy,
    Cloudy,
}

impl BackgroundImage {
    pub fn asset_key(&self) -> &'static str {
        match self {
            BackgroundImage::Sunny => "sunny",
            BackgroundImage::Night => "night",
            BackgroundImage::Rainy => "rainy",
            BackgroundImage::Cloudy => "cloudy",
        }
    }

    pub fn asset_file(&self) -> String {
        format!("{}.jpg", self.asset_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    Black,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresentationTheme {
    pub background: BackgroundImage,
    pub text_color: TextColor,
}

impl PresentationTheme {
    pub const NIGHT: Self = Self::new(BackgroundImage::Night, TextColor::White);
    pub const RAINY: Self = Self::new(BackgroundImage::Rainy, TextColor::White);
    pub const CLOUDY: Self = Self::new(BackgroundImage::Cloudy, TextColor::White);
    pub const SUNNY: Self = Self::new(BackgroundImage::Sunny, TextColor::Black);

    pub const fn new(background: BackgroundImage, text_color: TextColor) -> Self {
        Self {
            background,
            text_color,
        }
    }
}

/// Pick the theme for an observation. First matching rule wins:
///
/// 1. observed after sunset → night
/// 2. rain or drizzle → rainy
/// 3. clouds or snow → cloudy
/// 4. anything else → sunny
///
/// Condition names are compared case-insensitively. An observation without a
/// sunset never matches the night rule.
pub fn select_theme(observation: &WeatherObservation) -> Result<PresentationTheme, ThemeError> {
    let main = observation
        .condition_main()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or(ThemeError::InvalidObservation {
            timestamp: observation.timestamp,
        })?;

    if observation
        .sunset
        .is_some_and(|sunset| observation.timestamp > sunset)
    {
        return Ok(PresentationTheme::NIGHT);
    }

    let theme = match main.to_lowercase().as_str() {
        "rain" | "drizzle" => PresentationTheme::RAINY,
        "clouds" | "snow" => PresentationTheme::CLOUDY,
        _ => PresentationTheme::SUNNY,
    };

    Ok(theme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;

    fn obs(timestamp: i64, sunset: i64, main: &str) -> WeatherObservation {
        WeatherObservation {
            timestamp,
            condition: Some(Condition {
                main: main.to_string(),
                description: String::new(),
                icon: "01d".to_string(),
            }),
            temp: 70.0,
            temp_min: 65.0,
            temp_max: 75.0,
            feels_like: 70.0,
            humidity: 50,
            pressure: 1013,
            wind_speed: 5.0,
            sunset: Some(sunset),
        }
    }

    #[test]
    fn after_sunset_is_night_regardless_of_condition() {
        for main in ["Clear", "Rain", "Drizzle", "Clouds", "Snow", "Thunderstorm"] {
            let theme = select_theme(&obs(1300, 1200, main)).unwrap();
            assert_eq!(theme, PresentationTheme::NIGHT, "condition {main}");
            assert_eq!(theme.text_color, TextColor::White);
        }
    }

    #[test]
    fn rain_and_drizzle_match_case_insensitively() {
        for main in ["Rain", "rain", "DRIZZLE", "Drizzle"] {
            let theme = select_theme(&obs(1000, 1200, main)).unwrap();
            assert_eq!(theme, PresentationTheme::RAINY, "condition {main}");
        }
    }

    #[test]
    fn clouds_and_snow_are_cloudy() {
        for main in ["Clouds", "Snow", "snow"] {
            let theme = select_theme(&obs(1000, 1200, main)).unwrap();
            assert_eq!(theme, PresentationTheme::CLOUDY, "condition {main}");
        }
    }

    #[test]
    fn everything_else_is_sunny_with_black_text() {
        for main in ["Clear", "Mist", "Thunderstorm", "Haze"] {
            let theme = select_theme(&obs(1000, 1200, main)).unwrap();
            assert_eq!(theme, PresentationTheme::SUNNY, "condition {main}");
            assert_eq!(theme.text_color, TextColor::Black);
        }
    }

    #[test]
    fn exactly_at_sunset_is_still_day() {
        let theme = select_theme(&obs(1200, 1200, "Clear")).unwrap();
        assert_eq!(theme, PresentationTheme::SUNNY);
    }

    #[test]
    fn rain_before_sunset_scenario() {
        let theme = select_theme(&obs(1000, 1200, "Rain")).unwrap();
        assert_eq!(theme.background, BackgroundImage::Rainy);
        assert_eq!(theme.text_color, TextColor::White);
    }

    #[test]
    fn missing_sunset_skips_night_rule() {
        let mut o = obs(5000, 0, "Clear");
        o.sunset = None;
        assert_eq!(select_theme(&o).unwrap(), PresentationTheme::SUNNY);
    }

    #[test]
    fn missing_condition_is_invalid() {
        let mut o = obs(1000, 1200, "Rain");
        o.condition = None;
        assert_eq!(
            select_theme(&o),
            Err(ThemeError::InvalidObservation { timestamp: 1000 })
        );

        let blank = obs(1000, 1200, "  ");
        assert!(select_theme(&blank).is_err());
    }

    #[test]
    fn asset_files_follow_keys() {
        assert_eq!(BackgroundImage::Night.asset_file(), "night.jpg");
        assert_eq!(BackgroundImage::Cloudy.asset_key(), "cloudy");
    }
}
