use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use forecast_core::{
    Config, Coordinate, DisplayModel, Phase, Session, Units,
    location::{FixedLocation, IpLocation, LocationProvider},
    provider::provider_from_config,
};
use inquire::{Confirm, Password, PasswordDisplayMode, Select};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Weather forecast viewer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and preferred units.
    Configure,

    /// Print current conditions and the forecast once.
    Show {
        #[command(flatten)]
        location: LocationArgs,

        /// Emit the display model as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Pick forecast entries interactively; each pick re-themes the view.
    Browse {
        #[command(flatten)]
        location: LocationArgs,
    },
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude in decimal degrees. Skips location lookup.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude in decimal degrees. Skips location lookup.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
}

impl LocationArgs {
    fn locator(&self) -> Box<dyn LocationProvider> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Box::new(FixedLocation(Coordinate::new(lat, lon))),
            _ => Box::new(IpLocation::new()),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { location, json } => show(&location, json).await,
            Command::Browse { location } => browse(&location).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    let mut config = Config::load_from(&path)?;

    let prompt = if config.has_api_key() {
        "OpenWeather API key (leave empty to keep the current one):"
    } else {
        "OpenWeather API key:"
    };
    let key = Password::new(prompt)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !key.trim().is_empty() {
        config.set_api_key(key.trim().to_string());
    }

    let options = vec![Units::Imperial, Units::Metric, Units::Standard];
    let start = options.iter().position(|u| *u == config.units).unwrap_or(0);
    config.units = Select::new("Units:", options)
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read units")?;

    config.save_to(&path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

async fn start_session(config: &Config, location: &LocationArgs) -> anyhow::Result<Session> {
    tracing::debug!(?config, "loaded configuration");
    let provider = provider_from_config(config)?;
    let mut session = Session::new(Arc::new(provider));

    let resolution = session
        .start(
            location.locator().as_ref(),
            &config.location_request(),
            config.fallback_coordinate(),
        )
        .await;
    if let Some(notice) = &resolution.notice {
        eprintln!("{notice}");
    }

    Ok(session)
}

async fn show(location: &LocationArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut session = start_session(&config, location).await?;
    let state = session.settle().await;

    let model = DisplayModel::from_state(state, config.icon_host());
    if json {
        let out =
            serde_json::to_string_pretty(&model).context("Failed to serialize display model")?;
        println!("{out}");
    } else {
        print!("{}", render::render(&model, config.units));
    }

    Ok(())
}

async fn browse(location: &LocationArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut session = start_session(&config, location).await?;

    loop {
        let state = session.settle().await;
        let model = DisplayModel::from_state(state, config.icon_host());
        print!("{}", render::render(&model, config.units));

        let phase = session.state().phase().clone();
        match phase {
            Phase::Failed(_) => {
                let retry = Confirm::new("Retry?")
                    .with_default(true)
                    .prompt()
                    .context("Failed to read answer")?;
                if !retry {
                    return Ok(());
                }
                session.retry();
            }
            Phase::Ready if !model.forecast.is_empty() => {
                match pick(&model, config.units)? {
                    Choice::Entry(index) => session.select(model.generation, index),
                    Choice::Retry => session.retry(),
                    Choice::Quit => return Ok(()),
                }
            }
            _ => return Ok(()),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Entry(usize),
    Retry,
    Quit,
}

/// Picker options: one per tile, then Retry when something is missing, then Quit.
fn choices(model: &DisplayModel, units: Units) -> Vec<(String, Choice)> {
    let mut options: Vec<(String, Choice)> = model
        .forecast
        .iter()
        .map(|tile| (render::tile_label(tile, units), Choice::Entry(tile.index)))
        .collect();
    if model.can_retry {
        options.push((RETRY.to_string(), Choice::Retry));
    }
    options.push((QUIT.to_string(), Choice::Quit));
    options
}

fn pick(model: &DisplayModel, units: Units) -> anyhow::Result<Choice> {
    let mut options = choices(model, units);
    let labels: Vec<String> = options.iter().map(|(label, _)| label.clone()).collect();

    let start = model.forecast.iter().position(|tile| tile.selected);
    let picked = Select::new("Forecast entry:", labels)
        .with_starting_cursor(start.unwrap_or(0))
        .raw_prompt()
        .context("Failed to read selection")?;

    Ok(options.swap_remove(picked.index).1)
}

const RETRY: &str = "Retry";
const QUIT: &str = "Quit";
