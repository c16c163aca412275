use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, Select, Text};

use citycast_core::{
    Config, DiscoveryPolicy, EnvFile, EnvSource, ForecastDays, Phase, ProcessEnv, RuntimeEnv,
    WeatherController, WeatherSource, runtime_env::Resolution,
};

use crate::render;

/// Longest we wait for a debounced suggestion lookup to land.
const SUGGEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citycast", version, about = "City weather lookup")]
pub struct Cli {
    /// `KEY=VALUE` file the API key is injected into at container start.
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store an API key, default city, forecast length and favorites.
    Configure,

    /// Show current weather and forecast for a city.
    Show {
        /// City name; defaults to the configured city.
        city: Option<String>,

        /// Forecast entries to show (4 or 5).
        #[arg(long)]
        days: Option<u8>,

        /// Skip the favorite-city cards.
        #[arg(long)]
        no_favorites: bool,
    },

    /// Look up places matching a partial name.
    Suggest {
        /// Partial place name, at least 2 characters.
        query: String,

        /// Choose one of the matches and show its weather.
        #[arg(long)]
        pick: bool,
    },

    /// Check the API key setup and make one test call.
    Doctor,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure => configure(&mut config),
            Command::Show {
                city,
                days,
                no_favorites,
            } => {
                let env = resolve_env(&config, self.env_file).await;
                let mut controller_config = config.clone();
                if let Some(days) = days {
                    controller_config.forecast_days =
                        ForecastDays::try_from(days).map_err(anyhow::Error::msg)?;
                }
                if no_favorites {
                    controller_config.favorites.clear();
                }
                let city = city.unwrap_or_else(|| config.default_city().to_string());
                show(&env, &controller_config, &city).await
            }
            Command::Suggest { query, pick } => {
                let env = resolve_env(&config, self.env_file).await;
                suggest(&env, &config, &query, pick).await
            }
            Command::Doctor => {
                let env = resolve_env(&config, self.env_file).await;
                doctor(&env, &config).await
            }
        }
    }
}

/// Resolve the credential: process env, then the env file, then the stored key.
/// The stored key is only consulted once the runtime sources have given up.
async fn resolve_env(config: &Config, env_file: Option<PathBuf>) -> RuntimeEnv {
    let env_file = env_file.or_else(|| config.env_file.clone()).map(EnvFile::new);
    tracing::debug!(env_file = ?env_file.as_ref().map(EnvFile::path), "Resolving API key");

    let mut runtime: Vec<&dyn EnvSource> = Vec::new();
    runtime.push(&ProcessEnv);
    if let Some(file) = &env_file {
        runtime.push(file);
    }

    // Only an env file can still appear after start-up.
    let policy = if env_file.is_some() {
        config.discovery_policy()
    } else {
        DiscoveryPolicy::immediate()
    };

    RuntimeEnv::resolve_with_fallback(&runtime, &[config], policy).await
}

fn controller_for(env: &RuntimeEnv, config: &Config) -> WeatherController {
    let source = WeatherSource::from_env(env, config.base_url.as_deref());
    if !source.is_live() {
        eprintln!(
            "No API key configured; showing sample data. \
             Get a free key from https://openweathermap.org/api"
        );
    }
    WeatherController::new(source, config.view_settings())
}

async fn show(env: &RuntimeEnv, config: &Config, city: &str) -> anyhow::Result<()> {
    let controller = controller_for(env, config);
    let (phase, cards) = tokio::join!(controller.search(city), controller.refresh_favorites());
    print_phase(&phase)?;

    let favorites = render::favorites(&cards);
    if !favorites.is_empty() {
        println!();
        print!("{favorites}");
    }
    Ok(())
}

fn print_phase(phase: &Phase) -> anyhow::Result<()> {
    match phase {
        Phase::Ready(report) => {
            print!("{}", render::report(report));
            Ok(())
        }
        Phase::Failed(message) => bail!("{message}"),
        Phase::Idle | Phase::Loading => bail!("Search did not complete"),
    }
}

async fn suggest(
    env: &RuntimeEnv,
    config: &Config,
    query: &str,
    pick: bool,
) -> anyhow::Result<()> {
    let controller = controller_for(env, config);
    if query.trim().chars().count() < controller.settings().min_query_len {
        bail!(
            "Type at least {} characters to get suggestions",
            controller.settings().min_query_len
        );
    }

    controller.on_input(query);
    let mut updates = controller.subscribe();
    tokio::time::timeout(SUGGEST_TIMEOUT, updates.changed())
        .await
        .context("Timed out waiting for suggestions")?
        .context("Suggestion lookup stopped")?;

    let suggestions = controller.state().suggestions;
    if !pick || suggestions.is_empty() {
        print!("{}", render::suggestions(&suggestions));
        return Ok(());
    }

    let labels: Vec<String> = suggestions.iter().map(|s| s.label()).collect();
    let choice = Select::new("Pick a place:", labels).raw_prompt()?;

    match controller.select_suggestion(&suggestions[choice.index]) {
        Some(search) => print_phase(&search.await?),
        None => bail!("Nothing to search for"),
    }
}

async fn doctor(env: &RuntimeEnv, config: &Config) -> anyhow::Result<()> {
    match env.resolution() {
        Resolution::Found { source } => println!("API key source: {source}"),
        Resolution::Unavailable { attempts } => {
            println!("API key source: none (gave up after {attempts} attempt(s))")
        }
    }

    let key = env.api_key();
    println!("Has API key: {}", if key.is_some() { "yes" } else { "no" });
    println!("API key length: {}", key.map_or(0, str::len));

    let check = env.check();
    println!("{}", check.describe());
    if !check.is_usable() {
        return Ok(());
    }

    let WeatherSource::Live(provider) = WeatherSource::from_env(env, config.base_url.as_deref())
    else {
        return Ok(());
    };

    println!("Testing connection...");
    match provider.current("London").await {
        Ok(snapshot) => {
            println!(
                "API call successful: {}, {} {}°C",
                snapshot.location_name,
                snapshot.country,
                snapshot.display_temperature()
            );
            Ok(())
        }
        Err(err) => bail!("API call failed: {err}"),
    }
}

fn configure(config: &mut Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeatherMap API key (empty to remove):")
        .without_confirmation()
        .prompt()?;
    config.set_api_key(api_key);

    let city = Text::new("Default city:")
        .with_default(config.default_city())
        .prompt()?;
    let city = city.trim();
    config.default_city = (!city.is_empty()).then(|| city.to_string());

    let days = Select::new("Forecast length (days):", vec![5u8, 4]).prompt()?;
    config.forecast_days = ForecastDays::try_from(days).map_err(anyhow::Error::msg)?;

    let favorites = Text::new("Favorite cities (comma separated):")
        .with_default(&config.favorites.join(", "))
        .prompt()?;
    config.favorites = render::parse_city_list(&favorites);

    config.save()?;
    println!(
        "Saved configuration to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}
