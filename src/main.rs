use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use clap::Parser;
use zipcast_core::{Config, TemperatureUnit};
use zipcast_weather::{
    render_forecast, request_fetch, ForecastCache, ForecastMessage, EMPTY_ZIP_MESSAGE,
    FAILURE_MESSAGE,
};

/// Current temperature and the next few days for a US ZIP code.
#[derive(Parser, Debug)]
#[command(name = "zipcast", version, about)]
struct Cli {
    /// ZIP codes to look up. When omitted, ZIP codes are read from stdin, one per line.
    zips: Vec<String>,

    /// Display unit: auto, celsius or fahrenheit.
    #[arg(long, env = "ZIPCAST_UNIT", value_name = "UNIT")]
    unit: Option<TemperatureUnit>,

    /// Minutes a fetched forecast is reused before going back to the network.
    #[arg(long, value_name = "MINUTES")]
    cache_minutes: Option<u32>,

    /// Print each forecast as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Read configuration from this file instead of the default location.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

struct Session {
    runtime: tokio::runtime::Runtime,
    cache: Arc<ForecastCache>,
    tx: mpsc::Sender<ForecastMessage>,
    rx: mpsc::Receiver<ForecastMessage>,
    json: bool,
    failures: usize,
}

impl Session {
    fn lookup(&mut self, raw: &str) -> Result<()> {
        let zip = raw.trim();
        if zip.is_empty() {
            println!("{}", EMPTY_ZIP_MESSAGE);
            return Ok(());
        }

        request_fetch(&self.tx, self.runtime.handle(), self.cache.clone(), zip);

        let ForecastMessage::FetchDone { zip, result } = self
            .rx
            .recv()
            .context("Forecast worker stopped before reporting")?;

        match result {
            Ok(forecast) if self.json => {
                let out = serde_json::json!({ "zip": zip, "forecast": forecast });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            Ok(forecast) => {
                println!("ZIP: {}", zip);
                println!("{}\n", render_forecast(&forecast));
            }
            Err(e) => {
                tracing::debug!("Lookup for {} failed: {:?}", zip, e);
                println!("ZIP: {}", zip);
                println!("{}\n", FAILURE_MESSAGE);
                eprintln!("{}", e.user_message());
                self.failures += 1;
            }
        }
        Ok(())
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(unit) = cli.unit {
        config.weather.temperature_unit = unit;
    }
    if let Some(minutes) = cli.cache_minutes {
        config.weather.cache_minutes = minutes;
    }

    config.ensure_valid()?;

    Ok(config)
}

fn main() -> Result<ExitCode> {
    zipcast_core::init()?;
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    tracing::info!(
        "Serving forecasts in {:?}, cached for {} minutes",
        config.weather.temperature_unit.resolve(),
        config.weather.cache_minutes
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let cache = Arc::new(ForecastCache::from_config(&config)?);
    let (tx, rx) = mpsc::channel();

    let mut session = Session {
        runtime,
        cache,
        tx,
        rx,
        json: cli.json,
        failures: 0,
    };

    if cli.zips.is_empty() {
        for line in std::io::stdin().lock().lines() {
            let line = line.context("Failed to read ZIP code from stdin")?;
            session.lookup(&line)?;
        }
    } else {
        for zip in &cli.zips {
            session.lookup(zip)?;
        }
    }

    tracing::debug!("{} forecasts cached at exit", session.cache.len());

    Ok(if session.failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_zips_and_flags() {
        let cli = Cli::parse_from(["zipcast", "10001", "90210", "--unit", "celsius", "--json"]);
        assert_eq!(cli.zips, ["10001", "90210"]);
        assert_eq!(cli.unit, Some(TemperatureUnit::Celsius));
        assert!(cli.json);
        assert!(cli.cache_minutes.is_none());
    }

    #[test]
    fn test_cli_rejects_unknown_unit() {
        assert!(Cli::try_parse_from(["zipcast", "--unit", "kelvin"]).is_err());
    }

    #[test]
    fn test_overrides_apply_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cli = Cli::parse_from([
            "zipcast",
            "--config",
            path.to_str().unwrap(),
            "--unit",
            "f",
            "--cache-minutes",
            "5",
        ]);

        let config = load_config(&cli).unwrap();
        assert_eq!(config.weather.temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(config.weather.cache_minutes, 5);
        assert!(path.exists());
    }
}
