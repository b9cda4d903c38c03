//! Currency list loading and per-run settings.
//!
//! The currency list is a JSON (`config.json`) or TOML file:
//!
//! ```json
//! {"currencies": [{"name": "Bitcoin", "symbol": "BTC", "cmc": "bitcoin", "cmc_id": "1"}]}
//! ```
//!
//! Entries are trimmed on load. An empty list, an entry without a name or a
//! CoinMarketCap id, and two entries sharing a name (they would share a
//! report sheet) are rejected.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use snafu::{Backtrace, ResultExt, Snafu, ensure};
use tracing::debug;

use crate::{
    io::report::PRIMARY_REPORT_DIR,
    models::{currency::Currency, window::ReportWindow},
    processing::{AverageThreshold, DEFAULT_THRESHOLD, DEFAULT_WINDOW_SIZE},
    rates::DEFAULT_RETRY_BUDGET,
};

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    #[snafu(display("Failed to read {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid JSON in {}: {source}", path.display()))]
    Json {
        path: PathBuf,
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid TOML in {}: {source}", path.display()))]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("No {CONFIG_FILE_NAME} found, looked in: {}", display_paths(searched)))]
    NotFound {
        searched: Vec<PathBuf>,
        backtrace: Backtrace,
    },

    #[snafu(display("No currencies configured"))]
    Empty { backtrace: Backtrace },

    #[snafu(display("Invalid currency entry: {message}"))]
    InvalidCurrency {
        message: String,
        backtrace: Backtrace,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    pub currencies: Vec<Currency>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML, everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Parses and normalizes a currency list held in memory.
///
/// `origin` only labels parse errors.
pub fn load_config_str(
    content: &str,
    format: ConfigFormat,
    origin: &Path,
) -> Result<CurrencyConfig, ConfigError> {
    let mut config: CurrencyConfig = match format {
        ConfigFormat::Json => serde_json::from_str(content).context(JsonSnafu { path: origin })?,
        ConfigFormat::Toml => toml::from_str(content).context(TomlSnafu { path: origin })?,
    };
    normalize_config(&mut config)?;
    Ok(config)
}

pub fn load_config_path(path: &Path) -> Result<CurrencyConfig, ConfigError> {
    let content = fs::read_to_string(path).context(ReadSnafu { path })?;
    let config = load_config_str(&content, ConfigFormat::from_path(path), path)?;
    debug!(path = %path.display(), currencies = config.currencies.len(), "loaded currency config");
    Ok(config)
}

/// Trims every field and checks the list is usable.
pub fn normalize_config(config: &mut CurrencyConfig) -> Result<(), ConfigError> {
    ensure!(!config.currencies.is_empty(), EmptySnafu);

    let mut names = HashSet::new();
    for currency in &mut config.currencies {
        for field in [
            &mut currency.name,
            &mut currency.symbol,
            &mut currency.cmc,
            &mut currency.cmc_id,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }

        ensure!(
            !currency.name.is_empty(),
            InvalidCurrencySnafu {
                message: "entry without a name",
            }
        );
        ensure!(
            !currency.cmc_id.is_empty(),
            InvalidCurrencySnafu {
                message: format!("{} has no cmc_id", currency.name),
            }
        );
        ensure!(
            names.insert(currency.name.clone()),
            InvalidCurrencySnafu {
                message: format!("{} is listed twice", currency.name),
            }
        );
    }

    Ok(())
}

/// Where to look for the currency list when no path is given: next to the
/// executable, then in the working directory.
pub fn default_config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(CONFIG_FILE_NAME));
    }
    candidates
}

/// Returns `explicit` as is, or the first existing default candidate.
pub fn locate_config(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => first_existing(default_config_candidates()),
    }
}

fn first_existing(candidates: Vec<PathBuf>) -> Result<PathBuf, ConfigError> {
    match candidates.iter().find(|path| path.is_file()) {
        Some(path) => Ok(path.clone()),
        None => NotFoundSnafu {
            searched: candidates,
        }
        .fail(),
    }
}

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub window: ReportWindow,
    pub window_size: usize,
    pub threshold: AverageThreshold,
    pub rate_retries: u32,
    pub report_dir: PathBuf,
    /// Also write the rows appended by this run to a separate workbook.
    pub write_delta: bool,
    pub keep_going: bool,
}

impl RunSettings {
    pub fn new(window: ReportWindow) -> Self {
        Self {
            window,
            window_size: DEFAULT_WINDOW_SIZE,
            threshold: DEFAULT_THRESHOLD,
            rate_retries: DEFAULT_RETRY_BUDGET,
            report_dir: PathBuf::from(PRIMARY_REPORT_DIR),
            write_delta: true,
            keep_going: false,
        }
    }
}
