use crate::select::Selector;
use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_CLIPPINGS_PATH: &str = "My Clippings.txt";
const DEFAULT_NOTES_DIRECTORY: &str = "notes";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(name = "kindle-notes")]
#[command(about = "Merge Kindle clippings into per-book Markdown notes")]
pub struct CliArgs {
    /// Path to the Kindle "My Clippings.txt" export
    #[arg(short, long)]
    pub clippings: Option<String>,

    /// Notes directory, relative to the home directory
    #[arg(short, long)]
    pub notes_directory: Option<String>,

    /// TOML config file (defaults to ./config.toml when present)
    #[arg(long)]
    pub config: Option<String>,

    /// Only export books whose title contains this text (case-insensitive)
    #[arg(short, long)]
    pub book: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Only export highlights added in the last N days (mutually exclusive with --from/--to)
    #[arg(short, long)]
    pub last: Option<u32>,

    /// List books and highlight counts without exporting
    #[arg(long)]
    pub list: bool,
}

/// Values read from the TOML config file.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    pub notes_directory: Option<String>,
    pub clippings_path: Option<String>,
}

/// Where exported notes live: `home_dir/notes_directory`.
#[derive(Debug, Clone, PartialEq)]
pub struct NotesConfig {
    pub home_dir: PathBuf,
    pub notes_directory: String,
}

impl NotesConfig {
    pub fn notes_root(&self) -> PathBuf {
        self.home_dir.join(&self.notes_directory)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub clippings_path: PathBuf,
    pub notes: NotesConfig,
    pub selector: Selector,
    pub list_only: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid date format: '{0}'. Expected YYYY-MM-DD")]
    InvalidDateFormat(String),
    #[error("Invalid date range: --from must be before or equal to --to")]
    InvalidDateRange,
    #[error("Use --from/--to OR --last, not both")]
    MutuallyExclusiveFlags,
    #[error("Use --from together with --to")]
    MissingFromDate,
    #[error("--last {0} reaches before the earliest supported date")]
    LastOutOfRange(u32),
    #[error("Could not determine the home directory")]
    MissingHomeDirectory,
    #[error("Could not read config file {}: {source}", path.display())]
    ReadConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {}: {source}", path.display())]
    InvalidConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let cli = CliArgs::parse();
        let file = load_file_config(cli.config.clone())?;
        Self::from_args(cli, file, dirs::home_dir(), Local::now().date_naive())
    }

    fn from_args(
        cli: CliArgs,
        file: FileConfig,
        home_dir: Option<PathBuf>,
        today: NaiveDate,
    ) -> Result<Self, ConfigError> {
        let date_range = resolve_dates(&cli, today)?;
        let home_dir = home_dir.ok_or(ConfigError::MissingHomeDirectory)?;

        let clippings_path = cli
            .clippings
            .or_else(|| std::env::var("CLIPPINGS_PATH").ok())
            .or(file.clippings_path)
            .unwrap_or_else(|| DEFAULT_CLIPPINGS_PATH.to_string());

        let notes_directory = cli
            .notes_directory
            .or_else(|| std::env::var("NOTES_DIRECTORY").ok())
            .or(file.notes_directory)
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| DEFAULT_NOTES_DIRECTORY.to_string());

        Ok(Config {
            clippings_path: PathBuf::from(clippings_path),
            notes: NotesConfig {
                home_dir,
                notes_directory,
            },
            selector: Selector {
                book: cli.book,
                date_range,
            },
            list_only: cli.list,
        })
    }
}

/// An explicitly requested config file must exist; the default one is optional.
fn load_file_config(explicit: Option<String>) -> Result<FileConfig, ConfigError> {
    let explicit = explicit.or_else(|| std::env::var("CONFIG_PATH").ok());
    let required = explicit.is_some();
    let path = PathBuf::from(explicit.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()));

    if !required && !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadConfigFile {
        path: path.clone(),
        source,
    })?;

    parse_file_config(&content, &path)
}

fn parse_file_config(content: &str, path: &Path) -> Result<FileConfig, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::InvalidConfigFile {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_dates(cli: &CliArgs, today: NaiveDate) -> Result<Option<(NaiveDate, NaiveDate)>, ConfigError> {
    let has_from_to = cli.from.is_some() || cli.to.is_some();
    let has_last = cli.last.is_some();

    if has_from_to && has_last {
        return Err(ConfigError::MutuallyExclusiveFlags);
    }

    if let Some(days) = cli.last {
        return compute_last_n_days(today, days).map(Some);
    }

    if cli.to.is_some() && cli.from.is_none() {
        return Err(ConfigError::MissingFromDate);
    }

    if let Some(ref from_str) = cli.from {
        let from = parse_date(from_str)?;
        let to = match &cli.to {
            Some(to_str) => parse_date(to_str)?,
            None => today,
        };

        if from > to {
            return Err(ConfigError::InvalidDateRange);
        }

        return Ok(Some((from, to)));
    }

    // No filter: export every highlight
    Ok(None)
}

fn parse_date(s: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ConfigError::InvalidDateFormat(s.to_string()))
}

fn compute_last_n_days(today: NaiveDate, days: u32) -> Result<(NaiveDate, NaiveDate), ConfigError> {
    let from = today
        .checked_sub_days(Days::new(days.into()))
        .ok_or(ConfigError::LastOutOfRange(days))?;
    Ok((from, today))
}
