//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::warn;

use crate::purge::CacheEndpoint;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "refolo";
const DEFAULT_VARNISH_HOST: &str = "127.0.0.1";
const DEFAULT_TIMEOUT_SECS: u64 = 1;

/// Command-line arguments for the refolo binary.
#[derive(Debug, Parser)]
#[command(name = "refolo", version, about = "Varnish cache purge companion")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "REFOLO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Purge the given URLs from the Varnish cache.
    Purge(PurgeArgs),
    /// Purge the standard URL set for one content change.
    Bust(BustArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PurgeArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// URLs to purge, as the public site sees them.
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct BustArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Canonical URL of the changed content.
    #[arg(long, value_name = "URL")]
    pub content: String,

    /// The site's home URL; a bare domain is normalized to the root path.
    #[arg(long, value_name = "URL")]
    pub home: Option<String>,

    /// Syndication feed URL; may be given multiple times.
    #[arg(long = "feed", value_name = "URL")]
    pub feeds: Vec<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the Varnish host.
    #[arg(long = "varnish-host", value_name = "HOST")]
    pub varnish_host: Option<String>,

    /// Override the Varnish port.
    #[arg(long = "varnish-port", value_name = "PORT")]
    pub varnish_port: Option<u16>,

    /// Override the per-purge timeout.
    #[arg(long = "timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub varnish: VarnishSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct VarnishSettings {
    pub endpoint: CacheEndpoint,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse the command line and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("REFOLO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Purge(args) => raw.apply_overrides(&args.overrides),
        Command::Bust(args) => raw.apply_overrides(&args.overrides),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    varnish: RawVarnishSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawVarnishSettings {
    host: Option<String>,
    port: Option<u16>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = overrides.varnish_host.as_ref() {
            self.varnish.host = Some(host.clone());
        }
        if let Some(port) = overrides.varnish_port {
            self.varnish.port = Some(port);
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.varnish.timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { varnish, logging } = raw;

        Ok(Self {
            varnish: build_varnish_settings(varnish)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_varnish_settings(varnish: RawVarnishSettings) -> Result<VarnishSettings, LoadError> {
    // An explicitly empty host must never be purged against.
    let host = match varnish.host {
        Some(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                return Err(LoadError::invalid("varnish.host", "host must not be empty"));
            }
            trimmed
        }
        None => DEFAULT_VARNISH_HOST.to_string(),
    };

    if varnish.port == Some(0) {
        return Err(LoadError::invalid(
            "varnish.port",
            "port must be greater than zero",
        ));
    }

    let timeout_seconds = match varnish.timeout_seconds {
        Some(0) => {
            warn!(
                fallback = DEFAULT_TIMEOUT_SECS,
                "varnish.timeout_seconds is zero; using the default"
            );
            DEFAULT_TIMEOUT_SECS
        }
        Some(seconds) => seconds,
        None => DEFAULT_TIMEOUT_SECS,
    };

    Ok(VarnishSettings {
        endpoint: CacheEndpoint::new(host, varnish.port),
        timeout: Duration::from_secs(timeout_seconds),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}
