use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::traffic::resolver::{NameResolver, NumericResolver, StaticResolver};
use crate::traffic::{CaptureMode, Settings};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Timeouts and windows driving aggregation and eviction. A zero timeout
/// disables that tier.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "default_mode")]
    pub mode: CaptureMode,
    #[serde(
        rename = "averaging_time_ms",
        default = "default_averaging_time",
        deserialize_with = "millis_deserialize"
    )]
    pub averaging_time: Duration,
    #[serde(
        rename = "node_timeout_ms",
        default = "default_node_timeout",
        deserialize_with = "millis_deserialize"
    )]
    pub node_timeout: Duration,
    #[serde(
        rename = "link_timeout_ms",
        default = "default_link_timeout",
        deserialize_with = "millis_deserialize"
    )]
    pub link_timeout: Duration,
    #[serde(
        rename = "proto_node_timeout_ms",
        default = "default_proto_node_timeout",
        deserialize_with = "millis_deserialize"
    )]
    pub proto_node_timeout: Duration,
    #[serde(
        rename = "proto_timeout_ms",
        default = "default_proto_timeout",
        deserialize_with = "millis_deserialize"
    )]
    pub proto_timeout: Duration,
    #[serde(
        rename = "refresh_period_ms",
        default = "default_refresh_period",
        deserialize_with = "millis_deserialize"
    )]
    pub refresh_period: Duration,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ReportConfig {
    #[serde(
        rename = "interval_ms",
        default = "default_report_interval",
        deserialize_with = "millis_deserialize"
    )]
    pub interval: Duration,
    #[serde(default)]
    pub export: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Display names for nodes. Without a hosts file nodes keep numeric names.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ResolverConfig {
    #[serde(default)]
    pub hosts: Option<PathBuf>,
}

fn default_mode() -> CaptureMode {
    CaptureMode::Ip
}
fn default_averaging_time() -> Duration {
    Settings::AVERAGING_TIME
}
fn default_node_timeout() -> Duration {
    Settings::NODE_TIMEOUT
}
fn default_link_timeout() -> Duration {
    Settings::LINK_TIMEOUT
}
fn default_proto_node_timeout() -> Duration {
    Settings::PROTO_NODE_TIMEOUT
}
fn default_proto_timeout() -> Duration {
    Settings::PROTO_TIMEOUT
}
fn default_refresh_period() -> Duration {
    Settings::REFRESH_PERIOD
}
fn default_report_interval() -> Duration {
    Duration::ZERO
}
fn default_log_level() -> String {
    String::from("info")
}

fn millis_deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            mode: default_mode(),
            averaging_time: default_averaging_time(),
            node_timeout: default_node_timeout(),
            link_timeout: default_link_timeout(),
            proto_node_timeout: default_proto_node_timeout(),
            proto_timeout: default_proto_timeout(),
            refresh_period: default_refresh_period(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            interval: default_report_interval(),
            export: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            file: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.averaging_time.is_zero() {
            anyhow::bail!("averaging_time_ms must be greater than zero");
        }
        if self.engine.refresh_period.is_zero() {
            anyhow::bail!("refresh_period_ms must be greater than zero");
        }
        self.logging
            .level
            .parse::<log::LevelFilter>()
            .with_context(|| format!("Invalid log level: {}", self.logging.level))?;
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// JSON-lines packet event feed; stdin when omitted
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Node identity: link, ip or tcp
    #[arg(long)]
    pub mode: Option<CaptureMode>,

    /// Where snapshots are written; stdout when omitted
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// `address name` file naming known nodes
    #[arg(long)]
    pub hosts: Option<PathBuf>,

    /// Drive eviction from packet timestamps instead of the wall clock
    #[arg(long)]
    pub replay: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn load_config(cli_args: &CliArgs) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if Path::new(&cli_args.config).exists() {
        let contents = fs::read_to_string(&cli_args.config)
            .with_context(|| format!("Failed to read config file {}", cli_args.config))?;
        config = AppConfig::from_toml(&contents)?;
    }

    if let Some(mode) = cli_args.mode {
        config.engine.mode = mode;
    }

    if let Some(export) = &cli_args.export {
        config.report.export = Some(export.clone());
    }

    if let Some(hosts) = &cli_args.hosts {
        config.resolver.hosts = Some(hosts.clone());
    }

    if cli_args.verbose {
        config.logging.level = String::from("debug");
    }

    Ok(config)
}

/// Builds the name resolver: a static table when a hosts file is set,
/// numeric names otherwise.
pub fn load_resolver(config: &ResolverConfig) -> Result<Box<dyn NameResolver>> {
    match &config.hosts {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read hosts file {}", path.display()))?;
            Ok(Box::new(StaticResolver::from_lines(&contents)))
        }
        None => Ok(Box::new(NumericResolver)),
    }
}
