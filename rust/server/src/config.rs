use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV: &str = "DEALER_CONFIG";

/// Command-line overrides. Every flag is optional; unset flags leave the
/// value from the file, the environment or the defaults untouched.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "dealer", about = "Continuous Texas Hold'em dealer for remote bots")]
pub struct CliArgs {
    /// TOML configuration file (also read from DEALER_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long, short)]
    pub port: Option<u16>,
    /// Pause between two tournaments of a running game
    #[arg(long)]
    pub tournament_interval_ms: Option<u64>,
    /// Pause between two rounds of a tournament
    #[arg(long)]
    pub round_delay_ms: Option<u64>,
    /// Pause between two streets of a round
    #[arg(long)]
    pub step_delay_ms: Option<u64>,
    /// Connect and read timeout for a single bet request
    #[arg(long)]
    pub player_timeout_ms: Option<u64>,
    /// Append a JSON line per played hand to this file
    #[arg(long)]
    pub hand_log: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DealerConfig {
    pub host: String,
    pub port: u16,
    pub tournament_interval: Duration,
    pub round_delay: Duration,
    pub step_delay: Duration,
    pub max_teams: usize,
    pub tournament_history: usize,
    pub log_capacity: usize,
    pub player_timeout: Duration,
    pub hand_log_path: Option<PathBuf>,
}

impl Default for DealerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            tournament_interval: Duration::from_secs(1),
            round_delay: Duration::from_millis(200),
            step_delay: Duration::from_millis(100),
            max_teams: 10,
            tournament_history: 5,
            log_capacity: 10_000,
            player_timeout: Duration::from_secs(1),
            hand_log_path: None,
        }
    }
}

impl DealerConfig {
    /// Fast settings for tests: no pacing, short timeouts, ephemeral port.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            tournament_interval: Duration::from_millis(10),
            round_delay: Duration::ZERO,
            step_delay: Duration::ZERO,
            player_timeout: Duration::from_millis(500),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be greater than 0".into()));
        }
        if self.player_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "player_timeout must be greater than 0".into(),
            ));
        }
        if self.max_teams < 2 {
            return Err(ConfigError::Invalid("max_teams must be at least 2".into()));
        }
        if self.tournament_history == 0 {
            return Err(ConfigError::Invalid(
                "tournament_history must be greater than 0".into(),
            ));
        }
        if self.log_capacity == 0 {
            return Err(ConfigError::Invalid(
                "log_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    File,
    Env,
    Cli,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigSources {
    pub host: ValueSource,
    pub port: ValueSource,
    pub tournament_interval: ValueSource,
    pub round_delay: ValueSource,
    pub step_delay: ValueSource,
    pub max_teams: ValueSource,
    pub tournament_history: ValueSource,
    pub log_capacity: ValueSource,
    pub player_timeout: ValueSource,
    pub hand_log_path: ValueSource,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            host: ValueSource::Default,
            port: ValueSource::Default,
            tournament_interval: ValueSource::Default,
            round_delay: ValueSource::Default,
            step_delay: ValueSource::Default,
            max_teams: ValueSource::Default,
            tournament_history: ValueSource::Default,
            log_capacity: ValueSource::Default,
            player_timeout: ValueSource::Default,
            hand_log_path: ValueSource::Default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigResolved {
    pub config: DealerConfig,
    pub sources: ConfigSources,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    tournament_interval_ms: Option<u64>,
    round_delay_ms: Option<u64>,
    step_delay_ms: Option<u64>,
    max_teams: Option<usize>,
    tournament_history: Option<usize>,
    log_capacity: Option<usize>,
    player_timeout_ms: Option<u64>,
    hand_log: Option<PathBuf>,
}

/// Resolves the configuration: defaults, then the TOML file, then
/// `DEALER_*` environment variables, then command-line flags. The result is
/// validated.
pub fn load_with_sources(args: &CliArgs) -> Result<ConfigResolved, ConfigError> {
    let mut cfg = DealerConfig::default();
    let mut sources = ConfigSources::default();

    let path = args
        .config
        .clone()
        .or_else(|| env_value(CONFIG_ENV).map(PathBuf::from));
    if let Some(path) = path {
        apply_file(&mut cfg, &mut sources, &read_file(&path)?);
    }
    apply_env(&mut cfg, &mut sources)?;
    apply_cli(&mut cfg, &mut sources, args);

    cfg.validate()?;
    Ok(ConfigResolved {
        config: cfg,
        sources,
    })
}

pub fn load(args: &CliArgs) -> Result<DealerConfig, ConfigError> {
    load_with_sources(args).map(|resolved| resolved.config)
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&raw)?)
}

fn apply_file(cfg: &mut DealerConfig, sources: &mut ConfigSources, file: &FileConfig) {
    if let Some(v) = &file.host {
        cfg.host = v.clone();
        sources.host = ValueSource::File;
    }
    if let Some(v) = file.port {
        cfg.port = v;
        sources.port = ValueSource::File;
    }
    if let Some(v) = file.tournament_interval_ms {
        cfg.tournament_interval = Duration::from_millis(v);
        sources.tournament_interval = ValueSource::File;
    }
    if let Some(v) = file.round_delay_ms {
        cfg.round_delay = Duration::from_millis(v);
        sources.round_delay = ValueSource::File;
    }
    if let Some(v) = file.step_delay_ms {
        cfg.step_delay = Duration::from_millis(v);
        sources.step_delay = ValueSource::File;
    }
    if let Some(v) = file.max_teams {
        cfg.max_teams = v;
        sources.max_teams = ValueSource::File;
    }
    if let Some(v) = file.tournament_history {
        cfg.tournament_history = v;
        sources.tournament_history = ValueSource::File;
    }
    if let Some(v) = file.log_capacity {
        cfg.log_capacity = v;
        sources.log_capacity = ValueSource::File;
    }
    if let Some(v) = file.player_timeout_ms {
        cfg.player_timeout = Duration::from_millis(v);
        sources.player_timeout = ValueSource::File;
    }
    if let Some(v) = &file.hand_log {
        cfg.hand_log_path = Some(v.clone());
        sources.hand_log_path = ValueSource::File;
    }
}

fn apply_env(cfg: &mut DealerConfig, sources: &mut ConfigSources) -> Result<(), ConfigError> {
    if let Some(host) = env_value("DEALER_HOST") {
        cfg.host = host;
        sources.host = ValueSource::Env;
    }
    if let Some(port) = env_value("DEALER_PORT") {
        cfg.port = parse_env("DEALER_PORT", &port)?;
        sources.port = ValueSource::Env;
    }
    if let Some(ms) = env_value("DEALER_TOURNAMENT_INTERVAL_MS") {
        cfg.tournament_interval = parse_millis("DEALER_TOURNAMENT_INTERVAL_MS", &ms)?;
        sources.tournament_interval = ValueSource::Env;
    }
    if let Some(ms) = env_value("DEALER_ROUND_DELAY_MS") {
        cfg.round_delay = parse_millis("DEALER_ROUND_DELAY_MS", &ms)?;
        sources.round_delay = ValueSource::Env;
    }
    if let Some(ms) = env_value("DEALER_STEP_DELAY_MS") {
        cfg.step_delay = parse_millis("DEALER_STEP_DELAY_MS", &ms)?;
        sources.step_delay = ValueSource::Env;
    }
    if let Some(ms) = env_value("DEALER_PLAYER_TIMEOUT_MS") {
        cfg.player_timeout = parse_millis("DEALER_PLAYER_TIMEOUT_MS", &ms)?;
        sources.player_timeout = ValueSource::Env;
    }
    if let Some(path) = env_value("DEALER_HAND_LOG") {
        cfg.hand_log_path = Some(PathBuf::from(path));
        sources.hand_log_path = ValueSource::Env;
    }
    Ok(())
}

fn apply_cli(cfg: &mut DealerConfig, sources: &mut ConfigSources, args: &CliArgs) {
    if let Some(v) = &args.host {
        cfg.host = v.clone();
        sources.host = ValueSource::Cli;
    }
    if let Some(v) = args.port {
        cfg.port = v;
        sources.port = ValueSource::Cli;
    }
    if let Some(v) = args.tournament_interval_ms {
        cfg.tournament_interval = Duration::from_millis(v);
        sources.tournament_interval = ValueSource::Cli;
    }
    if let Some(v) = args.round_delay_ms {
        cfg.round_delay = Duration::from_millis(v);
        sources.round_delay = ValueSource::Cli;
    }
    if let Some(v) = args.step_delay_ms {
        cfg.step_delay = Duration::from_millis(v);
        sources.step_delay = ValueSource::Cli;
    }
    if let Some(v) = args.player_timeout_ms {
        cfg.player_timeout = Duration::from_millis(v);
        sources.player_timeout = ValueSource::Cli;
    }
    if let Some(v) = &args.hand_log {
        cfg.hand_log_path = Some(v.clone());
        sources.hand_log_path = ValueSource::Cli;
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key} has an invalid value: {raw}")))
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    parse_env::<u64>(key, raw).map(Duration::from_millis)
}
