//! Application configuration management for the towerdemo engine.
//!
//! This module handles application-specific configuration including
//! logging, scenario sources, and playback behavior for the headless
//! presenter.

use anyhow::Result;
use std::env;

use super::cli::CliConfig;

/// Log level enumeration
#[derive(Debug, Clone, PartialEq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// What the presenter binary should play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSelection {
    /// Single scenario by id
    Scenario(String),
    /// Whole catalog end-to-end
    Tour,
    /// Print the catalog and exit
    List,
}

/// Application configuration structure
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: LogLevel,
    pub scenario_dirs: Vec<String>,
    pub no_default_scenarios: bool,
    pub selection: PlaybackSelection,
    pub speech_ms_per_char: u64,
    pub mute_speech: bool,
    pub presenter: bool,
}

impl AppConfig {
    /// Create application configuration from CLI config
    pub fn from_cli(cli_config: &CliConfig) -> Result<Self> {
        let log_level = if cli_config.verbose {
            LogLevel::Debug
        } else {
            // Check environment variable
            match env::var("RUST_LOG") {
                Ok(level_str) => Self::parse_log_level(&level_str),
                Err(_) => LogLevel::Info, // Default
            }
        };

        let selection = if cli_config.list {
            PlaybackSelection::List
        } else if let Some(id) = &cli_config.scenario {
            PlaybackSelection::Scenario(id.clone())
        } else {
            // --tour or nothing: the tour is the default show
            PlaybackSelection::Tour
        };

        Ok(Self {
            log_level,
            scenario_dirs: cli_config.scenario_dirs.clone(),
            no_default_scenarios: cli_config.no_default_scenarios,
            selection,
            speech_ms_per_char: cli_config.speech_ms_per_char,
            mute_speech: cli_config.mute_speech,
            presenter: cli_config.presenter,
        })
    }

    /// Parse log level from string
    fn parse_log_level(level_str: &str) -> LogLevel {
        // Extract the main log level from complex RUST_LOG format
        let main_level = level_str
            .split(',')
            .next()
            .unwrap_or(level_str)
            .split('=')
            .next()
            .unwrap_or(level_str)
            .to_lowercase();

        match main_level.as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info, // Default fallback
        }
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> Result<()> {
        let log_filter = match env::var("RUST_LOG") {
            Ok(existing) if !existing.is_empty() && self.log_level != LogLevel::Debug => existing,
            _ => self.log_level.to_filter_string().to_string(),
        };

        tracing_subscriber::fmt()
            .with_env_filter(log_filter)
            .with_target(false)
            .with_level(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init();

        tracing::info!("Logging initialized with level: {:?}", self.log_level);
        Ok(())
    }

    /// Validate application configuration
    pub fn validate(&self) -> Result<()> {
        if self.speech_ms_per_char == 0 {
            return Err(anyhow::anyhow!(
                "Speech rate must be greater than 0 ms per character"
            ));
        }

        if let PlaybackSelection::Scenario(id) = &self.selection {
            if id.is_empty() {
                return Err(anyhow::anyhow!("Scenario id cannot be empty"));
            }
        }

        Ok(())
    }
}
