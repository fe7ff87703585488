//! CLI argument parsing for the towerdemo engine.
//!
//! This module handles command line argument parsing using clap and
//! provides a structured representation of CLI configuration consumed by
//! the other configuration components.

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

/// CLI configuration structure containing all parsed command line arguments
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub verbose: bool,
    pub scenario_dirs: Vec<String>,
    pub no_default_scenarios: bool,
    pub scenario: Option<String>,
    pub tour: bool,
    pub list: bool,
    pub speech_ms_per_char: u64,
    pub mute_speech: bool,
    pub presenter: bool,
}

impl CliConfig {
    /// Parse CLI arguments and create CliConfig
    pub fn from_args() -> Result<Self> {
        let matches = Self::build_cli().get_matches();
        Self::from_matches(&matches)
    }

    /// Create CliConfig from pre-parsed ArgMatches (useful for testing)
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let verbose = matches.get_flag("verbose");
        let no_default_scenarios = matches.get_flag("no-default-scenarios");
        let tour = matches.get_flag("tour");
        let list = matches.get_flag("list");
        let mute_speech = matches.get_flag("mute-speech");
        let presenter = matches.get_flag("presenter");

        let scenario = matches.get_one::<String>("scenario").cloned();

        let scenario_dirs: Vec<String> = matches
            .get_many::<String>("scenario-dir")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default();

        let speech_ms_per_char = *matches
            .get_one::<u64>("speech-rate")
            .ok_or_else(|| anyhow::anyhow!("Speech rate is required"))?;

        Ok(Self {
            verbose,
            scenario_dirs,
            no_default_scenarios,
            scenario,
            tour,
            list,
            speech_ms_per_char,
            mute_speech,
            presenter,
        })
    }

    /// Build the clap Command structure
    pub fn build_cli() -> Command {
        Command::new("towerdemo-engine")
            .version(env!("CARGO_PKG_VERSION"))
            .about("towerdemo - scripted ATC demo playback")
            .long_about(
                "Headless presenter for the towerdemo dashboard. Plays scripted, \
                 narrated air-traffic-control scenarios through the playback engine, \
                 printing each step and the simulated radio traffic as the timeline \
                 advances.",
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .action(clap::ArgAction::SetTrue)
                    .help("Enable verbose logging")
                    .long_help(
                        "Enable verbose debug logging. This will show step activations, \
                         timer arming and cancellation, and world mutations as they apply.",
                    ),
            )
            .arg(
                Arg::new("scenario-dir")
                    .long("scenario-dir")
                    .value_name("DIRECTORY")
                    .action(clap::ArgAction::Append)
                    .help("Additional directory to load scenario files from")
                    .long_help(
                        "Additional directory to scan for .json5 scenario files. \
                         Can be specified multiple times. Directories are scanned in order \
                         with later ones taking priority (can override scenarios with same ID). \
                         Default directories: /usr/share/towerdemo/scenarios, \
                         ~/.config/towerdemo/scenarios, ./scenarios",
                    ),
            )
            .arg(
                Arg::new("no-default-scenarios")
                    .long("no-default-scenarios")
                    .action(clap::ArgAction::SetTrue)
                    .help("Disable loading scenarios from default directories")
                    .long_help(
                        "Disable automatic loading of scenarios from default directories. \
                         Only scenarios from explicitly specified --scenario-dir will be \
                         loaded, on top of the built-in set.",
                    ),
            )
            .arg(
                Arg::new("scenario")
                    .short('s')
                    .long("scenario")
                    .value_name("ID")
                    .help("Play a single scenario by id")
                    .conflicts_with("tour"),
            )
            .arg(
                Arg::new("tour")
                    .short('t')
                    .long("tour")
                    .action(clap::ArgAction::SetTrue)
                    .help("Play every catalog scenario end-to-end (the default)"),
            )
            .arg(
                Arg::new("list")
                    .short('l')
                    .long("list")
                    .action(clap::ArgAction::SetTrue)
                    .help("List available scenarios and exit"),
            )
            .arg(
                Arg::new("speech-rate")
                    .long("speech-rate")
                    .value_name("MS_PER_CHAR")
                    .value_parser(clap::value_parser!(u64))
                    .default_value("30")
                    .help("Simulated narration speed, milliseconds per character")
                    .long_help(
                        "Simulated narration speed in milliseconds per character of spoken \
                         text. Lower is faster. Only affects the built-in speech simulator.",
                    ),
            )
            .arg(
                Arg::new("mute-speech")
                    .long("mute-speech")
                    .action(clap::ArgAction::SetTrue)
                    .help("Simulate a broken speech system that never signals completion")
                    .long_help(
                        "Simulate a speech system that never delivers completion callbacks. \
                         The timeline still advances at each step's safety timeout, which is \
                         the point: the show goes on.",
                    ),
            )
            .arg(
                Arg::new("presenter")
                    .long("presenter")
                    .action(clap::ArgAction::SetTrue)
                    .help("Start with presenter mode enabled"),
            )
    }

    /// Validate CLI configuration
    pub fn validate(&self) -> Result<()> {
        if self.speech_ms_per_char == 0 {
            return Err(anyhow::anyhow!(
                "Speech rate must be greater than 0 ms per character"
            ));
        }

        if let Some(id) = &self.scenario {
            if id.is_empty() {
                return Err(anyhow::anyhow!("Scenario id cannot be empty"));
            }
        }

        Ok(())
    }
}
