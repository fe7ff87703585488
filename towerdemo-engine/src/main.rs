//! Headless presenter for the towerdemo playback engine.
//!
//! Builds the scenario catalog, starts the engine with a simulated speech
//! collaborator, and prints each step of the show as the timeline advances.

use std::path::PathBuf;

use anyhow::Result;
use tokio::time::{Duration, sleep};
use tracing::{debug, info};

use towerdemo_engine::catalog::{BuiltinScenarios, ScenarioCatalog, ScenarioLoader};
use towerdemo_engine::config::{ConfigManager, PlaybackSelection};
use towerdemo_engine::playback::{PlaybackEngine, PlaybackHandle};
use towerdemo_engine::speech::{SpeechProfile, spawn_simulator};
use towerdemo_shared::PlaybackMode;
use towerdemo_shared::errors::DemoError;

/// How long the headless presenter "thinks" before acknowledging an
/// interaction gate on the audience's behalf.
const AUTO_INTERACTION_DELAY: Duration = Duration::from_millis(1500);

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigManager::from_cli_and_env()?;
    config.validate()?;
    config.init_logging()?;

    let catalog = build_catalog(&config);
    if catalog.is_empty() {
        return Err(DemoError::Config {
            message: "scenario catalog is empty".to_string(),
        }
        .into());
    }

    if config.app.selection == PlaybackSelection::List {
        print_catalog(&catalog);
        return Ok(());
    }

    let (handle, outputs) = PlaybackEngine::spawn(catalog.clone());

    let profile = SpeechProfile {
        ms_per_char: config.app.speech_ms_per_char,
        mute: config.app.mute_speech,
        ..SpeechProfile::default()
    };
    spawn_simulator(handle.clone(), outputs.speech_cues, profile);

    // Command-log collaborator: print spoken commands as a radio log.
    let mut command_log = outputs.command_log;
    tokio::spawn(async move {
        while let Some(entry) = command_log.recv().await {
            println!("    radio | {} :: {} [{:?}]", entry.callsign, entry.command, entry.kind);
        }
    });

    if config.app.presenter {
        handle.toggle_presenter_mode();
    }

    match &config.app.selection {
        PlaybackSelection::Scenario(id) => {
            if catalog.get(id).is_none() {
                return Err(DemoError::UnknownScenario { id: id.clone() }.into());
            }
            info!("Playing scenario '{}'", id);
            handle.start_scenario(id.clone());
        }
        PlaybackSelection::Tour | PlaybackSelection::List => {
            info!("Playing the full catalog tour");
            handle.start_tour();
        }
    }

    run_presenter(handle).await;
    Ok(())
}

fn build_catalog(config: &ConfigManager) -> ScenarioCatalog {
    let mut loader = if config.app.no_default_scenarios {
        ScenarioLoader::empty()
    } else {
        ScenarioLoader::new()
    };
    for dir in &config.app.scenario_dirs {
        loader.add_directory(PathBuf::from(dir));
    }

    ScenarioCatalog::assemble(&BuiltinScenarios::new(), &loader)
}

fn print_catalog(catalog: &ScenarioCatalog) {
    println!("Available scenarios:");
    for scenario in catalog.iter() {
        println!(
            "  {:24} {} ({} steps, >= {}s)",
            scenario.id,
            scenario.title,
            scenario.steps.len(),
            scenario.estimated_min_duration_ms() / 1000,
        );
    }
}

/// Follow snapshots until the show completes, printing step transitions
/// and auto-acknowledging interaction gates after a short pause.
async fn run_presenter(handle: PlaybackHandle) {
    let mut snapshots = handle.snapshot();
    let mut last_printed: Option<(String, usize)> = None;

    loop {
        {
            let snapshot = snapshots.borrow_and_update().clone();

            match snapshot.mode {
                PlaybackMode::Completed => {
                    println!("\n=== demo complete ===");
                    return;
                }
                PlaybackMode::Playing => {
                    let title = snapshot.current_scenario_title.clone().unwrap_or_default();
                    let key = (title.clone(), snapshot.current_step_index);

                    if last_printed.as_ref() != Some(&key) {
                        last_printed = Some(key);

                        println!(
                            "\n[{}] step {}/{} ({:.0}%)",
                            title,
                            snapshot.current_step_index + 1,
                            snapshot.total_steps,
                            snapshot.progress_percent,
                        );
                        if let Some(narrative) = &snapshot.narrative_text {
                            println!("    {}", narrative);
                        }
                        if let Some(target) = &snapshot.spotlight_target {
                            debug!("spotlight on {}", target);
                        }

                        if let Some(interaction) = &snapshot.pending_interaction {
                            println!(
                                "    >>> waiting for interaction: {} ({})",
                                interaction.hint, interaction.target_id
                            );
                            let handle = handle.clone();
                            tokio::spawn(async move {
                                sleep(AUTO_INTERACTION_DELAY).await;
                                handle.complete_interaction();
                                handle.next_step();
                            });
                        }
                    }
                }
                PlaybackMode::Menu | PlaybackMode::Paused => {}
            }
        }

        if snapshots.changed().await.is_err() {
            return;
        }
    }
}
