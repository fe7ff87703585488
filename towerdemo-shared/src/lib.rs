//! Shared types for the towerdemo playback engine.
//!
//! This crate contains the data structures shared between the playback
//! engine and its collaborators: the scenario model, the opaque world-state
//! overlay, the discrete UI actions the engine consumes, and the read-only
//! views it exposes (snapshots, speech cues, command-log entries).
//!
//! # Key Components
//!
//! * [`scenario`] - Scenario/Step/Event definitions and authoring validation
//! * [`world`] - World-state overlay and mutation application
//! * [`scenario_json`] - JSON5 scenario-file parsing with duration strings
//! * [`PlaybackAction`] - Discrete actions from the UI layer
//! * [`PlaybackSnapshot`] - Read-only view for the rendering layer
//! * [`SpeechCue`] / [`CommandLogEntry`] - Collaborator boundary messages
//!
//! # Collaboration pattern
//!
//! ```text
//! UI layer                         Engine                       Speech
//!    │ ── PlaybackAction ────────► │                              │
//!    │ ◄─── PlaybackSnapshot ───── │ ── SpeechCue ──────────────► │
//!    │                             │ ◄── narration/command done ─ │
//!    │                             │ ── CommandLogEntry ──► command log
//! ```

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod scenario;
pub mod scenario_json;
pub mod world;

use scenario::{InteractionRequirement, ScenarioId};
use world::WorldState;

/// Top-level mode of the playback dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    #[default]
    Menu,
    Playing,
    Paused,
    Completed,
}

/// Discrete actions consumed from the user/UI layer.
///
/// The engine never fails an action; anything that does not apply in the
/// current mode is a logged no-op so the presentation cannot crash mid-show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlaybackAction {
    OpenMenu,
    StartScenario { id: ScenarioId },
    StartTour,
    NextStep,
    PrevStep,
    Pause,
    Resume,
    TogglePresenterMode,
    CompleteInteraction,
    Close,
}

/// Read-only view of the playback state, recomputed after every transition
/// and handed to the rendering layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub mode: PlaybackMode,
    pub current_scenario_title: Option<String>,
    pub current_step_index: usize,
    pub total_steps: usize,
    pub progress_percent: f32,
    pub narrative_text: Option<String>,
    pub atc_command_text: Option<String>,
    pub pending_interaction: Option<InteractionRequirement>,
    pub spotlight_target: Option<String>,
    pub presenter_mode: bool,
    pub world_state: WorldState,
}

/// One step's worth of speech, handed to the narration collaborator when a
/// step activates.
///
/// The `generation` token must be echoed back on the completion callbacks;
/// a completion carrying a stale token is dropped, so a slow speech system
/// can never satisfy a later step's wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechCue {
    pub generation: u64,
    pub narrative_text: String,
    pub atc_command_text: Option<String>,
}

/// Rough classification of an ATC command, derived from its leading verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Descend,
    Climb,
    Turn,
    Cleared,
    Hold,
    Contact,
    Instruction,
}

/// Entry published to the command-log collaborator whenever a step's ATC
/// command finishes speaking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub callsign: String,
    pub command: String,
    pub kind: CommandKind,
}

impl CommandLogEntry {
    /// Split a spoken command into callsign and instruction.
    ///
    /// Radio phraseology leads with the callsign ("Speedbird 117, descend
    /// and maintain..."), so everything before the first comma is treated as
    /// the callsign. Commands without a comma get an empty callsign rather
    /// than a guess.
    pub fn from_command_text(text: &str) -> Self {
        let (callsign, command) = match text.split_once(',') {
            Some((callsign, rest)) => (callsign.trim().to_string(), rest.trim().to_string()),
            None => (String::new(), text.trim().to_string()),
        };

        let kind = classify_command(&command);

        Self {
            callsign,
            command,
            kind,
        }
    }
}

fn classify_command(command: &str) -> CommandKind {
    let lowered = command.to_ascii_lowercase();
    let keyword_kinds = [
        ("descend", CommandKind::Descend),
        ("climb", CommandKind::Climb),
        ("turn", CommandKind::Turn),
        ("cleared", CommandKind::Cleared),
        ("hold", CommandKind::Hold),
        ("contact", CommandKind::Contact),
    ];

    keyword_kinds
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, kind)| *kind)
        .unwrap_or(CommandKind::Instruction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_log_entry_splits_callsign() {
        let entry =
            CommandLogEntry::from_command_text("Speedbird 117, descend and maintain flight level 240");

        assert_eq!(entry.callsign, "Speedbird 117");
        assert_eq!(entry.command, "descend and maintain flight level 240");
        assert_eq!(entry.kind, CommandKind::Descend);
    }

    #[test]
    fn test_command_log_entry_without_callsign() {
        let entry = CommandLogEntry::from_command_text("hold position");

        assert_eq!(entry.callsign, "");
        assert_eq!(entry.kind, CommandKind::Hold);
    }

    #[test]
    fn test_command_classification_defaults_to_instruction() {
        let entry = CommandLogEntry::from_command_text("Cactus 1549, say souls on board");
        assert_eq!(entry.kind, CommandKind::Instruction);

        let cleared = CommandLogEntry::from_command_text("Delta 42, cleared to land runway 27");
        assert_eq!(cleared.kind, CommandKind::Cleared);
    }

    #[test]
    fn test_playback_action_serialization() {
        let action = PlaybackAction::StartScenario {
            id: "emergency-landing".to_string(),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("start_scenario"));

        let parsed: PlaybackAction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, action);
    }

    #[test]
    fn test_snapshot_default_is_menu() {
        let snapshot = PlaybackSnapshot::default();
        assert_eq!(snapshot.mode, PlaybackMode::Menu);
        assert!(snapshot.current_scenario_title.is_none());
        assert_eq!(snapshot.total_steps, 0);
    }
}
