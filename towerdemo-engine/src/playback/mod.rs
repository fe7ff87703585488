//! Scenario playback: state machine, timing coordination and pacing.
//!
//! [`state`] holds the pure transition function; [`engine`] is the
//! imperative shell that owns timers and collaborator channels; the other
//! modules are the pieces the shell coordinates.

pub mod engine;
pub mod events;
pub mod pacing;
pub mod session;
pub mod state;

pub use engine::{EngineOutputs, PlaybackEngine, PlaybackHandle};
pub use pacing::{PacingCalculator, PacingConfig, RegexClassifier, Speaker, SpeechClassifier};
pub use state::{PlaybackState, snapshot_of, transition};
