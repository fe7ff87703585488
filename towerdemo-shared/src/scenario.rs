//! Scenario data structures for the towerdemo playback engine.
//!
//! A scenario is an ordered script of steps: each step narrates one beat of
//! the demo, optionally speaks an ATC command, optionally gates progress on
//! a user interaction, and schedules delayed world-state mutations. Scenario
//! data is immutable once loaded; the engine only ever reads it.

use serde::{Deserialize, Serialize};

use crate::world::{WorldMutation, WorldState};

/// Unique identifier for scenarios
pub type ScenarioId = String;

/// Default minimum step dwell time when a step carries no override.
pub const DEFAULT_MIN_DURATION_MS: u64 = 3000;

/// Default safety timeout when a step carries no override. A step can never
/// hold the timeline longer than this, whatever the speech system does.
pub const DEFAULT_MAX_DURATION_MS: u64 = 30000;

/// A complete demo script plus the world snapshot it starts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique scenario identifier
    pub id: ScenarioId,
    /// Human-readable title shown by the dashboard
    pub title: String,
    /// What this demo walks the audience through
    pub description: String,
    /// Ordered script beats
    pub steps: Vec<Step>,
    /// World overlay installed wholesale when the scenario is entered
    #[serde(default)]
    pub initial_world_state: WorldState,
    /// Optional metadata for cataloging
    #[serde(default)]
    pub metadata: ScenarioMetadata,
}

/// Metadata for scenario organization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioMetadata {
    /// Category tags (e.g. "emergency", "tour", "ground-ops")
    pub tags: Vec<String>,
    /// Author or creator of the scenario
    pub author: Option<String>,
    /// Scenario version for tracking updates
    pub version: String,
    /// Whether this scenario ships with the engine
    #[serde(default)]
    pub is_builtin: bool,
}

/// Relative pacing applied on top of the computed inter-step pause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingClass {
    Fast,
    #[default]
    Normal,
    Dramatic,
}

impl std::str::FromStr for PacingClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(PacingClass::Fast),
            "normal" => Ok(PacingClass::Normal),
            "dramatic" => Ok(PacingClass::Dramatic),
            other => Err(format!(
                "unknown pacing class '{other}' (expected fast, normal or dramatic)"
            )),
        }
    }
}

/// A user interaction the timeline must wait for before it may advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRequirement {
    /// Opaque interaction kind understood by the UI (e.g. "click")
    pub kind: String,
    /// UI element the interaction targets
    pub target_id: String,
    /// Prompt shown to the presenter/audience
    #[serde(default)]
    pub hint: String,
}

/// A delayed world mutation armed when its step activates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Delay from step activation, in milliseconds
    pub delay_ms: u64,
    pub mutation: WorldMutation,
}

/// One beat of the script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Step identifier, unique within its scenario
    pub id: String,
    /// Narration spoken (and displayed) for this beat
    pub narrative_text: String,
    /// Optional ATC radio command spoken after the narration
    pub atc_command_text: Option<String>,
    /// Opaque hint telling the UI what to highlight
    pub spotlight_target: Option<String>,
    /// Interaction gate; while present, the timeline holds on this step
    pub interaction: Option<InteractionRequirement>,
    /// Delayed world mutations, relative to step activation
    #[serde(default)]
    pub events: Vec<ScheduledEvent>,
    /// Minimum dwell time override
    pub min_duration_ms: Option<u64>,
    /// Safety timeout override; must stay strictly above the minimum
    pub max_duration_ms: Option<u64>,
    /// Fixed inter-step pause, bypassing the pacing calculator
    pub pause_override_ms: Option<u64>,
    #[serde(default)]
    pub pacing: PacingClass,
    /// Force the dramatic pause regardless of narrative content
    #[serde(default)]
    pub emphasize: bool,
    /// Whether advancement waits for speech completion signals
    #[serde(default = "default_wait_for_audio")]
    pub wait_for_audio: bool,
}

fn default_wait_for_audio() -> bool {
    true
}

impl Scenario {
    pub fn new(
        id: impl Into<ScenarioId>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            steps: Vec::new(),
            initial_world_state: WorldState::new(),
            metadata: ScenarioMetadata::default(),
        }
    }

    pub fn with_initial_world(mut self, world: WorldState) -> Self {
        self.initial_world_state = world;
        self
    }

    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Rough lower bound on playback time: the sum of minimum dwell times.
    /// Speech length and pacing pauses push the real figure higher.
    pub fn estimated_min_duration_ms(&self) -> u64 {
        self.steps.iter().map(Step::effective_min_duration_ms).sum()
    }
}

impl Step {
    pub fn new(id: impl Into<String>, narrative_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            narrative_text: narrative_text.into(),
            atc_command_text: None,
            spotlight_target: None,
            interaction: None,
            events: Vec::new(),
            min_duration_ms: None,
            max_duration_ms: None,
            pause_override_ms: None,
            pacing: PacingClass::Normal,
            emphasize: false,
            wait_for_audio: true,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.atc_command_text = Some(command.into());
        self
    }

    pub fn with_spotlight(mut self, target: impl Into<String>) -> Self {
        self.spotlight_target = Some(target.into());
        self
    }

    pub fn with_interaction(
        mut self,
        kind: impl Into<String>,
        target_id: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        self.interaction = Some(InteractionRequirement {
            kind: kind.into(),
            target_id: target_id.into(),
            hint: hint.into(),
        });
        self
    }

    pub fn with_event(mut self, delay_ms: u64, mutation: WorldMutation) -> Self {
        self.events.push(ScheduledEvent { delay_ms, mutation });
        self
    }

    pub fn with_min_duration(mut self, ms: u64) -> Self {
        self.min_duration_ms = Some(ms);
        self
    }

    pub fn with_max_duration(mut self, ms: u64) -> Self {
        self.max_duration_ms = Some(ms);
        self
    }

    pub fn with_pause_override(mut self, ms: u64) -> Self {
        self.pause_override_ms = Some(ms);
        self
    }

    pub fn with_pacing(mut self, pacing: PacingClass) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn emphasized(mut self) -> Self {
        self.emphasize = true;
        self
    }

    pub fn without_audio_wait(mut self) -> Self {
        self.wait_for_audio = false;
        self
    }

    pub fn has_command(&self) -> bool {
        self.atc_command_text
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    /// Effective minimum dwell time, falling back to the engine default.
    pub fn effective_min_duration_ms(&self) -> u64 {
        self.min_duration_ms.unwrap_or(DEFAULT_MIN_DURATION_MS)
    }

    /// Effective safety timeout, falling back to the engine default.
    pub fn effective_max_duration_ms(&self) -> u64 {
        self.max_duration_ms.unwrap_or(DEFAULT_MAX_DURATION_MS)
    }
}

/// Authoring-time validation, applied when scenarios are loaded.
/// Runtime playback assumes validated data and degrades to no-ops instead
/// of re-checking.
pub trait Validate {
    type Error;

    fn validate(&self) -> Result<(), Self::Error>;
}

impl Validate for Scenario {
    type Error = ScenarioValidationError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.id.is_empty() {
            return Err(ScenarioValidationError::EmptyField("id".to_string()));
        }
        if self.title.is_empty() {
            return Err(ScenarioValidationError::EmptyField("title".to_string()));
        }

        for (index, step) in self.steps.iter().enumerate() {
            step.validate()
                .map_err(|error| ScenarioValidationError::StepValidation {
                    step_index: index,
                    error,
                })?;
        }

        Ok(())
    }
}

impl Validate for Step {
    type Error = StepValidationError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.narrative_text.trim().is_empty() {
            return Err(StepValidationError::EmptyNarrative);
        }

        // The safety timeout is the liveness guarantee; it must sit strictly
        // above the minimum dwell time or the advance protocol degenerates.
        let min = self.effective_min_duration_ms();
        let max = self.effective_max_duration_ms();
        if max <= min {
            return Err(StepValidationError::DurationBounds {
                min_ms: min,
                max_ms: max,
            });
        }

        if let Some(interaction) = &self.interaction {
            if interaction.target_id.is_empty() {
                return Err(StepValidationError::EmptyInteractionTarget);
            }
        }

        Ok(())
    }
}

/// Scenario validation errors
#[derive(Debug, Clone)]
pub enum ScenarioValidationError {
    EmptyField(String),
    StepValidation {
        step_index: usize,
        error: StepValidationError,
    },
}

impl std::fmt::Display for ScenarioValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioValidationError::EmptyField(field) => {
                write!(f, "Scenario field '{}' cannot be empty", field)
            }
            ScenarioValidationError::StepValidation { step_index, error } => {
                write!(f, "Validation error in step {}: {}", step_index, error)
            }
        }
    }
}

impl std::error::Error for ScenarioValidationError {}

/// Step validation errors
#[derive(Debug, Clone)]
pub enum StepValidationError {
    EmptyNarrative,
    DurationBounds { min_ms: u64, max_ms: u64 },
    EmptyInteractionTarget,
}

impl std::fmt::Display for StepValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepValidationError::EmptyNarrative => {
                write!(f, "Step narrative cannot be empty")
            }
            StepValidationError::DurationBounds { min_ms, max_ms } => {
                write!(
                    f,
                    "Step max duration {}ms must be strictly greater than min duration {}ms",
                    max_ms, min_ms
                )
            }
            StepValidationError::EmptyInteractionTarget => {
                write!(f, "Interaction requirement needs a target id")
            }
        }
    }
}

impl std::error::Error for StepValidationError {}
