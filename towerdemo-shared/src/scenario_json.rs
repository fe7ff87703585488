//! JSON5 parsing for scenario files.
//!
//! Scenario files are authored in JSON5 so narration can be written with
//! unquoted keys, trailing commas and comments. Durations are human strings
//! using the `duration-string` crate format: "800ms", "3s", "1m30s".
//!
//! Parsing goes through intermediate structs and then converts into the
//! real model, running authoring validation as the last stage; a file that
//! parses but violates an invariant (e.g. max duration at or below min) is
//! rejected here, never at playback time.

use duration_string::DurationString;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::scenario::{
    InteractionRequirement, PacingClass, Scenario, ScenarioMetadata, Step, Validate,
};
use crate::world::{MutationKind, WorldMutation, WorldState};

/// Parse a duration string like "50ms", "5s", "1m" into milliseconds.
pub fn parse_duration_string(s: &str) -> Result<u64, String> {
    let duration: DurationString = s
        .trim()
        .parse()
        .map_err(|e| format!("Invalid duration '{}': {}", s, e))?;

    let std_duration: std::time::Duration = duration.into();
    Ok(std_duration.as_millis() as u64)
}

/// Error type for scenario file parsing
#[derive(Debug)]
pub enum ScenarioParseError {
    /// JSON5 parsing error
    Json5Error(String),
    /// Conversion or validation error after parsing
    ValidationError(String),
    /// File I/O error
    IoError(String),
}

impl std::fmt::Display for ScenarioParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioParseError::Json5Error(msg) => write!(f, "JSON5 parse error: {}", msg),
            ScenarioParseError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ScenarioParseError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ScenarioParseError {}

impl From<std::io::Error> for ScenarioParseError {
    fn from(err: std::io::Error) -> Self {
        ScenarioParseError::IoError(err.to_string())
    }
}

/// Intermediate struct for JSON5 deserialization of a scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFile {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: ScenarioMetadataJson,
    /// Initial world overlay: collection name -> entity id -> value
    #[serde(default)]
    pub initial_world: Value,
    pub steps: Vec<StepJson>,
}

/// Intermediate struct for scenario metadata
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioMetadataJson {
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Intermediate struct for a scenario step
#[derive(Debug, Clone, Deserialize)]
pub struct StepJson {
    /// Step id; defaults to "step-N" by position
    pub id: Option<String>,
    pub narrative: String,
    pub command: Option<String>,
    pub spotlight: Option<String>,
    pub interaction: Option<InteractionJson>,
    #[serde(default)]
    pub events: Vec<EventJson>,
    /// Duration strings like "3s", "800ms"
    pub min_duration: Option<String>,
    pub max_duration: Option<String>,
    pub pause_override: Option<String>,
    pub pacing: Option<String>,
    #[serde(default)]
    pub emphasize: bool,
    pub wait_for_audio: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionJson {
    pub kind: String,
    pub target: String,
    #[serde(default)]
    pub hint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventJson {
    /// Delay from step activation, as a duration string
    pub delay: String,
    /// Mutation kind; unknown kinds are kept and ignored at apply time
    pub kind: String,
    pub target: String,
    #[serde(default)]
    pub payload: Value,
}

impl ScenarioFile {
    /// Convert the parsed file into a validated [`Scenario`].
    pub fn into_scenario(self) -> Result<Scenario, ScenarioParseError> {
        let initial_world_state = match &self.initial_world {
            Value::Null => WorldState::new(),
            other => serde_json::from_value(other.clone()).map_err(|e| {
                ScenarioParseError::ValidationError(format!("Invalid initial_world: {}", e))
            })?,
        };

        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.into_iter().enumerate() {
            steps.push(step.into_step(index)?);
        }

        let scenario = Scenario {
            id: self.id,
            title: self.title,
            description: self.description,
            steps,
            initial_world_state,
            metadata: ScenarioMetadata {
                tags: self.metadata.tags,
                author: self.metadata.author,
                version: self.metadata.version,
                is_builtin: false,
            },
        };

        scenario
            .validate()
            .map_err(|e| ScenarioParseError::ValidationError(e.to_string()))?;

        Ok(scenario)
    }
}

impl StepJson {
    fn into_step(self, index: usize) -> Result<Step, ScenarioParseError> {
        let parse_ms = |field: &str, value: Option<String>| -> Result<Option<u64>, ScenarioParseError> {
            value
                .map(|s| {
                    parse_duration_string(&s).map_err(|e| {
                        ScenarioParseError::ValidationError(format!(
                            "Step {} field '{}': {}",
                            index, field, e
                        ))
                    })
                })
                .transpose()
        };

        let pacing = match self.pacing {
            Some(raw) => raw.parse::<PacingClass>().map_err(|e| {
                ScenarioParseError::ValidationError(format!("Step {}: {}", index, e))
            })?,
            None => PacingClass::Normal,
        };

        let mut events = Vec::with_capacity(self.events.len());
        for event in self.events {
            let delay_ms = parse_duration_string(&event.delay).map_err(|e| {
                ScenarioParseError::ValidationError(format!("Step {} event: {}", index, e))
            })?;
            events.push(crate::scenario::ScheduledEvent {
                delay_ms,
                mutation: WorldMutation {
                    kind: parse_mutation_kind(&event.kind),
                    target: event.target,
                    payload: event.payload,
                },
            });
        }

        Ok(Step {
            id: self.id.unwrap_or_else(|| format!("step-{}", index + 1)),
            narrative_text: self.narrative,
            atc_command_text: self.command,
            spotlight_target: self.spotlight,
            interaction: self.interaction.map(|i| InteractionRequirement {
                kind: i.kind,
                target_id: i.target,
                hint: i.hint,
            }),
            events,
            min_duration_ms: parse_ms("min_duration", self.min_duration)?,
            max_duration_ms: parse_ms("max_duration", self.max_duration)?,
            pause_override_ms: parse_ms("pause_override", self.pause_override)?,
            pacing,
            emphasize: self.emphasize,
            wait_for_audio: self.wait_for_audio.unwrap_or(true),
        })
    }
}

fn parse_mutation_kind(raw: &str) -> MutationKind {
    // Round-trips through the serde representation so the `#[serde(other)]`
    // fallback maps unrecognized kinds to Unknown.
    serde_json::from_value(Value::String(raw.to_string())).unwrap_or(MutationKind::Unknown)
}

/// Parse a scenario from a JSON5 string.
pub fn parse_scenario_str(content: &str) -> Result<Scenario, ScenarioParseError> {
    let file: ScenarioFile =
        json5::from_str(content).map_err(|e| ScenarioParseError::Json5Error(e.to_string()))?;
    file.into_scenario()
}

/// Parse a scenario from a JSON5 file on disk.
pub fn parse_scenario_file(path: &Path) -> Result<Scenario, ScenarioParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_scenario_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
    id: "fuel-emergency",
    title: "Fuel Emergency",
    description: "Low fuel inbound with priority handling",
    metadata: { tags: ["emergency"], author: "demo team" },
    initial_world: {
        tracks: {
            BAW117: { alt: 24000, hdg: 270 },
        },
    },
    steps: [
        {
            narrative: "Speedbird one-one-seven checks in, fuel state marginal.",
            command: "Speedbird 117, descend and maintain flight level 100",
            spotlight: "track:BAW117",
            min_duration: "2s",
            max_duration: "20s",
            events: [
                { delay: "1500ms", kind: "merge", target: "alerts",
                  payload: { "low-fuel": { severity: "critical" } } },
            ],
        },
        {
            id: "ack",
            narrative: "MAYDAY. The crew declares an emergency.",
            pacing: "dramatic",
            emphasize: true,
            interaction: { kind: "click", target: "alert:low-fuel", hint: "Acknowledge" },
            wait_for_audio: false,
        },
    ],
}"#;

    #[test]
    fn test_parse_sample_scenario() {
        let scenario = parse_scenario_str(SAMPLE).unwrap();

        assert_eq!(scenario.id, "fuel-emergency");
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(scenario.steps[0].id, "step-1");
        assert_eq!(scenario.steps[0].min_duration_ms, Some(2000));
        assert_eq!(scenario.steps[0].max_duration_ms, Some(20000));
        assert_eq!(scenario.steps[0].events[0].delay_ms, 1500);
        assert_eq!(
            scenario.steps[0].events[0].mutation.kind,
            MutationKind::Merge
        );
        assert!(scenario.steps[0].wait_for_audio);

        let ack = &scenario.steps[1];
        assert_eq!(ack.id, "ack");
        assert_eq!(ack.pacing, PacingClass::Dramatic);
        assert!(ack.emphasize);
        assert!(!ack.wait_for_audio);
        assert_eq!(ack.interaction.as_ref().unwrap().target_id, "alert:low-fuel");

        assert!(
            scenario
                .initial_world_state
                .entity("tracks", "BAW117")
                .is_some()
        );
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration_string("50ms").unwrap(), 50);
        assert_eq!(parse_duration_string("5s").unwrap(), 5000);
        assert_eq!(parse_duration_string("1m").unwrap(), 60000);
        assert_eq!(parse_duration_string(" 2s ").unwrap(), 2000);
        assert!(parse_duration_string("fast").is_err());
    }

    #[test]
    fn test_unknown_mutation_kind_is_tolerated() {
        let content = r#"{
            id: "x", title: "X",
            steps: [
                { narrative: "beat", events: [
                    { delay: "1s", kind: "interpolate", target: "tracks", payload: {} },
                ] },
            ],
        }"#;

        let scenario = parse_scenario_str(content).unwrap();
        assert_eq!(
            scenario.steps[0].events[0].mutation.kind,
            MutationKind::Unknown
        );
    }

    #[test]
    fn test_unknown_pacing_class_is_rejected() {
        let content = r#"{
            id: "x", title: "X",
            steps: [ { narrative: "beat", pacing: "glacial" } ],
        }"#;

        assert!(matches!(
            parse_scenario_str(content),
            Err(ScenarioParseError::ValidationError(_))
        ));
    }

    #[test]
    fn test_inverted_bounds_rejected_at_parse_time() {
        let content = r#"{
            id: "x", title: "X",
            steps: [ { narrative: "beat", min_duration: "10s", max_duration: "5s" } ],
        }"#;

        assert!(matches!(
            parse_scenario_str(content),
            Err(ScenarioParseError::ValidationError(_))
        ));
    }

    #[test]
    fn test_malformed_json5_is_a_parse_error() {
        assert!(matches!(
            parse_scenario_str("{ this is not json5 }}}"),
            Err(ScenarioParseError::Json5Error(_))
        ));
    }
}
