//! Built-in demo scenarios.
//!
//! These ship with the engine so the dashboard has a show to run without
//! any scenario files installed. They double as the default tour, played
//! in the order listed here.

use serde_json::{Value, json};
use tracing::info;

use towerdemo_shared::scenario::{PacingClass, Scenario, ScenarioMetadata, Step};
use towerdemo_shared::world::{MutationKind, WorldMutation, WorldState};

/// The built-in scenario set, in tour order.
pub struct BuiltinScenarios {
    scenarios: Vec<Scenario>,
}

impl Default for BuiltinScenarios {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinScenarios {
    pub fn new() -> Self {
        let scenarios = vec![
            Self::fuel_emergency(),
            Self::runway_incursion(),
            Self::weather_deviation(),
        ];
        info!("Loaded {} built-in scenarios", scenarios.len());
        Self { scenarios }
    }

    /// All built-in scenarios in tour order.
    pub fn all(&self) -> Vec<Scenario> {
        self.scenarios.clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.scenarios.iter().map(|s| s.id.clone()).collect()
    }

    fn metadata(tags: &[&str]) -> ScenarioMetadata {
        ScenarioMetadata {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            author: Some("towerdemo built-ins".to_string()),
            version: "1.0".to_string(),
            is_builtin: true,
        }
    }

    fn world(value: Value) -> WorldState {
        serde_json::from_value(value).expect("built-in world snapshots are well formed")
    }

    fn merge(target: &str, payload: Value) -> WorldMutation {
        WorldMutation {
            kind: MutationKind::Merge,
            target: target.to_string(),
            payload,
        }
    }

    fn remove(target: &str, ids: Value) -> WorldMutation {
        WorldMutation {
            kind: MutationKind::Remove,
            target: target.to_string(),
            payload: ids,
        }
    }

    /// Low-fuel arrival with an emergency declaration mid-approach.
    fn fuel_emergency() -> Scenario {
        let mut scenario = Scenario::new(
            "fuel-emergency",
            "Fuel Emergency Arrival",
            "A transatlantic arrival declares minimum fuel, then an emergency, \
             and gets priority sequencing to runway 27.",
        )
        .with_initial_world(Self::world(json!({
            "tracks": {
                "BAW117": { "callsign": "Speedbird 117", "alt": 24000, "hdg": 270, "gs": 440 },
                "DAL42":  { "callsign": "Delta 42", "alt": 11000, "hdg": 90, "gs": 310 }
            },
            "alerts": {},
            "predictions": {}
        })));
        scenario.metadata = Self::metadata(&["emergency", "arrival"]);

        scenario.add_step(
            Step::new(
                "checkin",
                "Speedbird one-one-seven checks in from the oceanic boundary, \
                 and the fuel page tells a tighter story than the flight plan did.",
            )
            .with_spotlight("track:BAW117")
            .with_event(
                2000,
                Self::merge("predictions", json!({
                    "BAW117-fuel": { "kind": "fuel-window", "minutes": 38 }
                })),
            ),
        );

        scenario.add_step(
            Step::new(
                "min-fuel",
                "The crew advises minimum fuel. Not yet an emergency, but the \
                 controller starts clearing a path.",
            )
            .with_command("Speedbird 117, descend and maintain flight level 100, direct OCK")
            .with_spotlight("track:BAW117")
            .with_event(
                1500,
                Self::merge("alerts", json!({
                    "min-fuel-BAW117": { "severity": "caution", "label": "MIN FUEL" }
                })),
            )
            .with_event(
                4000,
                Self::merge("tracks", json!({ "BAW117": { "alt": 18000 } })),
            ),
        );

        scenario.add_step(
            Step::new(
                "mayday",
                "MAYDAY, MAYDAY, MAYDAY. Speedbird one-one-seven declares a fuel \
                 emergency. Every other strip on the board just became negotiable.",
            )
            .with_pacing(PacingClass::Dramatic)
            .emphasized()
            .with_spotlight("alert:emergency-BAW117")
            .with_event(
                1000,
                Self::merge("alerts", json!({
                    "emergency-BAW117": { "severity": "critical", "label": "FUEL EMERGENCY" }
                })),
            )
            .with_event(
                1200,
                Self::remove("alerts", json!(["min-fuel-BAW117"])),
            ),
        );

        scenario.add_step(
            Step::new(
                "acknowledge",
                "The alert needs a human in the loop. Acknowledge it to pin the \
                 emergency strip to the top of the board.",
            )
            .with_interaction("click", "alert:emergency-BAW117", "Acknowledge the emergency alert")
            .with_spotlight("alert:emergency-BAW117"),
        );

        scenario.add_step(
            Step::new(
                "priority",
                "Delta forty-two takes a turn for spacing, and Speedbird gets the \
                 runway. Twelve minutes of fuel to spare, on paper.",
            )
            .with_command("Delta 42, turn left heading 360, vectors for spacing, \
                           expect runway 27 behind the emergency traffic")
            .with_spotlight("track:DAL42")
            .with_event(
                2500,
                Self::merge("tracks", json!({ "DAL42": { "hdg": 360 } })),
            )
            .with_event(
                5000,
                Self::merge("predictions", json!({
                    "BAW117-landing": { "kind": "eta", "runway": "27", "minutes": 9 }
                })),
            ),
        );

        scenario
    }

    /// Ground conflict: a vehicle on the runway during a landing clearance.
    fn runway_incursion() -> Scenario {
        let mut scenario = Scenario::new(
            "runway-incursion",
            "Runway Incursion",
            "A maintenance vehicle strays onto runway 09 with traffic on short \
             final; the tower breaks off the approach.",
        )
        .with_initial_world(Self::world(json!({
            "tracks": {
                "UAL88": { "callsign": "United 88", "alt": 1200, "hdg": 92, "gs": 140 }
            },
            "vehicles": {
                "OPS-4": { "label": "Ops 4", "position": "taxiway-kilo" }
            },
            "alerts": {}
        })));
        scenario.metadata = Self::metadata(&["ground-ops", "incursion"]);

        scenario.add_step(
            Step::new(
                "final",
                "United eighty-eight is stable on short final for runway zero-nine. \
                 Routine, until the ground radar says otherwise.",
            )
            .with_spotlight("track:UAL88"),
        );

        scenario.add_step(
            Step::new(
                "incursion",
                "Ops four misses the hold-short line. COLLISION risk on the runway, \
                 and the surface alert fires before anyone keys a mic.",
            )
            .emphasized()
            .with_spotlight("vehicle:OPS-4")
            .with_event(
                800,
                Self::merge("vehicles", json!({ "OPS-4": { "position": "runway-09" } })),
            )
            .with_event(
                1000,
                Self::merge("alerts", json!({
                    "incursion-09": { "severity": "critical", "label": "RUNWAY INCURSION 09" }
                })),
            ),
        );

        scenario.add_step(
            Step::new(
                "go-around",
                "One transmission, no hesitation. The approach is broken off and \
                 the runway belongs to the problem until it is towed clear.",
            )
            .with_command("United 88, go around, climb and maintain 3000, runway occupied")
            .with_pacing(PacingClass::Fast)
            .with_spotlight("track:UAL88")
            .with_event(
                2000,
                Self::merge("tracks", json!({ "UAL88": { "alt": 2400, "gs": 160 } })),
            ),
        );

        scenario.add_step(
            Step::new(
                "cleanup",
                "The vehicle clears at the far end and the alert is downgraded. \
                 United comes back around for an uneventful landing.",
            )
            .without_audio_wait()
            .with_min_duration(4000)
            .with_event(
                1500,
                Self::remove("alerts", json!(["incursion-09"])),
            )
            .with_event(
                1800,
                Self::merge("vehicles", json!({ "OPS-4": { "position": "apron" } })),
            ),
        );

        scenario
    }

    /// Weather cell forcing a reroute; the calm counterpart to the others.
    fn weather_deviation() -> Scenario {
        let mut scenario = Scenario::new(
            "weather-deviation",
            "Weather Deviation",
            "A building cell over the arrival fix pushes a flight thirty degrees \
             off course and the sector absorbs the ripple.",
        )
        .with_initial_world(Self::world(json!({
            "tracks": {
                "AFR006": { "callsign": "Air France 006", "alt": 36000, "hdg": 210, "gs": 470 }
            },
            "weather": {
                "cell-9": { "kind": "convective", "intensity": "moderate", "fix": "NARAK" }
            },
            "alerts": {}
        })));
        scenario.metadata = Self::metadata(&["weather", "enroute"]);

        scenario.add_step(
            Step::new(
                "building",
                "The cell over NARAK has been growing all afternoon. Air France \
                 zero-zero-six is pointed straight at it.",
            )
            .with_spotlight("weather:cell-9")
            .with_event(
                3000,
                Self::merge("weather", json!({ "cell-9": { "intensity": "severe" } })),
            ),
        );

        scenario.add_step(
            Step::new(
                "request",
                "The crew asks for thirty left. Weather deviations are requests in \
                 name only; the answer is how, not whether.",
            )
            .with_command("Air France 006, turn left heading 180, deviation approved, \
                           report clear of weather")
            .with_spotlight("track:AFR006")
            .with_event(
                2500,
                Self::merge("tracks", json!({ "AFR006": { "hdg": 180 } })),
            ),
        );

        scenario.add_step(
            Step::new(
                "clear",
                "Ten minutes later the cell drifts east, and the board quietly \
                 returns to the plan everyone filed this morning.",
            )
            .with_pause_override(1200)
            .with_event(
                2000,
                Self::merge("tracks", json!({ "AFR006": { "hdg": 210 } })),
            )
            .with_event(
                2200,
                Self::remove("weather", json!(["cell-9"])),
            ),
        );

        scenario
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use towerdemo_shared::scenario::Validate;

    #[test]
    fn builtin_scenarios_pass_authoring_validation() {
        for scenario in BuiltinScenarios::new().all() {
            scenario
                .validate()
                .unwrap_or_else(|e| panic!("built-in '{}' invalid: {}", scenario.id, e));
        }
    }

    #[test]
    fn builtin_ids_are_unique_and_ordered() {
        let ids = BuiltinScenarios::new().ids();
        assert_eq!(
            ids,
            vec!["fuel-emergency", "runway-incursion", "weather-deviation"]
        );
    }

    #[test]
    fn fuel_emergency_gates_on_the_alert_acknowledgement() {
        let builtins = BuiltinScenarios::new();
        let scenario = builtins
            .all()
            .into_iter()
            .find(|s| s.id == "fuel-emergency")
            .unwrap();

        let gated: Vec<_> = scenario
            .steps
            .iter()
            .filter(|s| s.interaction.is_some())
            .collect();
        assert_eq!(gated.len(), 1);
        assert_eq!(gated[0].id, "acknowledge");
    }

    #[test]
    fn every_builtin_starts_with_a_populated_world() {
        for scenario in BuiltinScenarios::new().all() {
            assert!(
                !scenario.initial_world_state.is_empty(),
                "'{}' should seed its world",
                scenario.id
            );
        }
    }
}
