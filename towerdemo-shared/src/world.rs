//! Opaque world-state overlay patched by scenario events.
//!
//! The playback engine does not interpret the contents of the world state.
//! It is a set of named collections (`tracks`, `alerts`, `predictions`, ...)
//! mapping entity ids to arbitrary JSON values. Scenarios carry an initial
//! snapshot that replaces the overlay wholesale on entry, and steps schedule
//! mutations that patch individual collections while the scenario runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How a mutation changes its target collection.
///
/// Scenario files may carry kinds this build does not know about; those
/// deserialize to [`MutationKind::Unknown`] and are ignored at apply time
/// rather than failing the whole scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    /// Shallow-merge object fields into existing entities, inserting new ones.
    Merge,
    /// Insert or overwrite entities wholesale.
    Replace,
    /// Remove entities by id.
    Remove,
    #[serde(other)]
    Unknown,
}

/// A single patch against one world-state collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldMutation {
    pub kind: MutationKind,
    /// Name of the collection being patched (e.g. `"alerts"`).
    pub target: String,
    /// For `merge`/`replace`: an object of entity id to value.
    /// For `remove`: an array of entity id strings.
    #[serde(default)]
    pub payload: Value,
}

/// Outcome of applying a mutation. The engine logs ignored outcomes; the
/// world itself stays silent so this crate needs no logging dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationEffect {
    Applied,
    IgnoredUnknownKind,
    IgnoredBadPayload,
}

/// The mutable overlay relayed to the rendering layer.
///
/// Collections are kept in a `BTreeMap` so snapshots serialize in a stable
/// order regardless of mutation arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    #[serde(flatten)]
    collections: BTreeMap<String, serde_json::Map<String, Value>>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a collection by name.
    pub fn collection(&self, name: &str) -> Option<&serde_json::Map<String, Value>> {
        self.collections.get(name)
    }

    /// Look up a single entity within a collection.
    pub fn entity(&self, collection: &str, id: &str) -> Option<&Value> {
        self.collections.get(collection).and_then(|c| c.get(id))
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.values().all(|c| c.is_empty())
    }

    /// Apply a single mutation.
    ///
    /// Unknown kinds and payloads that do not match the kind's expected
    /// shape are reported back instead of panicking; the overlay is left
    /// untouched in those cases.
    pub fn apply(&mut self, mutation: &WorldMutation) -> MutationEffect {
        match mutation.kind {
            MutationKind::Merge => {
                let Value::Object(entries) = &mutation.payload else {
                    return MutationEffect::IgnoredBadPayload;
                };
                let collection = self.collections.entry(mutation.target.clone()).or_default();
                for (id, incoming) in entries {
                    match (collection.get_mut(id), incoming) {
                        (Some(Value::Object(existing)), Value::Object(fields)) => {
                            for (key, value) in fields {
                                existing.insert(key.clone(), value.clone());
                            }
                        }
                        _ => {
                            collection.insert(id.clone(), incoming.clone());
                        }
                    }
                }
                MutationEffect::Applied
            }
            MutationKind::Replace => {
                let Value::Object(entries) = &mutation.payload else {
                    return MutationEffect::IgnoredBadPayload;
                };
                let collection = self.collections.entry(mutation.target.clone()).or_default();
                for (id, value) in entries {
                    collection.insert(id.clone(), value.clone());
                }
                MutationEffect::Applied
            }
            MutationKind::Remove => {
                let Value::Array(ids) = &mutation.payload else {
                    return MutationEffect::IgnoredBadPayload;
                };
                if let Some(collection) = self.collections.get_mut(&mutation.target) {
                    for id in ids {
                        if let Value::String(id) = id {
                            collection.remove(id);
                        }
                    }
                }
                MutationEffect::Applied
            }
            MutationKind::Unknown => MutationEffect::IgnoredUnknownKind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> WorldState {
        serde_json::from_value(json!({
            "tracks": {
                "AAL12": { "alt": 24000, "hdg": 270 },
                "UAL88": { "alt": 31000, "hdg": 90 }
            },
            "alerts": {}
        }))
        .unwrap()
    }

    #[test]
    fn merge_patches_existing_entity_fields() {
        let mut world = seeded();
        let effect = world.apply(&WorldMutation {
            kind: MutationKind::Merge,
            target: "tracks".to_string(),
            payload: json!({ "AAL12": { "alt": 18000 } }),
        });

        assert_eq!(effect, MutationEffect::Applied);
        assert_eq!(world.entity("tracks", "AAL12").unwrap()["alt"], 18000);
        // Untouched fields survive the merge
        assert_eq!(world.entity("tracks", "AAL12").unwrap()["hdg"], 270);
        assert_eq!(world.entity("tracks", "UAL88").unwrap()["alt"], 31000);
    }

    #[test]
    fn merge_inserts_missing_entities() {
        let mut world = seeded();
        world.apply(&WorldMutation {
            kind: MutationKind::Merge,
            target: "alerts".to_string(),
            payload: json!({ "low-fuel": { "severity": "critical" } }),
        });

        assert_eq!(
            world.entity("alerts", "low-fuel").unwrap()["severity"],
            "critical"
        );
    }

    #[test]
    fn replace_overwrites_wholesale() {
        let mut world = seeded();
        world.apply(&WorldMutation {
            kind: MutationKind::Replace,
            target: "tracks".to_string(),
            payload: json!({ "AAL12": { "alt": 12000 } }),
        });

        let track = world.entity("tracks", "AAL12").unwrap();
        assert_eq!(track["alt"], 12000);
        assert!(track.get("hdg").is_none());
    }

    #[test]
    fn remove_drops_entities_and_tolerates_missing_ids() {
        let mut world = seeded();
        let effect = world.apply(&WorldMutation {
            kind: MutationKind::Remove,
            target: "tracks".to_string(),
            payload: json!(["UAL88", "no-such-track"]),
        });

        assert_eq!(effect, MutationEffect::Applied);
        assert!(world.entity("tracks", "UAL88").is_none());
        assert!(world.entity("tracks", "AAL12").is_some());
    }

    #[test]
    fn unknown_kind_parses_and_is_ignored() {
        let mutation: WorldMutation = serde_json::from_value(json!({
            "kind": "interpolate",
            "target": "tracks",
            "payload": { "AAL12": { "alt": 0 } }
        }))
        .unwrap();
        assert_eq!(mutation.kind, MutationKind::Unknown);

        let mut world = seeded();
        let before = world.clone();
        assert_eq!(world.apply(&mutation), MutationEffect::IgnoredUnknownKind);
        assert_eq!(world, before);
    }

    #[test]
    fn mismatched_payload_shape_is_ignored() {
        let mut world = seeded();
        let before = world.clone();

        let effect = world.apply(&WorldMutation {
            kind: MutationKind::Remove,
            target: "tracks".to_string(),
            payload: json!({ "AAL12": {} }),
        });

        assert_eq!(effect, MutationEffect::IgnoredBadPayload);
        assert_eq!(world, before);
    }
}
