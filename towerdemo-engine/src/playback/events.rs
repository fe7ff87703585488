//! Event scheduler bookkeeping.
//!
//! The actual timers live in the engine shell (they post back to the engine
//! task); this module tracks which of a scenario's events have already
//! fired so that re-entering a step (backward navigation or a resume)
//! never replays a mutation, and applies mutations with the lenient
//! error policy the world model expects.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use towerdemo_shared::scenario::{ScheduledEvent, Step};
use towerdemo_shared::world::{MutationEffect, WorldMutation, WorldState};

/// Per-scenario-run record of fired events, keyed by step index.
#[derive(Debug, Default)]
pub struct EventLedger {
    fired: HashMap<usize, HashSet<usize>>,
}

impl EventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events of `step` that still need arming, with their indices.
    pub fn pending_for<'a>(
        &self,
        step_index: usize,
        step: &'a Step,
    ) -> Vec<(usize, &'a ScheduledEvent)> {
        let fired = self.fired.get(&step_index);
        step.events
            .iter()
            .enumerate()
            .filter(|(event_index, _)| !fired.is_some_and(|f| f.contains(event_index)))
            .collect()
    }

    pub fn mark_fired(&mut self, step_index: usize, event_index: usize) {
        self.fired.entry(step_index).or_default().insert(event_index);
    }

    pub fn was_fired(&self, step_index: usize, event_index: usize) -> bool {
        self.fired
            .get(&step_index)
            .is_some_and(|f| f.contains(&event_index))
    }

    /// Forget everything; called on scenario (re)entry, where the world is
    /// replaced wholesale and the script starts over.
    pub fn reset(&mut self) {
        self.fired.clear();
    }
}

/// Apply a committed mutation to the world, logging ignored outcomes.
pub fn apply_mutation(world: &mut WorldState, mutation: &WorldMutation) {
    match world.apply(mutation) {
        MutationEffect::Applied => {
            debug!(target: "towerdemo::events", collection = %mutation.target, "world mutation applied");
        }
        MutationEffect::IgnoredUnknownKind => {
            warn!(
                "Ignoring world mutation with unknown kind on '{}'",
                mutation.target
            );
        }
        MutationEffect::IgnoredBadPayload => {
            warn!(
                "Ignoring world mutation with mismatched payload shape on '{}'",
                mutation.target
            );
        }
    }
}
