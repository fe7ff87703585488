//! Playback state machine.
//!
//! The state machine is a pure transition function over [`PlaybackState`];
//! the engine shell in [`super::engine`] owns timers and side effects and
//! feeds actions through here. Keeping the reducer pure makes every mode
//! transition unit-testable without a runtime.
//!
//! Mode graph: `Menu -> Playing <-> Paused`, `Playing -> Completed`, and
//! `Close` resets everything back to `Menu`.

use std::sync::Arc;

use towerdemo_shared::scenario::{InteractionRequirement, Scenario};
use towerdemo_shared::world::WorldState;
use towerdemo_shared::{PlaybackAction, PlaybackMode, PlaybackSnapshot};

use crate::catalog::ScenarioCatalog;

/// The mutable root of the playback engine.
///
/// Scenario data is shared immutably (`Arc`); everything else is owned.
/// An action that does not apply in the current mode leaves the state
/// unchanged rather than failing.
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    pub mode: PlaybackMode,
    pub current_scenario: Option<Arc<Scenario>>,
    pub current_step_index: usize,
    pub is_tour: bool,
    pub tour_scenario_index: usize,
    pub world_state: WorldState,
    pub pending_interaction: Option<InteractionRequirement>,
    pub interaction_completed: bool,
    pub presenter_mode: bool,
}

impl PlaybackState {
    /// The step currently on screen, when a scenario is active.
    pub fn current_step(&self) -> Option<&towerdemo_shared::scenario::Step> {
        self.current_scenario
            .as_ref()
            .and_then(|s| s.steps.get(self.current_step_index))
    }

    pub fn scenario_id(&self) -> Option<&str> {
        self.current_scenario.as_ref().map(|s| s.id.as_str())
    }
}

/// Pure transition function: `(state, action) -> state`.
///
/// Never panics and never errors; invalid actions degrade to the identity
/// transition so the presentation layer can fire anything at any time.
pub fn transition(
    state: &PlaybackState,
    action: &PlaybackAction,
    catalog: &ScenarioCatalog,
) -> PlaybackState {
    match action {
        PlaybackAction::OpenMenu => open_menu(state),
        PlaybackAction::StartScenario { id } => match catalog.get(id) {
            Some(scenario) => enter_scenario(state, scenario, false, 0),
            None => state.clone(),
        },
        PlaybackAction::StartTour => start_tour(state, catalog),
        PlaybackAction::NextStep => next_step(state, catalog),
        PlaybackAction::PrevStep => prev_step(state),
        PlaybackAction::Pause => {
            let mut next = state.clone();
            if next.mode == PlaybackMode::Playing {
                next.mode = PlaybackMode::Paused;
            }
            next
        }
        PlaybackAction::Resume => {
            let mut next = state.clone();
            if next.mode == PlaybackMode::Paused {
                next.mode = PlaybackMode::Playing;
            }
            next
        }
        PlaybackAction::TogglePresenterMode => {
            let mut next = state.clone();
            next.presenter_mode = !next.presenter_mode;
            next
        }
        PlaybackAction::CompleteInteraction => {
            let mut next = state.clone();
            if next.pending_interaction.is_some() {
                next.pending_interaction = None;
                next.interaction_completed = true;
            }
            next
        }
        PlaybackAction::Close => {
            // Wholesale reset; the shell cancels outstanding timers.
            PlaybackState::default()
        }
    }
}

fn open_menu(state: &PlaybackState) -> PlaybackState {
    PlaybackState {
        presenter_mode: state.presenter_mode,
        ..PlaybackState::default()
    }
}

/// Install a scenario: step 0, world replaced wholesale with the scenario's
/// initial snapshot. Zero-step scenarios complete immediately.
fn enter_scenario(
    state: &PlaybackState,
    scenario: Arc<Scenario>,
    is_tour: bool,
    tour_index: usize,
) -> PlaybackState {
    if scenario.steps.is_empty() {
        return PlaybackState {
            mode: PlaybackMode::Completed,
            presenter_mode: state.presenter_mode,
            is_tour,
            tour_scenario_index: tour_index,
            ..PlaybackState::default()
        };
    }

    let mut next = PlaybackState {
        mode: PlaybackMode::Playing,
        world_state: scenario.initial_world_state.clone(),
        current_scenario: Some(scenario),
        current_step_index: 0,
        is_tour,
        tour_scenario_index: tour_index,
        presenter_mode: state.presenter_mode,
        ..PlaybackState::default()
    };
    sync_interaction_gate(&mut next);
    next
}

fn start_tour(state: &PlaybackState, catalog: &ScenarioCatalog) -> PlaybackState {
    // Skip leading zero-step entries so the tour starts on a real beat.
    for (index, scenario) in catalog.iter().enumerate() {
        if !scenario.steps.is_empty() {
            return enter_scenario(state, Arc::clone(scenario), true, index);
        }
    }
    state.clone()
}

fn next_step(state: &PlaybackState, catalog: &ScenarioCatalog) -> PlaybackState {
    if state.mode != PlaybackMode::Playing {
        return state.clone();
    }
    // The interaction gate: while an interaction is pending no advance is
    // honored, timer-driven or explicit. `CompleteInteraction` clears it.
    if state.pending_interaction.is_some() {
        return state.clone();
    }
    let Some(scenario) = &state.current_scenario else {
        return state.clone();
    };

    if state.current_step_index + 1 < scenario.steps.len() {
        let mut next = state.clone();
        next.current_step_index += 1;
        sync_interaction_gate(&mut next);
        return next;
    }

    if state.is_tour {
        // Chain into the next catalog entry, skipping zero-step scenarios.
        for index in state.tour_scenario_index + 1..catalog.len() {
            match catalog.at(index) {
                Some(scenario) if !scenario.steps.is_empty() => {
                    return enter_scenario(state, Arc::clone(scenario), true, index);
                }
                _ => {}
            }
        }
    }

    let mut next = state.clone();
    next.mode = PlaybackMode::Completed;
    next.pending_interaction = None;
    next
}

fn prev_step(state: &PlaybackState) -> PlaybackState {
    if state.mode != PlaybackMode::Playing || state.current_scenario.is_none() {
        return state.clone();
    }
    // Backward navigation never crosses a scenario boundary, tour or not.
    if state.current_step_index == 0 {
        return state.clone();
    }

    let mut next = state.clone();
    next.current_step_index -= 1;
    sync_interaction_gate(&mut next);
    next
}

fn sync_interaction_gate(state: &mut PlaybackState) {
    state.pending_interaction = state.current_step().and_then(|s| s.interaction.clone());
    state.interaction_completed = false;
}

/// Build the read-only snapshot handed to the rendering layer.
pub fn snapshot_of(state: &PlaybackState) -> PlaybackSnapshot {
    let step = state.current_step();
    let total_steps = state
        .current_scenario
        .as_ref()
        .map(|s| s.steps.len())
        .unwrap_or(0);

    let progress_percent = match state.mode {
        PlaybackMode::Menu => 0.0,
        PlaybackMode::Completed => 100.0,
        PlaybackMode::Playing | PlaybackMode::Paused => {
            if total_steps == 0 {
                0.0
            } else {
                ((state.current_step_index + 1) as f32 / total_steps as f32) * 100.0
            }
        }
    };

    PlaybackSnapshot {
        mode: state.mode,
        current_scenario_title: state
            .current_scenario
            .as_ref()
            .map(|s| s.title.clone()),
        current_step_index: state.current_step_index,
        total_steps,
        progress_percent,
        narrative_text: step.map(|s| s.narrative_text.clone()),
        atc_command_text: step.and_then(|s| s.atc_command_text.clone()),
        pending_interaction: state.pending_interaction.clone(),
        spotlight_target: step.and_then(|s| s.spotlight_target.clone()),
        presenter_mode: state.presenter_mode,
        world_state: state.world_state.clone(),
    }
}
