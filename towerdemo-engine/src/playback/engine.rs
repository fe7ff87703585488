//! The imperative shell around the playback state machine.
//!
//! The engine runs as a single spawned task that owns all mutable playback
//! state. Everything reaches it as a message on one channel: UI actions,
//! speech completion signals, and the engine's own timer callbacks. Timers
//! are spawned sleeps that post back to the channel; each carries the
//! generation token of the session that armed it, and the token is checked
//! on arrival. Entering or leaving a step aborts every timer of the old
//! session and bumps the generation, so a callback that raced the abort is
//! still dropped. A late speech completion or timer can never act on the
//! wrong step.
//!
//! Advance protocol per step (when `wait_for_audio`):
//! 1. Speech cue goes out with the fresh generation.
//! 2. A safety timer is armed at the step's max duration; if nothing else
//!    moves the timeline, it does.
//! 3. Each completion signal runs the readiness check: both signals in and
//!    the minimum dwell served arms the pacing pause; signals in before the
//!    minimum arm a floor timer for the remainder.
//! 4. Whichever timer fires first advances exactly once; the step change
//!    cancels the rest.
//!
//! Steps with an interaction requirement hold regardless of timers; only
//! `CompleteInteraction` re-opens the path.

use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio::time::{Duration, Instant, sleep};
use tracing::{debug, info, instrument, warn};

use towerdemo_shared::{
    CommandLogEntry, PlaybackAction, PlaybackMode, PlaybackSnapshot, SpeechCue,
};

use crate::catalog::ScenarioCatalog;

use super::events::{EventLedger, apply_mutation};
use super::pacing::PacingCalculator;
use super::session::{Readiness, StepSession};
use super::state::{PlaybackState, snapshot_of, transition};

/// Timers the engine arms for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    /// Max-duration force-advance; the bounded-liveness guarantee.
    Safety,
    /// Re-check readiness once the minimum dwell time is served.
    MinFloor,
    /// Single advance timer for steps that do not wait for audio.
    Fixed,
    /// The pacing pause armed once the step is ready to advance.
    AdvancePause,
}

/// Everything the engine task consumes, unified on one channel so all
/// mutation happens on one logical timeline.
#[derive(Debug)]
enum EngineCommand {
    Action(PlaybackAction),
    NarrationComplete {
        generation: u64,
    },
    CommandComplete {
        generation: u64,
    },
    TimerFired {
        generation: u64,
        timer: TimerKind,
    },
    EventDue {
        generation: u64,
        step_index: usize,
        event_index: usize,
    },
}

/// Cloneable handle to a running engine.
#[derive(Clone)]
pub struct PlaybackHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    snapshot: watch::Receiver<PlaybackSnapshot>,
}

impl PlaybackHandle {
    fn send(&self, command: EngineCommand) {
        // The engine task outlives every handle; a send can only fail during
        // process teardown, where dropping the message is fine.
        let _ = self.commands.send(command);
    }

    pub fn open_menu(&self) {
        self.send(EngineCommand::Action(PlaybackAction::OpenMenu));
    }

    pub fn start_scenario(&self, id: impl Into<String>) {
        self.send(EngineCommand::Action(PlaybackAction::StartScenario {
            id: id.into(),
        }));
    }

    pub fn start_tour(&self) {
        self.send(EngineCommand::Action(PlaybackAction::StartTour));
    }

    pub fn next_step(&self) {
        self.send(EngineCommand::Action(PlaybackAction::NextStep));
    }

    pub fn prev_step(&self) {
        self.send(EngineCommand::Action(PlaybackAction::PrevStep));
    }

    pub fn pause(&self) {
        self.send(EngineCommand::Action(PlaybackAction::Pause));
    }

    pub fn resume(&self) {
        self.send(EngineCommand::Action(PlaybackAction::Resume));
    }

    pub fn toggle_presenter_mode(&self) {
        self.send(EngineCommand::Action(PlaybackAction::TogglePresenterMode));
    }

    pub fn complete_interaction(&self) {
        self.send(EngineCommand::Action(PlaybackAction::CompleteInteraction));
    }

    pub fn close(&self) {
        self.send(EngineCommand::Action(PlaybackAction::Close));
    }

    /// Speech collaborator callback: the narration for the step identified
    /// by `generation` finished speaking.
    pub fn narration_complete(&self, generation: u64) {
        self.send(EngineCommand::NarrationComplete { generation });
    }

    /// Speech collaborator callback: the ATC command for the step
    /// identified by `generation` finished speaking.
    pub fn command_complete(&self, generation: u64) {
        self.send(EngineCommand::CommandComplete { generation });
    }

    /// Subscribe to snapshot updates.
    pub fn snapshot(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot.clone()
    }

    /// The latest snapshot.
    pub fn current(&self) -> PlaybackSnapshot {
        self.snapshot.borrow().clone()
    }
}

/// Receiving ends of the engine's collaborator channels.
pub struct EngineOutputs {
    /// One cue per step activation, for the speech/narration collaborator.
    pub speech_cues: mpsc::UnboundedReceiver<SpeechCue>,
    /// One entry per spoken ATC command, for the command-log collaborator.
    pub command_log: mpsc::UnboundedReceiver<CommandLogEntry>,
}

/// Factory for the engine task.
pub struct PlaybackEngine;

impl PlaybackEngine {
    /// Spawn the engine over `catalog` and return its handle and output
    /// channels. The task runs until the process exits.
    #[instrument(skip(catalog), fields(scenarios = catalog.len()))]
    pub fn spawn(catalog: ScenarioCatalog) -> (PlaybackHandle, EngineOutputs) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(PlaybackSnapshot::default());
        let (speech_tx, speech_rx) = mpsc::unbounded_channel();
        let (log_tx, log_rx) = mpsc::unbounded_channel();

        let task = EngineTask {
            catalog,
            state: PlaybackState::default(),
            pacing: PacingCalculator::new(),
            ledger: EventLedger::new(),
            session: None,
            generation: 0,
            commands: command_tx.clone(),
            snapshot: snapshot_tx,
            speech: speech_tx,
            command_log: log_tx,
        };

        tokio::spawn(task.run(command_rx));
        info!("playback engine started");

        (
            PlaybackHandle {
                commands: command_tx,
                snapshot: snapshot_rx,
            },
            EngineOutputs {
                speech_cues: speech_rx,
                command_log: log_rx,
            },
        )
    }
}

struct EngineTask {
    catalog: ScenarioCatalog,
    state: PlaybackState,
    pacing: PacingCalculator,
    ledger: EventLedger,
    session: Option<StepSession>,
    /// Monotonic token; bumped on every session boundary.
    generation: u64,
    /// Loopback sender used by timer tasks.
    commands: mpsc::UnboundedSender<EngineCommand>,
    snapshot: watch::Sender<PlaybackSnapshot>,
    speech: mpsc::UnboundedSender<SpeechCue>,
    command_log: mpsc::UnboundedSender<CommandLogEntry>,
}

impl EngineTask {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<EngineCommand>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
    }

    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Action(action) => self.apply(action),
            EngineCommand::NarrationComplete { generation } => {
                self.on_narration_complete(generation)
            }
            EngineCommand::CommandComplete { generation } => self.on_command_complete(generation),
            EngineCommand::TimerFired { generation, timer } => self.on_timer(generation, timer),
            EngineCommand::EventDue {
                generation,
                step_index,
                event_index,
            } => self.on_event_due(generation, step_index, event_index),
        }
    }

    /// Run an action through the pure reducer, then reconcile sessions and
    /// timers with whatever changed.
    #[instrument(skip(self), fields(action = ?action))]
    fn apply(&mut self, action: PlaybackAction) {
        let next = transition(&self.state, &action, &self.catalog);
        let prev = std::mem::replace(&mut self.state, next);
        self.reconcile(&prev, &action);
        self.publish();
    }

    fn reconcile(&mut self, prev: &PlaybackState, action: &PlaybackAction) {
        let now_playing = self.state.mode == PlaybackMode::Playing;
        let was_playing = prev.mode == PlaybackMode::Playing;

        // A scenario was (re)entered: explicit start, or tour chaining
        // swapped the scenario underneath NextStep. A refused start (unknown
        // id) leaves the state untouched and must not count.
        let scenario_entered = match action {
            PlaybackAction::StartScenario { id } => {
                now_playing && self.state.scenario_id() == Some(id.as_str())
            }
            PlaybackAction::StartTour => now_playing && self.state.is_tour,
            _ => now_playing && prev.scenario_id() != self.state.scenario_id(),
        };

        let step_changed = scenario_entered
            || prev.scenario_id() != self.state.scenario_id()
            || prev.current_step_index != self.state.current_step_index;

        let needs_activation = now_playing && (scenario_entered || step_changed || !was_playing);

        // Hard ordering requirement: the old session's timers are canceled
        // before any new step's timers are armed.
        if self.session.is_some() && (!now_playing || needs_activation) {
            self.cancel_session();
        }

        if scenario_entered || self.state.current_scenario.is_none() {
            self.pacing.reset();
            self.ledger.reset();
        }

        if needs_activation {
            self.activate_step();
        }
    }

    /// Arm a new session for the current step: event timers, safety timer,
    /// and either the speech cue or the fixed advance timer.
    fn activate_step(&mut self) {
        let Some(step) = self.state.current_step().cloned() else {
            return;
        };
        let step_index = self.state.current_step_index;

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let mut session = StepSession::new(step_index, generation, &step);

        info!(
            scenario = self.state.scenario_id().unwrap_or("-"),
            step = %step.id,
            step_index,
            "step activated"
        );

        for (event_index, event) in self.ledger.pending_for(step_index, &step) {
            let handle = self.spawn_timer(
                Duration::from_millis(event.delay_ms),
                EngineCommand::EventDue {
                    generation,
                    step_index,
                    event_index,
                },
            );
            session.register_timer(handle);
        }

        let handle = self.spawn_timer(
            session.max_duration,
            EngineCommand::TimerFired {
                generation,
                timer: TimerKind::Safety,
            },
        );
        session.register_timer(handle);

        if !session.wait_for_audio {
            // No audio signals awaited: one timer at min + pause does it all.
            let pause = self.pacing.calculate_pause(&step, step.has_command());
            let handle = self.spawn_timer(
                session.min_duration + Duration::from_millis(pause),
                EngineCommand::TimerFired {
                    generation,
                    timer: TimerKind::Fixed,
                },
            );
            session.register_timer(handle);
        }

        // The cue goes out either way; for non-waiting steps the narration
        // simply is not load-bearing.
        let _ = self.speech.send(SpeechCue {
            generation,
            narrative_text: step.narrative_text.clone(),
            atc_command_text: step.atc_command_text.clone(),
        });

        self.session = Some(session);
    }

    /// Cancel the live session and invalidate its generation before any new
    /// session can be created.
    fn cancel_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.cancel();
            debug!(step_index = session.step_index, "step session canceled");
        }
        self.generation = self.generation.wrapping_add(1);
    }

    fn on_narration_complete(&mut self, generation: u64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.generation != generation {
            debug!(generation, "dropping stale narration completion");
            return;
        }
        if session.narration_done {
            return;
        }
        session.narration_done = true;
        debug!(step_index = session.step_index, "narration complete");
        self.try_advance();
    }

    fn on_command_complete(&mut self, generation: u64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.generation != generation {
            debug!(generation, "dropping stale command completion");
            return;
        }
        if session.command_done {
            return;
        }
        session.command_done = true;

        if let Some(text) = self
            .state
            .current_step()
            .and_then(|s| s.atc_command_text.as_deref())
        {
            let entry = CommandLogEntry::from_command_text(text);
            debug!(callsign = %entry.callsign, "command spoken, logging");
            let _ = self.command_log.send(entry);
        }

        self.try_advance();
    }

    fn on_timer(&mut self, generation: u64, timer: TimerKind) {
        {
            let Some(session) = self.session.as_ref() else {
                return;
            };
            if session.generation != generation {
                debug!(generation, ?timer, "dropping stale timer");
                return;
            }
        }

        match timer {
            TimerKind::Safety => {
                if self.state.pending_interaction.is_some() {
                    // An unanswered interaction holds the timeline, full stop.
                    debug!("safety timeout reached while interaction pending; holding");
                } else {
                    warn!("safety timeout reached, force-advancing");
                    self.apply(PlaybackAction::NextStep);
                }
            }
            TimerKind::MinFloor => {
                if let Some(session) = self.session.as_mut() {
                    session.floor_armed = false;
                }
                self.try_advance();
            }
            TimerKind::Fixed | TimerKind::AdvancePause => self.advance(),
        }
    }

    fn on_event_due(&mut self, generation: u64, step_index: usize, event_index: usize) {
        {
            let Some(session) = self.session.as_ref() else {
                return;
            };
            if session.generation != generation {
                debug!(generation, event_index, "dropping stale event");
                return;
            }
        }

        self.ledger.mark_fired(step_index, event_index);

        let Some(mutation) = self
            .state
            .current_step()
            .and_then(|s| s.events.get(event_index))
            .map(|e| e.mutation.clone())
        else {
            warn!(step_index, event_index, "event fired for a missing step event");
            return;
        };

        apply_mutation(&mut self.state.world_state, &mutation);
        self.publish();
    }

    /// Readiness check for audio-waiting steps. Arms at most one pacing
    /// pause per session; signals arriving before the minimum dwell time
    /// arm a floor timer for the remainder instead of advancing early.
    fn try_advance(&mut self) {
        let (generation, decision) = {
            let Some(session) = self.session.as_ref() else {
                return;
            };
            if !session.wait_for_audio || session.advance_armed {
                return;
            }
            (session.generation, session.readiness(Instant::now()))
        };

        match decision {
            Readiness::WaitingSignals => {}
            Readiness::WaitingFloor(remaining) => {
                let already_armed = self
                    .session
                    .as_ref()
                    .is_some_and(|session| session.floor_armed);
                if !already_armed {
                    let handle = self.spawn_timer(
                        remaining,
                        EngineCommand::TimerFired {
                            generation,
                            timer: TimerKind::MinFloor,
                        },
                    );
                    if let Some(session) = self.session.as_mut() {
                        session.floor_armed = true;
                        session.register_timer(handle);
                    }
                    debug!(remaining_ms = remaining.as_millis() as u64, "min-duration floor armed");
                }
            }
            Readiness::Ready => {
                let Some(step) = self.state.current_step().cloned() else {
                    return;
                };
                let pause = self.pacing.calculate_pause(&step, step.has_command());
                let handle = self.spawn_timer(
                    Duration::from_millis(pause),
                    EngineCommand::TimerFired {
                        generation,
                        timer: TimerKind::AdvancePause,
                    },
                );
                if let Some(session) = self.session.as_mut() {
                    session.advance_armed = true;
                    session.register_timer(handle);
                }
                debug!(pause_ms = pause, "advance armed behind pacing pause");
            }
        }
    }

    /// Timer-driven advance. The interaction gate wins over every timer.
    fn advance(&mut self) {
        if self.state.pending_interaction.is_some() {
            debug!("advance ready but held by pending interaction");
            return;
        }
        self.apply(PlaybackAction::NextStep);
    }

    fn spawn_timer(&self, delay: Duration, command: EngineCommand) -> AbortHandle {
        let commands = self.commands.clone();
        let task = tokio::spawn(async move {
            sleep(delay).await;
            let _ = commands.send(command);
        });
        task.abort_handle()
    }

    fn publish(&self) {
        self.snapshot.send_replace(snapshot_of(&self.state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use towerdemo_shared::scenario::{Scenario, Step};

    fn catalog() -> ScenarioCatalog {
        let mut scenario = Scenario::new("solo", "Solo", "");
        scenario.add_step(
            Step::new("s1", "First beat.")
                .with_min_duration(1000)
                .with_max_duration(5000)
                .with_command("United 88, hold short runway 27"),
        );
        scenario.add_step(
            Step::new("s2", "Second beat.")
                .with_min_duration(1000)
                .with_max_duration(5000),
        );
        ScenarioCatalog::new(vec![scenario])
    }

    #[tokio::test(start_paused = true)]
    async fn activation_emits_a_speech_cue_with_fresh_generation() {
        let (handle, mut outputs) = PlaybackEngine::spawn(catalog());
        handle.start_scenario("solo");

        let cue = outputs.speech_cues.recv().await.unwrap();
        assert_eq!(cue.narrative_text, "First beat.");
        assert!(cue.atc_command_text.is_some());

        handle.next_step();
        let cue2 = outputs.speech_cues.recv().await.unwrap();
        assert_eq!(cue2.narrative_text, "Second beat.");
        assert!(cue2.generation > cue.generation);
    }

    #[tokio::test(start_paused = true)]
    async fn command_completion_publishes_a_log_entry_once() {
        let (handle, mut outputs) = PlaybackEngine::spawn(catalog());
        handle.start_scenario("solo");

        let cue = outputs.speech_cues.recv().await.unwrap();
        handle.command_complete(cue.generation);
        handle.command_complete(cue.generation); // duplicate, must not re-log

        let entry = outputs.command_log.recv().await.unwrap();
        assert_eq!(entry.callsign, "United 88");

        // Give the duplicate a chance to (incorrectly) arrive.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(outputs.command_log.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_completions_do_not_satisfy_the_new_step() {
        let (handle, mut outputs) = PlaybackEngine::spawn(catalog());
        handle.start_scenario("solo");
        let old_cue = outputs.speech_cues.recv().await.unwrap();

        handle.next_step();
        let _new_cue = outputs.speech_cues.recv().await.unwrap();

        // Signals for the previous step's generation arrive late.
        handle.narration_complete(old_cue.generation);
        handle.command_complete(old_cue.generation);

        // Well past min duration + any pacing pause, but far from the 5s
        // safety timeout: a stale-satisfied step would have advanced.
        tokio::time::sleep(Duration::from_millis(4000)).await;
        let snapshot = handle.current();
        assert_eq!(snapshot.current_step_index, 1);
        assert_eq!(snapshot.mode, PlaybackMode::Playing);
    }
}
