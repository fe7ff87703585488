//! Per-step playback session: the timing coordinator's mutable record.
//!
//! A session is created when a step activates and canceled on any way out
//! of the step (advance, backward navigation, pause, close). At most one
//! session is live at a time; its `generation` token is the happens-before
//! barrier that makes late timer callbacks and speech completions inert.

use tokio::task::AbortHandle;
use tokio::time::{Duration, Instant};

use towerdemo_shared::scenario::Step;

/// What the advance protocol should do next, given the session's signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Completion signals outstanding; keep waiting (the safety timer caps
    /// the wait).
    WaitingSignals,
    /// Signals are in but the minimum dwell time is not yet served; re-check
    /// after the remaining duration.
    WaitingFloor(Duration),
    /// Eligible to advance: arm the pacing pause.
    Ready,
}

/// Mutable per-step record owned by the engine shell.
#[derive(Debug)]
pub struct StepSession {
    pub step_index: usize,
    pub generation: u64,
    pub started_at: Instant,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub wait_for_audio: bool,
    pub narration_done: bool,
    pub command_done: bool,
    /// The pacing-pause timer has been armed; readiness checks stop.
    pub advance_armed: bool,
    /// A min-floor re-check timer is outstanding.
    pub floor_armed: bool,
    timers: Vec<AbortHandle>,
}

impl StepSession {
    /// Start a session for `step`. The safety timeout is clamped to sit
    /// strictly above the minimum dwell time; authoring validation should
    /// have rejected inverted bounds already, this is the runtime backstop.
    pub fn new(step_index: usize, generation: u64, step: &Step) -> Self {
        let min_ms = step.effective_min_duration_ms();
        let max_ms = step.effective_max_duration_ms().max(min_ms + 1);

        Self {
            step_index,
            generation,
            started_at: Instant::now(),
            min_duration: Duration::from_millis(min_ms),
            max_duration: Duration::from_millis(max_ms),
            wait_for_audio: step.wait_for_audio,
            narration_done: false,
            // A step without a command has nothing to wait for on that side.
            command_done: !step.has_command(),
            advance_armed: false,
            floor_armed: false,
            timers: Vec::new(),
        }
    }

    /// Track a timer so cancellation can reach it.
    pub fn register_timer(&mut self, handle: AbortHandle) {
        self.timers.push(handle);
    }

    /// Abort every timer armed for this session. The engine also bumps the
    /// generation, so an already-in-flight callback that raced the abort is
    /// still dropped on arrival.
    pub fn cancel(&mut self) {
        for handle in self.timers.drain(..) {
            handle.abort();
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// The advance decision, exclusive of the interaction gate (which the
    /// state machine layer owns).
    pub fn readiness(&self, now: Instant) -> Readiness {
        if !(self.narration_done && self.command_done) {
            return Readiness::WaitingSignals;
        }
        let elapsed = self.elapsed(now);
        if elapsed < self.min_duration {
            Readiness::WaitingFloor(self.min_duration - elapsed)
        } else {
            Readiness::Ready
        }
    }
}

impl Drop for StepSession {
    fn drop(&mut self) {
        self.cancel();
    }
}
