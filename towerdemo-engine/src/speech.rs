//! Simulated speech collaborator for the headless presenter.
//!
//! The real dashboard wires the engine to a TTS system; headless runs get
//! this stand-in, which "speaks" by sleeping proportionally to the text
//! length and then firing the completion callbacks with the cue's
//! generation token. A mute mode never completes anything, which is the
//! easiest way to watch the safety timeout carry the show.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{debug, info};

use towerdemo_shared::SpeechCue;

use crate::playback::PlaybackHandle;

/// Timing profile for the simulated voice.
#[derive(Debug, Clone)]
pub struct SpeechProfile {
    /// Milliseconds of "speaking" per character of text
    pub ms_per_char: u64,
    /// Floor so one-word lines still take a beat
    pub min_utterance_ms: u64,
    /// Ceiling so long narration does not dominate the safety timeout
    pub max_utterance_ms: u64,
    /// Never deliver completion callbacks
    pub mute: bool,
}

impl Default for SpeechProfile {
    fn default() -> Self {
        Self {
            ms_per_char: 30,
            min_utterance_ms: 600,
            max_utterance_ms: 8000,
            mute: false,
        }
    }
}

impl SpeechProfile {
    pub fn speaking_time(&self, text: &str) -> Duration {
        let ms = (text.chars().count() as u64 * self.ms_per_char)
            .clamp(self.min_utterance_ms, self.max_utterance_ms);
        Duration::from_millis(ms)
    }
}

/// Spawn the simulator task. Cues are processed in arrival order; a cue
/// that is superseded mid-utterance simply produces stale completions,
/// which the engine drops by generation.
pub fn spawn_simulator(
    handle: PlaybackHandle,
    mut cues: mpsc::UnboundedReceiver<SpeechCue>,
    profile: SpeechProfile,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if profile.mute {
            info!("speech simulator muted; completion callbacks disabled");
        }

        while let Some(cue) = cues.recv().await {
            if profile.mute {
                debug!(generation = cue.generation, "swallowing cue (muted)");
                continue;
            }

            sleep(profile.speaking_time(&cue.narrative_text)).await;
            debug!(generation = cue.generation, "narration spoken");
            handle.narration_complete(cue.generation);

            if let Some(command) = &cue.atc_command_text {
                sleep(profile.speaking_time(command)).await;
                debug!(generation = cue.generation, "command spoken");
                handle.command_complete(cue.generation);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaking_time_scales_with_length() {
        let profile = SpeechProfile::default();
        let short = profile.speaking_time("brief");
        let long = profile.speaking_time(
            "a considerably longer narration line that should take a while to read aloud",
        );
        assert!(long > short);
    }

    #[test]
    fn speaking_time_is_clamped() {
        let profile = SpeechProfile::default();
        assert_eq!(
            profile.speaking_time("x"),
            Duration::from_millis(profile.min_utterance_ms)
        );

        let very_long = "word ".repeat(500);
        assert_eq!(
            profile.speaking_time(&very_long),
            Duration::from_millis(profile.max_utterance_ms)
        );
    }
}
