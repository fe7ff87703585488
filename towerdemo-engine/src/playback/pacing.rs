//! Inter-step pause computation.
//!
//! Pauses between steps are what make the playback feel narrated rather
//! than mechanical: a beat after a speaker change, a longer one after an
//! emergency call, barely any during fast sequences. The calculator keeps
//! one piece of session memory (the previous speaker) and is otherwise a
//! pure function of the step.
//!
//! Speaker and drama detection are heuristics over free text, so they live
//! behind [`SpeechClassifier`] where they can be swapped without touching
//! the timing machinery.

use regex::Regex;

use towerdemo_shared::scenario::{PacingClass, Step};

/// Who a step's narration is voiced as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Narrator,
    Controller,
    Pilot,
}

/// Classification capability over narrative text.
pub trait SpeechClassifier: Send {
    fn classify(&self, text: &str) -> Speaker;
    fn is_dramatic(&self, text: &str) -> bool;
}

/// Keywords that force the dramatic pause regardless of step flags.
const DRAMATIC_KEYWORDS: &[&str] = &[
    "mayday",
    "pan-pan",
    "emergency",
    "critical",
    "hijack",
    "collision",
    "impact",
    "fire",
    "souls on board",
];

/// Default classifier: a small ordered rule set, first match wins.
pub struct RegexClassifier {
    rules: Vec<(Regex, Speaker)>,
}

impl Default for RegexClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexClassifier {
    pub fn new() -> Self {
        // Rule order matters: controller phraseology is checked before the
        // pilot patterns because both can open with a facility name.
        let rules = vec![
            (
                Regex::new(r"(?i)^\s*(tower|ground|approach|departure|center|control)\b")
                    .expect("static classifier pattern"),
                Speaker::Controller,
            ),
            (
                Regex::new(r"(?i)\b(mayday|pan-pan|souls on board|request(ing)?\s+(vectors?|priority|clearance|deviation))\b")
                    .expect("static classifier pattern"),
                Speaker::Pilot,
            ),
            (
                Regex::new(r"(?i)^\s*\w+\s+\w*\d+\w*\b.*\b(checks in|reports|advises|declares|asks)\b")
                    .expect("static classifier pattern"),
                Speaker::Pilot,
            ),
        ];

        Self { rules }
    }
}

impl SpeechClassifier for RegexClassifier {
    fn classify(&self, text: &str) -> Speaker {
        for (pattern, speaker) in &self.rules {
            if pattern.is_match(text) {
                return *speaker;
            }
        }
        Speaker::Narrator
    }

    fn is_dramatic(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        DRAMATIC_KEYWORDS.iter().any(|kw| lowered.contains(kw))
    }
}

/// Pause duration constants, overridable for tests or taste.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    pub dramatic_pause_ms: u64,
    pub character_switch_pause_ms: u64,
    pub same_speaker_pause_ms: u64,
    pub command_typing_pause_ms: u64,
    pub fast_multiplier: f64,
    pub dramatic_multiplier: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            dramatic_pause_ms: 3000,
            character_switch_pause_ms: 1500,
            same_speaker_pause_ms: 800,
            command_typing_pause_ms: 1000,
            fast_multiplier: 0.6,
            dramatic_multiplier: 1.5,
        }
    }
}

/// Computes the post-completion pause for each step.
///
/// One instance is owned per engine; it is `reset()` whenever playback
/// restarts (scenario entry, tour chaining, close) so speaker continuity
/// never leaks across unrelated scripts.
pub struct PacingCalculator {
    config: PacingConfig,
    classifier: Box<dyn SpeechClassifier>,
    last_speaker: Option<Speaker>,
}

impl Default for PacingCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl PacingCalculator {
    pub fn new() -> Self {
        Self::with_classifier(Box::new(RegexClassifier::new()))
    }

    pub fn with_classifier(classifier: Box<dyn SpeechClassifier>) -> Self {
        Self {
            config: PacingConfig::default(),
            classifier,
            last_speaker: None,
        }
    }

    pub fn with_config(mut self, config: PacingConfig) -> Self {
        self.config = config;
        self
    }

    /// Compute the pause to insert after `step` completes.
    ///
    /// An explicit `pause_override_ms` is returned verbatim and leaves the
    /// speaker-continuity state untouched.
    pub fn calculate_pause(&mut self, step: &Step, has_command: bool) -> u64 {
        if let Some(override_ms) = step.pause_override_ms {
            return override_ms;
        }

        let speaker = self.classifier.classify(&step.narrative_text);
        let emphatic = step.emphasize || self.classifier.is_dramatic(&step.narrative_text);

        let base_ms = if emphatic {
            self.config.dramatic_pause_ms
        } else if self.last_speaker.is_some_and(|last| last != speaker) {
            self.config.character_switch_pause_ms
        } else {
            self.config.same_speaker_pause_ms
        };

        let multiplier = match step.pacing {
            PacingClass::Fast => self.config.fast_multiplier,
            PacingClass::Normal => 1.0,
            PacingClass::Dramatic => self.config.dramatic_multiplier,
        };

        let mut total = base_ms as f64 * multiplier;
        if has_command {
            total += self.config.command_typing_pause_ms as f64;
        }

        self.last_speaker = Some(speaker);
        total.round() as u64
    }

    /// Clear speaker continuity. Called whenever a playback session
    /// restarts; skipping it would leak pacing state across scenarios.
    pub fn reset(&mut self) {
        self.last_speaker = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrator_step(text: &str) -> Step {
        Step::new("s", text)
    }

    #[test]
    fn first_step_uses_same_speaker_pause() {
        let mut pacing = PacingCalculator::new();
        let pause = pacing.calculate_pause(&narrator_step("The board is quiet."), false);
        assert_eq!(pause, 800);
    }

    #[test]
    fn dramatic_keyword_beats_speaker_continuity() {
        let mut pacing = PacingCalculator::new();
        pacing.calculate_pause(&narrator_step("The board is quiet."), false);

        // Same speaker, normal pacing class, but MAYDAY in the text.
        let pause = pacing.calculate_pause(
            &narrator_step("Then the MAYDAY call cuts through the frequency."),
            false,
        );
        assert_eq!(pause, 3000);
    }

    #[test]
    fn speaker_switch_with_command_totals_2500() {
        let mut pacing = PacingCalculator::new();
        // Step A: narrator voice, no command, no emphasis.
        let a = pacing.calculate_pause(&narrator_step("A calm afternoon over the sector."), false);
        assert_eq!(a, 800);

        // Step B: controller voice, has a command.
        let b = pacing.calculate_pause(
            &narrator_step("Tower clears the arrival without missing a beat."),
            true,
        );
        assert_eq!(b, 1500 + 1000);
    }

    #[test]
    fn pacing_class_multiplies_base_pause() {
        let mut pacing = PacingCalculator::new();
        let fast = pacing.calculate_pause(
            &narrator_step("Quick beat.").with_pacing(PacingClass::Fast),
            false,
        );
        assert_eq!(fast, 480); // 800 * 0.6

        let mut pacing = PacingCalculator::new();
        let dramatic = pacing.calculate_pause(
            &narrator_step("Slow beat.").with_pacing(PacingClass::Dramatic),
            false,
        );
        assert_eq!(dramatic, 1200); // 800 * 1.5
    }

    #[test]
    fn emphasize_flag_forces_dramatic_base() {
        let mut pacing = PacingCalculator::new();
        let pause = pacing.calculate_pause(&narrator_step("Nothing alarming here.").emphasized(), false);
        assert_eq!(pause, 3000);
    }

    #[test]
    fn dramatic_base_with_dramatic_class_stacks() {
        let mut pacing = PacingCalculator::new();
        let pause = pacing.calculate_pause(
            &narrator_step("EMERGENCY declared on final.").with_pacing(PacingClass::Dramatic),
            true,
        );
        assert_eq!(pause, (3000.0 * 1.5) as u64 + 1000);
    }

    #[test]
    fn override_returns_verbatim_and_keeps_state() {
        let mut pacing = PacingCalculator::new();
        pacing.calculate_pause(
            &narrator_step("Tower takes the handoff."), // controller voice
            false,
        );

        let pause = pacing.calculate_pause(&narrator_step("ignored").with_pause_override(123), true);
        assert_eq!(pause, 123);

        // The override did not update last_speaker: a narrator step next
        // still counts as a speaker switch from the controller step.
        let after = pacing.calculate_pause(&narrator_step("The room exhales."), false);
        assert_eq!(after, 1500);
    }

    #[test]
    fn reset_clears_speaker_continuity() {
        let mut pacing = PacingCalculator::new();
        pacing.calculate_pause(&narrator_step("Tower clears the runway."), false);
        pacing.reset();

        // Narrator after reset: no switch pause, back to the same-speaker base.
        let pause = pacing.calculate_pause(&narrator_step("A new scenario begins."), false);
        assert_eq!(pause, 800);
    }

    #[test]
    fn classifier_rules_first_match_wins() {
        let classifier = RegexClassifier::new();

        assert_eq!(
            classifier.classify("Tower clears United 88 to land."),
            Speaker::Controller
        );
        assert_eq!(
            classifier.classify("Speedbird 117 checks in from the boundary."),
            Speaker::Pilot
        );
        assert_eq!(
            classifier.classify("The crew transmits a MAYDAY call."),
            Speaker::Pilot
        );
        assert_eq!(
            classifier.classify("The afternoon shift settles in."),
            Speaker::Narrator
        );
    }

    #[test]
    fn drama_detection_is_case_insensitive_substring() {
        let classifier = RegexClassifier::new();
        assert!(classifier.is_dramatic("a Collision warning sounds"));
        assert!(classifier.is_dramatic("MAYDAY MAYDAY MAYDAY"));
        assert!(!classifier.is_dramatic("a routine handoff"));
    }
}
