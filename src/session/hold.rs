use uuid::Uuid;

use super::{ExerciseSession, SessionConfig, SessionCore, SessionEffect, SessionPhase, SetOutcome};
use crate::error::{ExerciseError, Result};
use crate::exercise::{ExerciseDefinition, ExerciseKind};
use crate::landmarks::LandmarkFrame;
use crate::pose::{PoseClassifier, PoseDefinition};

/// Timed hold: `Ready → Announcing → Countdown → Holding → Resting → … →
/// Completed`.
///
/// The hold runs on ticks alone. Pose observations during `Holding` only
/// feed the accuracy figure.
#[derive(Debug, Clone)]
pub struct HoldSession {
    core: SessionCore,
    hold_seconds: u32,
    pose: Option<PoseDefinition>,
}

impl HoldSession {
    pub fn new(definition: ExerciseDefinition, config: SessionConfig) -> Result<Self> {
        let (hold_seconds, pose) = match &definition.kind {
            ExerciseKind::Hold { hold_seconds, pose } => (*hold_seconds, pose.clone()),
            ExerciseKind::Sequence { .. } => {
                return Err(ExerciseError::InvalidParameter {
                    id: definition.id.clone(),
                    parameter: "kind".to_string(),
                    value: "sequence".to_string(),
                }
                .into())
            }
        };
        Ok(Self {
            core: SessionCore::new(definition, config)?,
            hold_seconds,
            pose,
        })
    }

    pub fn definition(&self) -> &ExerciseDefinition {
        &self.core.definition
    }

    /// Record whether the current frame shows the target pose
    ///
    /// Only accuracy changes; the hold timer runs on ticks alone.
    pub fn observe_pose(&mut self, matched: bool) {
        if self.core.is_running() && self.core.phase == SessionPhase::Holding {
            self.core.record_observation(matched);
        }
    }

    pub fn accuracy(&self) -> f64 {
        self.core.accuracy()
    }

    fn enter_announcing(&mut self, effects: &mut Vec<SessionEffect>) {
        self.core.enter(SessionPhase::Announcing, effects);
        self.core.remaining = self.core.config.announce_seconds;
        effects.push(SessionEffect::Speak(self.core.announcement()));
    }

    fn enter_holding(&mut self, effects: &mut Vec<SessionEffect>) {
        self.core.enter(SessionPhase::Holding, effects);
        self.core.remaining = self.hold_seconds;
        effects.push(SessionEffect::Speak("Hold".to_string()));
    }

    fn hold_tick(&mut self, effects: &mut Vec<SessionEffect>) {
        self.core.remaining = self.core.remaining.saturating_sub(1);
        let remaining = self.core.remaining;

        if remaining == 0 {
            if self.core.complete_set(1, effects) == SetOutcome::NextSet {
                self.enter_announcing(effects);
            }
        } else if remaining <= self.core.config.spoken_countdown_seconds {
            effects.push(SessionEffect::Speak(remaining.to_string()));
        }
    }
}

impl ExerciseSession for HoldSession {
    fn session_id(&self) -> Uuid {
        self.core.id
    }

    fn exercise_id(&self) -> &str {
        &self.core.definition.id
    }

    fn phase(&self) -> SessionPhase {
        self.core.phase
    }

    fn is_paused(&self) -> bool {
        self.core.paused
    }

    fn current_set(&self) -> u32 {
        self.core.current_set
    }

    fn time_remaining(&self) -> u32 {
        self.core.remaining
    }

    fn start(&mut self) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        if self.core.phase == SessionPhase::Ready {
            self.enter_announcing(&mut effects);
        }
        effects
    }

    fn tick(&mut self) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        if !self.core.is_running() {
            return effects;
        }
        self.core.count_tick();

        match self.core.phase {
            SessionPhase::Announcing => {
                self.core.remaining = self.core.remaining.saturating_sub(1);
                if self.core.remaining == 0 {
                    self.core.enter_countdown(&mut effects);
                }
            }
            SessionPhase::Countdown => {
                if self.core.countdown_tick(&mut effects) {
                    self.enter_holding(&mut effects);
                }
            }
            SessionPhase::Holding => self.hold_tick(&mut effects),
            SessionPhase::Resting => {
                if self.core.rest_tick() {
                    self.enter_announcing(&mut effects);
                }
            }
            _ => {}
        }
        effects
    }

    fn pause(&mut self) -> Vec<SessionEffect> {
        self.core.pause()
    }

    fn resume(&mut self) -> Vec<SessionEffect> {
        self.core.resume()
    }

    fn cancel(&mut self) -> Vec<SessionEffect> {
        self.core.cancel()
    }

    fn observe_frame(
        &mut self,
        frame: &LandmarkFrame,
        classifier: &dyn PoseClassifier,
    ) -> Vec<SessionEffect> {
        if let Some(pose) = &self.pose {
            let matched = classifier
                .classify(frame, std::slice::from_ref(pose))
                .is_some();
            self.observe_pose(matched);
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{completed, spoken, Recorder};
    use super::super::dispatch_effects;
    use super::*;
    use crate::pose::library;

    fn plank(sets: u32, rest_seconds: u32, hold_seconds: u32) -> HoldSession {
        HoldSession::new(
            ExerciseDefinition::hold("plank", "Plank", sets, rest_seconds, hold_seconds, None),
            SessionConfig::default(),
        )
        .unwrap()
    }

    fn tick_n(session: &mut HoldSession, n: usize) -> Vec<SessionEffect> {
        (0..n).flat_map(|_| session.tick()).collect()
    }

    #[test]
    fn test_rejects_sequence_definition() {
        let definition = ExerciseDefinition::sequence(
            "squat",
            "Squat",
            1,
            0,
            1,
            vec![crate::exercise::SequenceStep::new(library::standing(), 1)],
        );
        assert!(HoldSession::new(definition, SessionConfig::default()).is_err());
    }

    #[test]
    fn test_announce_countdown_and_hold_speech() {
        let mut session = plank(1, 0, 7);

        let effects = session.start();
        assert_eq!(session.phase(), SessionPhase::Announcing);
        assert_eq!(spoken(&effects), vec!["Set 1 of 1: Plank"]);

        let effects = tick_n(&mut session, 3);
        assert_eq!(session.phase(), SessionPhase::Countdown);
        assert_eq!(spoken(&effects), vec!["3"]);

        let effects = tick_n(&mut session, 3);
        assert_eq!(session.phase(), SessionPhase::Holding);
        assert_eq!(spoken(&effects), vec!["2", "1", "Hold"]);
        assert_eq!(session.time_remaining(), 7);

        // Only the last five seconds are read out
        let effects = tick_n(&mut session, 6);
        assert_eq!(spoken(&effects), vec!["5", "4", "3", "2", "1"]);

        let effects = session.tick();
        assert_eq!(session.phase(), SessionPhase::Completed);
        assert!(effects.contains(&SessionEffect::SetCompleted { set: 1, reps: 1 }));
        assert!(completed(&effects).is_some());
    }

    #[test]
    fn test_total_ticks_to_completion() {
        let (sets, rest, hold) = (3u32, 4u32, 6u32);
        let mut session = plank(sets, rest, hold);
        session.start();

        let mut ticks = 0;
        let mut result = None;
        while !session.is_finished() {
            let effects = session.tick();
            ticks += 1;
            if let Some(r) = completed(&effects) {
                result = Some(r.clone());
            }
            assert!(ticks < 1000, "session never finished");
        }

        assert_eq!(ticks, sets * (3 + 3 + hold) + (sets - 1) * rest);
        let result = result.unwrap();
        assert_eq!(result.completed_sets, 3);
        assert_eq!(result.completed_reps, vec![1, 1, 1]);
        assert_eq!(result.total_reps, 3);
        assert_eq!(result.duration_seconds, ticks);
    }

    #[test]
    fn test_rest_then_next_set_announced() {
        let mut session = plank(2, 2, 1);
        session.start();
        let effects = tick_n(&mut session, 7);
        assert_eq!(session.phase(), SessionPhase::Resting);
        assert!(spoken(&effects).contains(&"Rest for 2 seconds".to_string()));

        let effects = tick_n(&mut session, 2);
        assert_eq!(session.phase(), SessionPhase::Announcing);
        assert_eq!(session.current_set(), 2);
        assert_eq!(spoken(&effects), vec!["Set 2 of 2: Plank"]);
    }

    #[test]
    fn test_zero_rest_goes_straight_to_next_set() {
        let mut session = plank(2, 0, 1);
        session.start();
        let effects = tick_n(&mut session, 7);
        assert_eq!(session.phase(), SessionPhase::Announcing);
        assert_eq!(session.current_set(), 2);
        assert!(!effects.iter().any(|e| matches!(
            e,
            SessionEffect::PhaseChanged {
                to: SessionPhase::Resting,
                ..
            }
        )));
    }

    #[test]
    fn test_pause_freezes_and_cancels_speech() {
        let mut session = plank(1, 0, 10);
        session.start();
        tick_n(&mut session, 7);
        assert_eq!(session.time_remaining(), 9);

        assert_eq!(session.pause(), vec![SessionEffect::CancelSpeech]);
        assert!(session.pause().is_empty());
        assert!(tick_n(&mut session, 5).is_empty());
        session.observe_pose(true);
        assert_eq!(session.time_remaining(), 9);

        session.resume();
        session.tick();
        assert_eq!(session.time_remaining(), 8);
        assert_eq!(session.accuracy(), 0.0);
    }

    #[test]
    fn test_pause_freezes_announce_and_countdown() {
        let mut session = plank(1, 0, 2);
        session.start();

        session.tick();
        assert_eq!(session.phase(), SessionPhase::Announcing);
        session.pause();
        assert!(tick_n(&mut session, 4).is_empty());
        session.resume();
        assert_eq!(session.time_remaining(), 2);

        let effects = tick_n(&mut session, 3);
        assert_eq!(session.phase(), SessionPhase::Countdown);
        assert_eq!(spoken(&effects), vec!["3", "2"]);
        assert_eq!(session.time_remaining(), 2);

        assert_eq!(session.pause(), vec![SessionEffect::CancelSpeech]);
        assert!(tick_n(&mut session, 5).is_empty());
        assert_eq!(session.time_remaining(), 2);
        assert_eq!(session.phase(), SessionPhase::Countdown);

        session.resume();
        let effects = tick_n(&mut session, 2);
        assert_eq!(spoken(&effects), vec!["1", "Hold"]);
        assert_eq!(session.phase(), SessionPhase::Holding);
    }

    #[test]
    fn test_pause_freezes_rest() {
        let mut session = plank(2, 3, 1);
        session.start();
        tick_n(&mut session, 7);
        assert_eq!(session.phase(), SessionPhase::Resting);

        session.tick();
        assert_eq!(session.time_remaining(), 2);
        session.pause();
        assert!(tick_n(&mut session, 10).is_empty());
        assert_eq!(session.time_remaining(), 2);
        assert_eq!(session.current_set(), 1);

        session.resume();
        assert!(spoken(&session.tick()).is_empty());
        let effects = session.tick();
        assert_eq!(session.phase(), SessionPhase::Announcing);
        assert_eq!(spoken(&effects), vec!["Set 2 of 2: Plank"]);

        // Paused ticks are not counted
        let result = loop {
            let effects = session.tick();
            if let Some(result) = completed(&effects) {
                break result.clone();
            }
        };
        assert_eq!(result.duration_seconds, 2 * 7 + 3);
    }

    #[test]
    fn test_cancel_is_terminal_and_idempotent() {
        let mut session = plank(2, 5, 10);
        session.start();
        tick_n(&mut session, 4);

        let effects = session.cancel();
        assert_eq!(effects[0], SessionEffect::CancelSpeech);
        assert_eq!(session.phase(), SessionPhase::Cancelled);
        assert!(completed(&effects).is_none());

        assert!(session.cancel().is_empty());
        assert!(session.tick().is_empty());
        assert!(session.start().is_empty());
        assert!(session.resume().is_empty());
        assert_eq!(session.phase(), SessionPhase::Cancelled);
    }

    #[test]
    fn test_accuracy_from_observations() {
        let mut session = HoldSession::new(
            ExerciseDefinition::hold(
                "wall_sit",
                "Wall Sit",
                1,
                0,
                5,
                Some(library::wall_sit()),
            ),
            SessionConfig::default(),
        )
        .unwrap();
        session.start();

        // Ignored outside Holding
        session.observe_pose(true);
        tick_n(&mut session, 6);
        for matched in [true, true, true, false] {
            session.observe_pose(matched);
        }

        let mut voice = Recorder::default();
        let mut store = Recorder::default();
        let effects = tick_n(&mut session, 5);
        dispatch_effects(&effects, &mut voice, &mut store);

        assert_eq!(store.results.len(), 1);
        assert_eq!(store.results[0].accuracy, 75.0);
        assert_eq!(voice.spoken.last().unwrap(), "Exercise complete");
    }

    #[test]
    fn test_observe_frame_uses_classifier() {
        use crate::metrics::test_frames::upright;
        use crate::pose::PredicateClassifier;

        let mut session = HoldSession::new(
            ExerciseDefinition::hold("stand", "Stand", 1, 0, 5, Some(library::standing())),
            SessionConfig::default(),
        )
        .unwrap();
        session.start();
        tick_n(&mut session, 6);

        let classifier = PredicateClassifier::new();
        session.observe_frame(&upright(), &classifier);
        assert_eq!(session.accuracy(), 100.0);
    }
}
