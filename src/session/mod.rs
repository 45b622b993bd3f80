//! Exercise session state machines
//!
//! A session advances only through its transition methods: lifecycle
//! commands (`start`, `pause`, `resume`, `cancel`), one-second `tick`s and
//! pose observations. Each transition returns the [`SessionEffect`]s it
//! caused; the host carries them out (speech, persistence, UI updates).
//!
//! Two variants share [`SessionPhase`] and the set/rest discipline:
//! - [`HoldSession`]: announce, count down, hold for a fixed time
//! - [`CycleSession`]: count down, then step through a pose sequence for a
//!   number of cycles, each pose held for its own time
//!
//! Finished sessions (`Completed` or `Cancelled`) ignore every command.

mod cycle;
mod hold;

pub use cycle::CycleSession;
pub use hold::HoldSession;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ConfigError, Result};
use crate::exercise::{ExerciseCatalog, ExerciseDefinition, ExerciseKind};
use crate::geometry::round1;
use crate::landmarks::LandmarkFrame;
use crate::pose::PoseClassifier;

/// Session timing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Ticks spent announcing a set before the countdown
    pub announce_seconds: u32,

    /// Spoken countdown length before a set starts
    pub countdown_seconds: u32,

    /// Final seconds of a hold that are read out
    pub spoken_countdown_seconds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            announce_seconds: 3,
            countdown_seconds: 3,
            spoken_countdown_seconds: 5,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.announce_seconds == 0 {
            return Err(ConfigError::invalid(
                "session.announce_seconds",
                self.announce_seconds,
                "must be at least 1",
            ));
        }
        if self.countdown_seconds == 0 {
            return Err(ConfigError::invalid(
                "session.countdown_seconds",
                self.countdown_seconds,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    Ready,
    Announcing,
    Countdown,
    Holding,
    Exercising,
    Resting,
    Completed,
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Cancelled)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Ready => "Ready",
            SessionPhase::Announcing => "Announcing",
            SessionPhase::Countdown => "Countdown",
            SessionPhase::Holding => "Holding",
            SessionPhase::Exercising => "Exercising",
            SessionPhase::Resting => "Resting",
            SessionPhase::Completed => "Completed",
            SessionPhase::Cancelled => "Cancelled",
        };
        write!(f, "{}", name)
    }
}

/// Record of a finished session, handed to the persistence sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseResult {
    pub session_id: Uuid,
    pub exercise_id: String,
    pub completed_sets: u32,

    /// Reps per completed set: 1 per hold set, cycles per sequence set
    pub completed_reps: Vec<u32>,

    pub total_reps: u32,

    /// Percentage of observed frames that matched the target pose
    pub accuracy: f64,

    /// Active (unpaused) ticks from start to completion
    pub duration_seconds: u32,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEffect {
    Speak(String),
    CancelSpeech,
    PhaseChanged { from: SessionPhase, to: SessionPhase },
    PoseHoldStarted { index: usize },
    PoseHoldLost { index: usize },
    PoseCompleted { index: usize },
    CycleCompleted { set: u32, cycle: u32 },
    SetCompleted { set: u32, reps: u32 },
    Completed(ExerciseResult),
}

/// Speech output; fire-and-forget
pub trait VoiceSink {
    fn speak(&mut self, text: &str);
    fn cancel(&mut self);
}

/// Persistence for finished sessions
pub trait ResultSink {
    fn store(&mut self, result: &ExerciseResult);
}

/// Route speech effects to `voice` and the final result to `results`.
///
/// Other effects are informational and left to the host.
pub fn dispatch_effects(
    effects: &[SessionEffect],
    voice: &mut dyn VoiceSink,
    results: &mut dyn ResultSink,
) {
    for effect in effects {
        match effect {
            SessionEffect::Speak(text) => voice.speak(text),
            SessionEffect::CancelSpeech => voice.cancel(),
            SessionEffect::Completed(result) => results.store(result),
            _ => {}
        }
    }
}

/// Common interface over both session variants
pub trait ExerciseSession: Send {
    fn session_id(&self) -> Uuid;
    fn exercise_id(&self) -> &str;
    fn phase(&self) -> SessionPhase;
    fn is_paused(&self) -> bool;

    /// 1-based set in progress
    fn current_set(&self) -> u32;

    /// Seconds left in the current timed phase or pose hold
    fn time_remaining(&self) -> u32;

    fn start(&mut self) -> Vec<SessionEffect>;
    fn tick(&mut self) -> Vec<SessionEffect>;
    fn pause(&mut self) -> Vec<SessionEffect>;
    fn resume(&mut self) -> Vec<SessionEffect>;
    fn cancel(&mut self) -> Vec<SessionEffect>;

    /// Feed one frame through `classifier` against the current target pose
    fn observe_frame(
        &mut self,
        frame: &LandmarkFrame,
        classifier: &dyn PoseClassifier,
    ) -> Vec<SessionEffect>;

    fn is_finished(&self) -> bool {
        self.phase().is_terminal()
    }
}

/// Builds the session variant matching an exercise's kind
pub struct SessionFactory;

impl SessionFactory {
    pub fn create(
        catalog: &ExerciseCatalog,
        exercise_id: &str,
        config: &SessionConfig,
    ) -> Result<Box<dyn ExerciseSession>> {
        let definition = catalog.get(exercise_id)?.clone();
        Self::from_definition(definition, config)
    }

    pub fn from_definition(
        definition: ExerciseDefinition,
        config: &SessionConfig,
    ) -> Result<Box<dyn ExerciseSession>> {
        let session: Box<dyn ExerciseSession> = match definition.kind {
            ExerciseKind::Hold { .. } => Box::new(HoldSession::new(definition, config.clone())?),
            ExerciseKind::Sequence { .. } => {
                Box::new(CycleSession::new(definition, config.clone())?)
            }
        };
        Ok(session)
    }
}

/// What follows a completed set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetOutcome {
    Completed,
    Resting,
    NextSet,
}

/// State and bookkeeping shared by both variants
#[derive(Debug, Clone)]
pub(crate) struct SessionCore {
    pub(crate) id: Uuid,
    pub(crate) definition: ExerciseDefinition,
    pub(crate) config: SessionConfig,
    pub(crate) phase: SessionPhase,
    pub(crate) paused: bool,

    /// Ticks left in the current timed phase
    pub(crate) remaining: u32,

    pub(crate) current_set: u32,
    pub(crate) completed_reps: Vec<u32>,
    frames_observed: u64,
    frames_matched: u64,
    elapsed_seconds: u32,
}

impl SessionCore {
    pub(crate) fn new(definition: ExerciseDefinition, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        definition.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            definition,
            config,
            phase: SessionPhase::Ready,
            paused: false,
            remaining: 0,
            current_set: 1,
            completed_reps: Vec::new(),
            frames_observed: 0,
            frames_matched: 0,
            elapsed_seconds: 0,
        })
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Started, not paused and not finished
    pub(crate) fn is_running(&self) -> bool {
        !self.paused && !self.is_finished() && self.phase != SessionPhase::Ready
    }

    pub(crate) fn enter(&mut self, to: SessionPhase, effects: &mut Vec<SessionEffect>) {
        let from = self.phase;
        if from == to {
            return;
        }
        debug!(
            session = %self.id,
            exercise = %self.definition.id,
            %from,
            %to,
            "Session phase changed"
        );
        self.phase = to;
        effects.push(SessionEffect::PhaseChanged { from, to });
    }

    pub(crate) fn announcement(&self) -> String {
        format!(
            "Set {} of {}: {}",
            self.current_set, self.definition.sets, self.definition.name
        )
    }

    /// Count one active second
    pub(crate) fn count_tick(&mut self) {
        self.elapsed_seconds += 1;
    }

    pub(crate) fn enter_countdown(&mut self, effects: &mut Vec<SessionEffect>) {
        self.enter(SessionPhase::Countdown, effects);
        self.remaining = self.config.countdown_seconds;
        effects.push(SessionEffect::Speak(self.remaining.to_string()));
    }

    /// Advance the countdown; true once it has run out
    pub(crate) fn countdown_tick(&mut self, effects: &mut Vec<SessionEffect>) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            effects.push(SessionEffect::Speak(self.remaining.to_string()));
            false
        } else {
            true
        }
    }

    /// Advance the rest period; true once it has run out and the next set
    /// is current
    pub(crate) fn rest_tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.current_set += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn record_observation(&mut self, matched: bool) {
        self.frames_observed += 1;
        if matched {
            self.frames_matched += 1;
        }
    }

    pub(crate) fn accuracy(&self) -> f64 {
        if self.frames_observed == 0 {
            return 0.0;
        }
        round1(self.frames_matched as f64 / self.frames_observed as f64 * 100.0)
    }

    /// Book the current set and move to rest, the next set, or completion
    pub(crate) fn complete_set(&mut self, reps: u32, effects: &mut Vec<SessionEffect>) -> SetOutcome {
        let set = self.current_set;
        self.completed_reps.push(reps);
        effects.push(SessionEffect::SetCompleted { set, reps });
        info!(
            session = %self.id,
            exercise = %self.definition.id,
            set,
            reps,
            "Set completed"
        );

        if self.completed_reps.len() as u32 >= self.definition.sets {
            self.enter(SessionPhase::Completed, effects);
            effects.push(SessionEffect::Speak("Exercise complete".to_string()));
            let result = self.result();
            info!(
                session = %self.id,
                exercise = %self.definition.id,
                total_reps = result.total_reps,
                accuracy = result.accuracy,
                "Exercise completed"
            );
            effects.push(SessionEffect::Completed(result));
            SetOutcome::Completed
        } else if self.definition.rest_seconds > 0 {
            self.enter(SessionPhase::Resting, effects);
            self.remaining = self.definition.rest_seconds;
            effects.push(SessionEffect::Speak(format!(
                "Rest for {} seconds",
                self.definition.rest_seconds
            )));
            SetOutcome::Resting
        } else {
            self.current_set += 1;
            SetOutcome::NextSet
        }
    }

    pub(crate) fn result(&self) -> ExerciseResult {
        ExerciseResult {
            session_id: self.id,
            exercise_id: self.definition.id.clone(),
            completed_sets: self.completed_reps.len() as u32,
            completed_reps: self.completed_reps.clone(),
            total_reps: self.completed_reps.iter().sum(),
            accuracy: self.accuracy(),
            duration_seconds: self.elapsed_seconds,
        }
    }

    pub(crate) fn pause(&mut self) -> Vec<SessionEffect> {
        if self.is_finished() || self.paused || self.phase == SessionPhase::Ready {
            return Vec::new();
        }
        self.paused = true;
        debug!(session = %self.id, phase = %self.phase, "Session paused");
        vec![SessionEffect::CancelSpeech]
    }

    pub(crate) fn resume(&mut self) -> Vec<SessionEffect> {
        if self.is_finished() || !self.paused {
            return Vec::new();
        }
        self.paused = false;
        debug!(session = %self.id, phase = %self.phase, "Session resumed");
        Vec::new()
    }

    pub(crate) fn cancel(&mut self) -> Vec<SessionEffect> {
        if self.is_finished() {
            return Vec::new();
        }
        let mut effects = vec![SessionEffect::CancelSpeech];
        self.paused = false;
        self.enter(SessionPhase::Cancelled, &mut effects);
        info!(
            session = %self.id,
            exercise = %self.definition.id,
            completed_sets = self.completed_reps.len(),
            "Session cancelled"
        );
        effects
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Collects speech and stored results
    #[derive(Debug, Default)]
    pub struct Recorder {
        pub spoken: Vec<String>,
        pub cancels: usize,
        pub results: Vec<ExerciseResult>,
    }

    impl VoiceSink for Recorder {
        fn speak(&mut self, text: &str) {
            self.spoken.push(text.to_string());
        }

        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    impl ResultSink for Recorder {
        fn store(&mut self, result: &ExerciseResult) {
            self.results.push(result.clone());
        }
    }

    pub fn spoken(effects: &[SessionEffect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                SessionEffect::Speak(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn completed(effects: &[SessionEffect]) -> Option<&ExerciseResult> {
        effects.iter().find_map(|e| match e {
            SessionEffect::Completed(result) => Some(result),
            _ => None,
        })
    }
}
