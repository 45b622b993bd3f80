use uuid::Uuid;

use super::{ExerciseSession, SessionConfig, SessionCore, SessionEffect, SessionPhase, SetOutcome};
use crate::error::{ExerciseError, Result};
use crate::exercise::{ExerciseDefinition, ExerciseKind, SequenceStep};
use crate::landmarks::LandmarkFrame;
use crate::pose::{PoseClassifier, PoseMatch};

/// Pose sequence: `Ready → Countdown → Exercising → Resting → … →
/// Completed`.
///
/// While exercising, matching the current target pose starts its hold
/// timer. Holding it for the step's time advances to the next pose; passing
/// the last pose completes a cycle. Losing the pose early resets only the
/// hold timer.
#[derive(Debug, Clone)]
pub struct CycleSession {
    core: SessionCore,
    steps: Vec<SequenceStep>,
    target_cycles: u32,
    current_pose_index: usize,
    cycles_in_set: u32,

    /// Seconds left on the current pose, while it is held
    hold_remaining: Option<u32>,
}

impl CycleSession {
    pub fn new(definition: ExerciseDefinition, config: SessionConfig) -> Result<Self> {
        let (steps, target_cycles) = match &definition.kind {
            ExerciseKind::Sequence {
                poses,
                target_cycles,
            } => (poses.clone(), *target_cycles),
            ExerciseKind::Hold { .. } => {
                return Err(ExerciseError::InvalidParameter {
                    id: definition.id.clone(),
                    parameter: "kind".to_string(),
                    value: "hold".to_string(),
                }
                .into())
            }
        };
        Ok(Self {
            core: SessionCore::new(definition, config)?,
            steps,
            target_cycles,
            current_pose_index: 0,
            cycles_in_set: 0,
            hold_remaining: None,
        })
    }

    pub fn definition(&self) -> &ExerciseDefinition {
        &self.core.definition
    }

    pub fn current_pose_index(&self) -> usize {
        self.current_pose_index
    }

    pub fn cycles_in_set(&self) -> u32 {
        self.cycles_in_set
    }

    pub fn is_holding_pose(&self) -> bool {
        self.hold_remaining.is_some()
    }

    pub fn current_step(&self) -> &SequenceStep {
        &self.steps[self.current_pose_index]
    }

    pub fn accuracy(&self) -> f64 {
        self.core.accuracy()
    }

    /// Feed the classifier's verdict for one frame.
    ///
    /// Only a match for the current target pose counts.
    pub fn on_pose_match(&mut self, pose: Option<PoseMatch>) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        if !self.core.is_running() || self.core.phase != SessionPhase::Exercising {
            return effects;
        }

        let index = self.current_pose_index;
        let matched = pose
            .map(|m| m.name == self.steps[index].pose.name)
            .unwrap_or(false);
        self.core.record_observation(matched);

        match (matched, self.hold_remaining) {
            (true, None) => {
                self.hold_remaining = Some(self.steps[index].hold_seconds);
                effects.push(SessionEffect::PoseHoldStarted { index });
            }
            (false, Some(_)) => {
                self.hold_remaining = None;
                effects.push(SessionEffect::PoseHoldLost { index });
            }
            _ => {}
        }
        effects
    }

    fn target_prompt(&self) -> SessionEffect {
        SessionEffect::Speak(self.current_step().pose.name.replace('_', " "))
    }

    fn enter_exercising(&mut self, effects: &mut Vec<SessionEffect>) {
        self.core.enter(SessionPhase::Exercising, effects);
        self.current_pose_index = 0;
        self.cycles_in_set = 0;
        self.hold_remaining = None;
        self.core.remaining = 0;
        effects.push(self.target_prompt());
    }

    fn begin_set(&mut self, effects: &mut Vec<SessionEffect>) {
        effects.push(SessionEffect::Speak(self.core.announcement()));
        self.core.enter_countdown(effects);
    }

    fn exercise_tick(&mut self, effects: &mut Vec<SessionEffect>) {
        let Some(remaining) = self.hold_remaining else {
            return;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.hold_remaining = Some(remaining);
            return;
        }

        let index = self.current_pose_index;
        self.hold_remaining = None;
        effects.push(SessionEffect::PoseCompleted { index });

        if index + 1 < self.steps.len() {
            self.current_pose_index += 1;
            effects.push(self.target_prompt());
            return;
        }

        self.current_pose_index = 0;
        self.cycles_in_set += 1;
        effects.push(SessionEffect::CycleCompleted {
            set: self.core.current_set,
            cycle: self.cycles_in_set,
        });
        effects.push(SessionEffect::Speak(self.cycles_in_set.to_string()));

        if self.cycles_in_set >= self.target_cycles {
            if self.core.complete_set(self.cycles_in_set, effects) == SetOutcome::NextSet {
                self.begin_set(effects);
            }
        } else {
            effects.push(self.target_prompt());
        }
    }
}

impl ExerciseSession for CycleSession {
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
        match self.core.phase {
            SessionPhase::Exercising => self.hold_remaining.unwrap_or(0),
            _ => self.core.remaining,
        }
    }

    fn start(&mut self) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        if self.core.phase == SessionPhase::Ready {
            self.begin_set(&mut effects);
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
            SessionPhase::Countdown => {
                if self.core.countdown_tick(&mut effects) {
                    self.enter_exercising(&mut effects);
                }
            }
            SessionPhase::Exercising => self.exercise_tick(&mut effects),
            SessionPhase::Resting => {
                if self.core.rest_tick() {
                    self.begin_set(&mut effects);
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
        if !self.core.is_running() || self.core.phase != SessionPhase::Exercising {
            return Vec::new();
        }
        let target = std::slice::from_ref(&self.current_step().pose);
        let matched = classifier.classify(frame, target);
        self.on_pose_match(matched)
    }
}
