//! Integration tests for exercise sessions driven through the public API

use posturers::exercise::{ExerciseDefinition, SequenceStep};
use posturers::pose::library;
use posturers::{
    dispatch_effects, ExerciseCatalog, ExerciseResult, ExerciseSession, Landmark, LandmarkFrame,
    LandmarkIndex, PredicateClassifier, ResultSink, SessionConfig, SessionEffect, SessionFactory,
    SessionPhase, VoiceSink,
};

#[derive(Default)]
struct Host {
    spoken: Vec<String>,
    cancels: usize,
    stored: Vec<ExerciseResult>,
}

impl VoiceSink for Host {
    fn speak(&mut self, text: &str) {
        self.spoken.push(text.to_string());
    }

    fn cancel(&mut self) {
        self.cancels += 1;
    }
}

impl ResultSink for Host {
    fn store(&mut self, result: &ExerciseResult) {
        self.stored.push(result.clone());
    }
}

fn upright_frame() -> LandmarkFrame {
    use LandmarkIndex as L;
    let mut frame = LandmarkFrame::empty();
    let points = [
        (L::Nose, 0.5, 0.15),
        (L::LeftShoulder, 0.4, 0.3),
        (L::RightShoulder, 0.6, 0.3),
        (L::LeftElbow, 0.38, 0.45),
        (L::RightElbow, 0.62, 0.45),
        (L::LeftWrist, 0.37, 0.58),
        (L::RightWrist, 0.63, 0.58),
        (L::LeftHip, 0.44, 0.6),
        (L::RightHip, 0.56, 0.6),
        (L::LeftKnee, 0.44, 0.75),
        (L::RightKnee, 0.56, 0.75),
        (L::LeftAnkle, 0.44, 0.9),
        (L::RightAnkle, 0.56, 0.9),
    ];
    for (index, x, y) in points {
        frame.set(index, Landmark::new(x, y, 0.0, 0.95));
    }
    frame
}

fn arms_up_frame() -> LandmarkFrame {
    use LandmarkIndex as L;
    let mut frame = upright_frame();
    frame.set(L::LeftElbow, Landmark::new(0.4, 0.18, 0.0, 0.95));
    frame.set(L::RightElbow, Landmark::new(0.6, 0.18, 0.0, 0.95));
    frame.set(L::LeftWrist, Landmark::new(0.4, 0.05, 0.0, 0.95));
    frame.set(L::RightWrist, Landmark::new(0.6, 0.05, 0.0, 0.95));
    frame
}

fn run(
    session: &mut dyn ExerciseSession,
    voice: &mut Host,
    store: &mut Host,
    max_ticks: usize,
) -> usize {
    let mut ticks = 0;
    while !session.is_finished() && ticks < max_ticks {
        dispatch_effects(&session.tick(), voice, store);
        ticks += 1;
    }
    ticks
}

#[test]
fn test_builtin_plank_runs_to_completion() {
    let catalog = ExerciseCatalog::builtin();
    let config = SessionConfig::default();
    let mut session = SessionFactory::create(&catalog, "plank", &config).unwrap();

    let mut voice = Host::default();
    let mut store = Host::default();
    dispatch_effects(&session.start(), &mut voice, &mut store);

    let mut ticks = 0;
    while !session.is_finished() {
        dispatch_effects(&session.tick(), &mut voice, &mut store);
        ticks += 1;
    }

    // 3 sets × (3 announce + 3 countdown + 30 hold) + 2 rests × 30
    assert_eq!(ticks, 3 * 36 + 2 * 30);
    assert_eq!(session.phase(), SessionPhase::Completed);
    assert_eq!(store.stored.len(), 1);

    let result = &store.stored[0];
    assert_eq!(result.exercise_id, "plank");
    assert_eq!(result.session_id, session.session_id());
    assert_eq!(result.completed_reps, vec![1, 1, 1]);
    assert_eq!(result.accuracy, 0.0);

    assert_eq!(voice.spoken.first().unwrap(), "Set 1 of 3: Plank");
    assert_eq!(voice.spoken.last().unwrap(), "Exercise complete");
    assert_eq!(voice.spoken.iter().filter(|s| *s == "Hold").count(), 3);
}

#[test]
fn test_cancelled_session_stores_nothing() {
    let catalog = ExerciseCatalog::builtin();
    let mut session = SessionFactory::create(&catalog, "wall_sit", &SessionConfig::default()).unwrap();
    let mut voice = Host::default();
    let mut store = Host::default();
    dispatch_effects(&session.start(), &mut voice, &mut store);
    run(session.as_mut(), &mut voice, &mut store, 10);

    let effects = session.cancel();
    dispatch_effects(&effects, &mut voice, &mut store);
    assert!(session.is_finished());
    assert_eq!(voice.cancels, 1);
    assert!(session.cancel().is_empty());

    let ticks = run(session.as_mut(), &mut voice, &mut store, 500);
    assert_eq!(ticks, 0);
    assert!(store.stored.is_empty());
}

#[test]
fn test_sequence_driven_by_frames() {
    let definition = ExerciseDefinition::sequence(
        "reach",
        "Reach",
        1,
        0,
        2,
        vec![
            SequenceStep::new(library::standing(), 1),
            SequenceStep::new(library::arms_overhead(), 1),
        ],
    );
    let config = SessionConfig::default();
    let mut session = SessionFactory::from_definition(definition, &config).unwrap();
    let classifier = PredicateClassifier::new();

    session.start();
    for _ in 0..3 {
        session.tick();
    }
    assert_eq!(session.phase(), SessionPhase::Exercising);

    let mut all = Vec::new();
    for _ in 0..2 {
        for frame in [upright_frame(), arms_up_frame()] {
            all.extend(session.observe_frame(&frame, &classifier));
            all.extend(session.tick());
        }
    }

    assert_eq!(session.phase(), SessionPhase::Completed);
    assert!(all.contains(&SessionEffect::CycleCompleted { set: 1, cycle: 2 }));
    let result = all
        .iter()
        .find_map(|e| match e {
            SessionEffect::Completed(result) => Some(result.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(result.total_reps, 2);
    assert_eq!(result.accuracy, 100.0);
}

#[test]
fn test_wrong_pose_frames_lower_accuracy() {
    let definition = ExerciseDefinition::sequence(
        "reach",
        "Reach",
        1,
        0,
        1,
        vec![SequenceStep::new(library::arms_overhead(), 1)],
    );
    let mut session = SessionFactory::from_definition(definition, &SessionConfig::default()).unwrap();
    let classifier = PredicateClassifier::new();
    session.start();
    for _ in 0..3 {
        session.tick();
    }

    // Arms down: no hold starts
    assert!(session.observe_frame(&upright_frame(), &classifier).is_empty());
    assert!(session.tick().is_empty());

    session.observe_frame(&arms_up_frame(), &classifier);
    let effects = session.tick();
    assert_eq!(session.phase(), SessionPhase::Completed);
    let accuracy = effects
        .iter()
        .find_map(|e| match e {
            SessionEffect::Completed(result) => Some(result.accuracy),
            _ => None,
        })
        .unwrap();
    assert_eq!(accuracy, 50.0);
}

#[test]
fn test_sessions_are_send() {
    fn assert_send<T: Send>(_: &T) {}
    let session = SessionFactory::create(
        &ExerciseCatalog::builtin(),
        "squat",
        &SessionConfig::default(),
    )
    .unwrap();
    assert_send(&session);
}
