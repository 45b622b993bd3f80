use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use posturers::metrics::MetricsConfig;
use posturers::pose::library;
use posturers::{
    AnalysisConfig, AsymmetryAnalyzer, BodyMetrics, JointAngles, Landmark, LandmarkFrame,
    LandmarkIndex, PoseClassifier, PostureMonitor, PostureScorer, PredicateClassifier,
};

/// Performance benchmarks for the per-frame analysis path
///
/// Frames arrive at camera rate, so everything here should stay well under
/// a frame interval.

fn create_frame(sway: f64) -> LandmarkFrame {
    use LandmarkIndex as L;
    let mut frame = LandmarkFrame::empty();
    let points = [
        (L::Nose, 0.5, 0.15),
        (L::LeftEar, 0.46, 0.16),
        (L::RightEar, 0.54, 0.16),
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
        frame.set(index, Landmark::new(x + sway, y, 0.0, 0.95));
    }
    frame
}

fn create_recording(frames: usize) -> Vec<LandmarkFrame> {
    (0..frames)
        .map(|i| create_frame((i as f64 * 0.1).sin() * 0.01))
        .collect()
}

fn bench_metric_extraction(c: &mut Criterion) {
    let config = MetricsConfig::default();
    let frame = create_frame(0.0);

    c.bench_function("body_metrics_from_frame", |b| {
        b.iter(|| BodyMetrics::from_frame(black_box(&frame), &config));
    });
    c.bench_function("joint_angles_from_frame", |b| {
        b.iter(|| JointAngles::from_frame(black_box(&frame), &config));
    });
}

fn bench_scoring(c: &mut Criterion) {
    let scorer = PostureScorer::new();
    let metrics = BodyMetrics {
        forward_head: Some(2.4),
        shoulder_tilt: Some(1.1),
        pelvis_tilt: Some(0.6),
        knee_angle: Some(172.0),
        trunk_tilt: Some(3.0),
    };

    c.bench_function("posture_analysis", |b| {
        b.iter(|| scorer.analyze(black_box(&metrics)));
    });

    let analyzer = AsymmetryAnalyzer::new();
    let angles = JointAngles::from_frame(&create_frame(0.0), &MetricsConfig::default());
    c.bench_function("balance_report", |b| {
        b.iter(|| analyzer.analyze(black_box(&angles)));
    });
}

fn bench_monitor(c: &mut Criterion) {
    let mut group = c.benchmark_group("Posture Monitor");

    for &size in &[30, 300, 1800] {
        let frames = create_recording(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("process_frames", size),
            &frames,
            |b, frames| {
                b.iter(|| {
                    let mut monitor = PostureMonitor::new(AnalysisConfig::default())
                        .expect("default config is valid");
                    for frame in frames {
                        black_box(monitor.process_frame(frame));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_pose_classification(c: &mut Criterion) {
    let classifier = PredicateClassifier::new();
    let poses = vec![
        library::squat_bottom(),
        library::wall_sit(),
        library::arms_overhead(),
        library::arms_lateral(),
        library::standing(),
    ];
    let frame = create_frame(0.0);

    c.bench_function("classify_against_library", |b| {
        b.iter(|| classifier.classify(black_box(&frame), &poses));
    });
}

criterion_group!(
    benches,
    bench_metric_extraction,
    bench_scoring,
    bench_monitor,
    bench_pose_classification
);
criterion_main!(benches);
