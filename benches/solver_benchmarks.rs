//! Benchmarks for pose solving, smoothing and the full pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mirror_retarget::{
    config::{Config, RetargetConfig},
    filters::FilterKind,
    landmarks::{HandLandmark, Landmark3D, PoseLandmark, TrackingFrame},
    math::{basis_to_quaternion, orthonormal_basis, shortest_arc},
    pipeline::RetargetPipeline,
    smoother::LandmarkSmoother,
    solver::PoseSolver,
};
use nalgebra::Vector3;
use std::time::Duration;

/// Tracker-space frame of a user in T-pose, with a little noise
fn noisy_frame(timestamp: f64) -> TrackingFrame {
    let jitter = || 0.005 * (rand::random::<f32>() - 0.5);
    let body: [(PoseLandmark, [f32; 3]); 21] = [
        (PoseLandmark::Nose, [0.0, -0.72, -0.1]),
        (PoseLandmark::LeftEar, [0.07, -0.72, 0.0]),
        (PoseLandmark::RightEar, [-0.07, -0.72, 0.0]),
        (PoseLandmark::LeftShoulder, [0.2, -0.5, 0.0]),
        (PoseLandmark::RightShoulder, [-0.2, -0.5, 0.0]),
        (PoseLandmark::LeftElbow, [0.5, -0.5, 0.0]),
        (PoseLandmark::RightElbow, [-0.5, -0.5, 0.0]),
        (PoseLandmark::LeftWrist, [0.75, -0.5, 0.0]),
        (PoseLandmark::RightWrist, [-0.75, -0.5, 0.0]),
        (PoseLandmark::LeftIndex, [0.85, -0.5, -0.02]),
        (PoseLandmark::RightIndex, [-0.85, -0.5, -0.02]),
        (PoseLandmark::LeftPinky, [0.85, -0.5, 0.02]),
        (PoseLandmark::RightPinky, [-0.85, -0.5, 0.02]),
        (PoseLandmark::LeftHip, [0.1, 0.0, 0.0]),
        (PoseLandmark::RightHip, [-0.1, 0.0, 0.0]),
        (PoseLandmark::LeftKnee, [0.1, 0.4, 0.0]),
        (PoseLandmark::RightKnee, [-0.1, 0.4, 0.0]),
        (PoseLandmark::LeftAnkle, [0.1, 0.8, 0.0]),
        (PoseLandmark::RightAnkle, [-0.1, 0.8, 0.0]),
        (PoseLandmark::LeftFootIndex, [0.1, 0.8, -0.15]),
        (PoseLandmark::RightFootIndex, [-0.1, 0.8, -0.15]),
    ];

    let mut landmarks = vec![Landmark3D::new(0.0, 0.0, 0.0, 0.0); PoseLandmark::COUNT];
    for (index, [x, y, z]) in body {
        landmarks[index as usize] = Landmark3D::new(x + jitter(), y + jitter(), z + jitter(), 0.95);
    }

    let hand = |outward: f32| -> Vec<Landmark3D> {
        (0..HandLandmark::COUNT)
            .map(|i| {
                let along = 0.75 + 0.01 * i as f32;
                Landmark3D::new(outward * along + jitter(), -0.5 + jitter(), 0.01 * (i % 4) as f32, 0.9)
            })
            .collect()
    };

    TrackingFrame::new(timestamp, landmarks).with_hands(Some(hand(1.0)), Some(hand(-1.0)))
}

fn benchmark_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver");
    let frame = mirror_retarget::transform::transform_frame(&noisy_frame(0.0), true);

    for (name, fingers) in [("body", false), ("body_and_fingers", true)] {
        let solver = PoseSolver::new(RetargetConfig {
            enable_fingers: fingers,
            ..RetargetConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("solve_target", name), &frame, |b, frame| {
            b.iter(|| black_box(solver.solve_target(black_box(frame))));
        });
    }

    group.finish();
}

fn benchmark_smoother(c: &mut Criterion) {
    let mut group = c.benchmark_group("smoother");

    let frames: Vec<TrackingFrame> = (0..30).map(|i| noisy_frame(f64::from(i) * 33.0)).collect();
    let kinds = [
        ("none", FilterKind::None),
        ("exponential", FilterKind::parse("exponential").unwrap()),
        ("kalman", FilterKind::parse("kalman").unwrap()),
        ("one_euro", FilterKind::default()),
    ];

    for (name, kind) in kinds {
        let mut smoother = LandmarkSmoother::new(kind).unwrap();
        group.bench_with_input(BenchmarkId::new("frames_30", name), &frames, |b, frames| {
            b.iter(|| {
                smoother.reset();
                for frame in frames {
                    black_box(smoother.smooth_frame(frame));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.measurement_time(Duration::from_secs(10));

    let frames: Vec<TrackingFrame> = (0..300).map(|i| noisy_frame(f64::from(i) * 33.0)).collect();
    let mut config = Config::default();
    config.retarget.enable_fingers = true;

    group.bench_function("ten_seconds_at_30fps", |b| {
        b.iter(|| {
            let mut pipeline = RetargetPipeline::new(&config).unwrap();
            for frame in &frames {
                black_box(pipeline.process(black_box(frame)));
            }
        });
    });

    group.finish();
}

fn benchmark_rotation_math(c: &mut Criterion) {
    let mut group = c.benchmark_group("rotation_math");

    let from = Vector3::new(1.0, 0.0, 0.0);
    let to = Vector3::new(0.3, -0.8, 0.2);
    group.bench_function("shortest_arc", |b| {
        b.iter(|| black_box(shortest_arc(black_box(&from), black_box(&to))));
    });

    let right = Vector3::new(0.9, 0.1, -0.3);
    let up = Vector3::new(0.0, 1.0, 0.1);
    group.bench_function("basis_to_quaternion", |b| {
        b.iter(|| {
            let basis = orthonormal_basis(black_box(&right), black_box(&up));
            black_box(basis.map(|m| basis_to_quaternion(&m)))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_solver,
    benchmark_smoother,
    benchmark_pipeline,
    benchmark_rotation_math
);
criterion_main!(benches);
