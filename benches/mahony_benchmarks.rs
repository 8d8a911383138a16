use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mahony_ahrs::{EulerAngles, Mahony, MahonySettings, fast_inverse_sqrt};
use nalgebra::Vector3;
use rand::prelude::*;
use rand_pcg::Pcg64;
use std::f32::consts::PI;

// Pre-generated sensor data to eliminate RNG overhead during benchmarks
struct PreGeneratedData {
    samples: Vec<(Vector3<f32>, Vector3<f32>, Vector3<f32>)>,
    index: usize,
}

impl PreGeneratedData {
    fn new(count: usize, seed: u64) -> Self {
        let mut rng = Pcg64::seed_from_u64(seed);
        let mut samples = Vec::with_capacity(count);

        for i in 0..count {
            let time = i as f32 * 0.01; // 100Hz sample rate
            let motion_phase = time * 0.5 * 2.0 * PI;

            // rad/s
            let gyroscope = Vector3::new(
                0.2 * motion_phase.sin() + rng.random_range(-0.01..0.01),
                0.2 * (motion_phase * 1.3).cos() + rng.random_range(-0.01..0.01),
                0.2 * (motion_phase * 0.7).sin() + rng.random_range(-0.01..0.01),
            );

            let accelerometer = Vector3::new(
                -0.1 * motion_phase.sin() + rng.random_range(-0.002..0.002),
                0.1 * motion_phase.cos() + rng.random_range(-0.002..0.002),
                1.0 + rng.random_range(-0.002..0.002),
            );

            let magnetometer = Vector3::new(
                0.6 + 0.05 * motion_phase.cos() + rng.random_range(-0.05..0.05),
                0.05 * motion_phase.sin() + rng.random_range(-0.05..0.05),
                -0.8 + rng.random_range(-0.05..0.05),
            );

            samples.push((gyroscope, accelerometer, magnetometer));
        }

        Self { samples, index: 0 }
    }

    fn next(&mut self) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>) {
        let sample = self.samples[self.index];
        self.index = (self.index + 1) % self.samples.len();
        sample
    }
}

/// Benchmark the MARG update with a moving sensor
fn bench_update(c: &mut Criterion) {
    let mut mahony = Mahony::default();
    let mut data = PreGeneratedData::new(1000, 42);

    c.bench_function("mahony_update", |b| {
        b.iter(|| {
            let (gyroscope, accelerometer, magnetometer) = data.next();
            mahony.update(
                black_box(gyroscope),
                black_box(accelerometer),
                black_box(magnetometer),
            )
        })
    });
}

/// Benchmark the gravity-only fallback
fn bench_update_no_magnetometer(c: &mut Criterion) {
    let mut mahony = Mahony::default();
    let mut data = PreGeneratedData::new(1000, 42);

    c.bench_function("mahony_update_no_magnetometer", |b| {
        b.iter(|| {
            let (gyroscope, accelerometer, _) = data.next();
            mahony.update(
                black_box(gyroscope),
                black_box(accelerometer),
                black_box(Vector3::zeros()),
            )
        })
    });
}

/// Benchmark the update with integral feedback disabled
fn bench_update_proportional_only(c: &mut Criterion) {
    let settings = MahonySettings {
        two_ki: 0.0,
        ..Default::default()
    };
    let mut mahony = Mahony::with_settings(settings).unwrap();
    let mut data = PreGeneratedData::new(1000, 42);

    c.bench_function("mahony_update_proportional_only", |b| {
        b.iter(|| {
            let (gyroscope, accelerometer, magnetometer) = data.next();
            mahony.update(
                black_box(gyroscope),
                black_box(accelerometer),
                black_box(magnetometer),
            )
        })
    });
}

/// Benchmark batch processing of sensor updates
fn bench_batch_updates(c: &mut Criterion) {
    let mut mahony = Mahony::default();
    let mut data = PreGeneratedData::new(1000, 7);

    c.bench_function("mahony_batch_100_updates", |b| {
        b.iter(|| {
            for _ in 0..100 {
                let (gyroscope, accelerometer, magnetometer) = data.next();
                mahony.update(
                    black_box(gyroscope),
                    black_box(accelerometer),
                    black_box(magnetometer),
                );
            }
        })
    });
}

/// Benchmark the bit-level reciprocal square root against the exact one
fn bench_inverse_sqrt(c: &mut Criterion) {
    c.bench_function("fast_inverse_sqrt", |b| {
        b.iter(|| fast_inverse_sqrt(black_box(97.3f32)))
    });
    c.bench_function("exact_inverse_sqrt", |b| {
        b.iter(|| 1.0 / black_box(97.3f32).sqrt())
    });
}

/// Benchmark the Euler readout
fn bench_euler(c: &mut Criterion) {
    let mut mahony = Mahony::default();
    let mut data = PreGeneratedData::new(100, 3);
    for _ in 0..100 {
        let (gyroscope, accelerometer, magnetometer) = data.next();
        mahony.update(gyroscope, accelerometer, magnetometer);
    }
    let quaternion = mahony.quaternion();

    c.bench_function("mahony_euler", |b| {
        b.iter(|| EulerAngles::from_quaternion(black_box(&quaternion)))
    });
}

/// Benchmark filter construction
fn bench_mahony_creation(c: &mut Criterion) {
    c.bench_function("mahony_new", |b| {
        b.iter(|| black_box(Mahony::new(black_box(100.0))))
    });
}

criterion_group!(
    benches,
    bench_update,
    bench_update_no_magnetometer,
    bench_update_proportional_only,
    bench_batch_updates,
    bench_inverse_sqrt,
    bench_euler,
    bench_mahony_creation
);

criterion_main!(benches);
