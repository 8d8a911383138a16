//! Advanced Mahony demonstration
//!
//! Simulates a tumbling sensor with a biased, noisy gyroscope and a
//! magnetometer that drops out for a few seconds, runs the filter against it
//! and compares the estimate with the ground truth.
//!
//! Features demonstrated:
//! - Full MARG fusion (gyro + accel + mag)
//! - Automatic gravity-only fallback while the magnetometer is unavailable
//! - Integral feedback converging onto the gyroscope bias
//! - Custom settings
//! - CSV export and plotting of the results
//!
//! Run with: `cargo run --example advanced`

use mahony_ahrs::{FusionMode, Mahony, MahonySettings, QuaternionExt};
use nalgebra::{UnitQuaternion, Vector3};
use plotters::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Serialize;
use std::error::Error;

const SAMPLE_RATE: f32 = 100.0; // 100 Hz
const DURATION: f32 = 60.0; // seconds
const MAGNETOMETER_DROPOUT: std::ops::Range<f32> = 20.0..25.0;

#[derive(Debug, Serialize)]
struct ResultRow {
    #[serde(rename = "Time (s)")]
    time: f32,
    #[serde(rename = "Roll (deg)")]
    roll: f32,
    #[serde(rename = "Pitch (deg)")]
    pitch: f32,
    #[serde(rename = "Yaw (deg)")]
    yaw: f32,
    #[serde(rename = "True Roll (deg)")]
    true_roll: f32,
    #[serde(rename = "True Pitch (deg)")]
    true_pitch: f32,
    #[serde(rename = "True Yaw (deg)")]
    true_yaw: f32,
    #[serde(rename = "Error (deg)")]
    error: f32,
    #[serde(rename = "Bias X (rad/s)")]
    bias_x: f32,
    #[serde(rename = "Bias Y (rad/s)")]
    bias_y: f32,
    #[serde(rename = "Bias Z (rad/s)")]
    bias_z: f32,
    #[serde(rename = "Magnetometer unavailable")]
    magnetometer_unavailable: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("Advanced Mahony Example - MARG fusion with bias estimation");

    let settings = MahonySettings {
        sample_frequency: SAMPLE_RATE,
        two_kp: 2.0 * 1.0, // faster convergence than the default
        two_ki: 2.0 * 0.05,
    };
    let mut mahony = Mahony::with_settings(settings)?;
    println!(
        "Filter configured at {:.0} Hz, 2Kp = {:.2}, 2Ki = {:.2}",
        settings.sample_frequency, settings.two_kp, settings.two_ki
    );

    let mut rng = Pcg64::seed_from_u64(2024);
    let dt = 1.0 / SAMPLE_RATE;
    let gyroscope_bias = Vector3::new(0.015, -0.02, 0.01);
    let gravity = Vector3::new(0.0, 0.0, 1.0);
    let earth_field = Vector3::new(0.45, 0.0, -0.89);

    let mut truth = UnitQuaternion::from_euler_angles(0.2, -0.1, 0.5);
    let mut rows = Vec::new();

    let samples = (DURATION * SAMPLE_RATE) as usize;
    println!("Processing {} simulated samples...", samples);

    for i in 0..samples {
        let time = i as f32 * dt;

        // Ground truth motion in the body frame
        let rate = Vector3::new(
            0.6 * (0.5 * time).sin(),
            0.4 * (0.3 * time).cos(),
            0.25 * (0.2 * time).sin(),
        );
        truth *= UnitQuaternion::from_scaled_axis(rate * dt);

        let noise = |rng: &mut Pcg64, scale: f32| {
            Vector3::new(
                rng.random_range(-scale..scale),
                rng.random_range(-scale..scale),
                rng.random_range(-scale..scale),
            )
        };

        let gyroscope = rate + gyroscope_bias + noise(&mut rng, 0.005);
        let accelerometer = truth.inverse() * gravity + noise(&mut rng, 0.01);
        let magnetometer = if MAGNETOMETER_DROPOUT.contains(&time) {
            Vector3::zeros()
        } else {
            truth.inverse() * earth_field + noise(&mut rng, 0.02)
        };

        let status = mahony.update(gyroscope, accelerometer, magnetometer);

        let estimate = mahony.quaternion().to_euler().to_degrees();
        let expected = truth.to_euler().to_degrees();
        let error = mahony.quaternion().angle_to(&truth).to_degrees();
        let bias = -mahony.integral_feedback();

        if i % 1000 == 0 {
            println!(
                "t={:5.1}s: orientation=({:.1}°,{:.1}°,{:.1}°) error={:.2}° mode={:?}",
                time, estimate.roll, estimate.pitch, estimate.yaw, error, status.mode
            );
        }

        rows.push(ResultRow {
            time,
            roll: estimate.roll,
            pitch: estimate.pitch,
            yaw: estimate.yaw,
            true_roll: expected.roll,
            true_pitch: expected.pitch,
            true_yaw: expected.yaw,
            error,
            bias_x: bias.x,
            bias_y: bias.y,
            bias_z: bias.z,
            magnetometer_unavailable: status.mode == FusionMode::Imu,
        });
    }

    let mut writer = csv::Writer::from_path("advanced_results.csv")?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    println!("✓ Results saved to advanced_results.csv");

    println!("Generating plots...");
    create_plots(&rows, gyroscope_bias)?;
    println!("✓ Plots saved to advanced_plots.png");

    let final_bias = -mahony.integral_feedback();
    println!(
        "Estimated gyroscope bias ({:.4}, {:.4}, {:.4}) rad/s, true ({:.4}, {:.4}, {:.4}) rad/s",
        final_bias.x, final_bias.y, final_bias.z, gyroscope_bias.x, gyroscope_bias.y, gyroscope_bias.z
    );
    Ok(())
}

/// Four panels: estimated vs true Euler angles, angle error, bias estimate, fallback flag
fn create_plots(rows: &[ResultRow], gyroscope_bias: Vector3<f32>) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new("advanced_plots.png", (1000, 1000)).into_drawing_area();
    root.fill(&WHITE)?;

    let height_ratios = [5, 2, 2, 1];
    let total_height: u32 = height_ratios.iter().sum();
    let mut y_offset = 0;
    let mut charts = Vec::new();

    for &ratio in &height_ratios {
        let height = (ratio * 1000) / total_height;
        let area = root.margin(10, 10, y_offset, 1000 - y_offset - height);
        charts.push(area);
        y_offset += height;
    }

    let time_range = rows[0].time..rows[rows.len() - 1].time;

    // 1. Euler angles, estimate solid and truth in a lighter shade
    let mut euler_chart = ChartBuilder::on(&charts[0])
        .caption("Mahony Estimate vs Ground Truth", ("sans-serif", 20))
        .margin(5)
        .x_label_area_size(0)
        .y_label_area_size(50)
        .build_cartesian_2d(time_range.clone(), -180f32..180f32)?;

    euler_chart.configure_mesh().y_desc("Degrees").draw()?;

    let series: [(&str, fn(&ResultRow) -> f32, fn(&ResultRow) -> f32, RGBColor); 3] = [
        ("Roll", |r| r.roll, |r| r.true_roll, RED),
        ("Pitch", |r| r.pitch, |r| r.true_pitch, GREEN),
        ("Yaw", |r| r.yaw, |r| r.true_yaw, BLUE),
    ];
    for (label, estimate, truth, color) in series {
        euler_chart
            .draw_series(LineSeries::new(
                rows.iter().map(|r| (r.time, truth(r))),
                color.mix(0.3),
            ))?;
        euler_chart
            .draw_series(LineSeries::new(rows.iter().map(|r| (r.time, estimate(r))), &color))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], color));
    }

    euler_chart.configure_series_labels().draw()?;

    // 2. Angle between estimate and truth
    let max_error = rows.iter().map(|r| r.error).fold(1.0f32, f32::max);
    let mut error_chart = ChartBuilder::on(&charts[1])
        .margin(5)
        .x_label_area_size(0)
        .y_label_area_size(50)
        .build_cartesian_2d(time_range.clone(), 0f32..max_error)?;

    error_chart.configure_mesh().y_desc("Degrees").draw()?;

    error_chart
        .draw_series(LineSeries::new(rows.iter().map(|r| (r.time, r.error)), &BLACK))?
        .label("Orientation error")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], BLACK));

    error_chart.configure_series_labels().draw()?;

    // 3. Bias estimate against the injected bias
    let mut bias_chart = ChartBuilder::on(&charts[2])
        .margin(5)
        .x_label_area_size(0)
        .y_label_area_size(50)
        .build_cartesian_2d(time_range.clone(), -0.05f32..0.05f32)?;

    bias_chart.configure_mesh().y_desc("rad/s").draw()?;

    let bias_series: [(&str, fn(&ResultRow) -> f32, f32, RGBColor); 3] = [
        ("Bias X", |r| r.bias_x, gyroscope_bias.x, RED),
        ("Bias Y", |r| r.bias_y, gyroscope_bias.y, GREEN),
        ("Bias Z", |r| r.bias_z, gyroscope_bias.z, BLUE),
    ];
    for (label, estimate, actual, color) in bias_series {
        bias_chart.draw_series(LineSeries::new(
            [(time_range.start, actual), (time_range.end, actual)],
            color.mix(0.3),
        ))?;
        bias_chart
            .draw_series(LineSeries::new(rows.iter().map(|r| (r.time, estimate(r))), &color))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], color));
    }

    bias_chart.configure_series_labels().draw()?;

    // 4. Gravity-only fallback flag
    let mut flag_chart = ChartBuilder::on(&charts[3])
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(time_range, -0.1f32..1.1f32)?;

    flag_chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_label_formatter(&|y| {
            if *y < 0.5 {
                "False".to_string()
            } else {
                "True".to_string()
            }
        })
        .draw()?;

    flag_chart
        .draw_series(LineSeries::new(
            rows.iter()
                .map(|r| (r.time, if r.magnetometer_unavailable { 1.0 } else { 0.0 })),
            &CYAN,
        ))?
        .label("Magnetometer unavailable")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], CYAN));

    flag_chart.configure_series_labels().draw()?;

    root.present()?;
    Ok(())
}
