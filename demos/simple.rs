use mahony_ahrs::{Mahony, Vector3Ext};
use nalgebra::Vector3;

const SAMPLE_FREQUENCY: f32 = 100.0; // 100 Hz

fn main() -> Result<(), mahony_ahrs::Error> {
    let mut mahony = Mahony::new(SAMPLE_FREQUENCY)?;

    for _ in 0..10 {
        // this loop should repeat each time new sensor data is available
        let gyroscope = Vector3::new(0.0, 0.0, 0.0).deg_to_rad(); // replace this with actual gyroscope data in degrees/s
        let accelerometer = Vector3::new(0.0, 0.0, 1.0); // replace this with actual accelerometer data
        let magnetometer = Vector3::zeros(); // zero means no magnetometer reading this cycle

        let status = mahony.update(gyroscope, accelerometer, magnetometer);

        let angles = mahony.euler().to_degrees();

        println!(
            "Roll: {:.2}, Pitch: {:.2}, Yaw: {:.2} ({:?})",
            angles.roll, angles.pitch, angles.yaw, status.mode
        );
    }

    Ok(())
}
