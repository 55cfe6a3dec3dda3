//! Keyframe animation resolver
//!
//! Samples a driver at a query time. Times are sorted, so the neighbouring
//! keyframes are found by binary search; queries past the last keyframe
//! clamp to it, queries at or before the first keyframe hold it.

use crate::foundation::math::Vec3;
use crate::scene::objects::{Channel, Driver, Interpolation};

/// Small angle below which spherical interpolation degrades to a blend
const SLERP_ANGLE_EPSILON: f32 = 1e-5;

/// An interpolated driver value, shaped by the channel's arity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverValue {
    /// Translation or scale sample
    Vec3(Vec3),
    /// Rotation quaternion sample, stored x, y, z, w
    Quat([f32; 4]),
}

/// Interpolate `driver` at `time`
pub fn sample(driver: &Driver, time: f32) -> DriverValue {
    let arity = driver.channel.arity();
    let count = driver.times.len();
    let tuple = |index: usize| &driver.values[index * arity..(index + 1) * arity];

    // First sample with time >= query.
    let index = driver.times.partition_point(|&t| t < time);

    let mut out = [0.0f32; 4];
    if index >= count {
        // Query beyond the last keyframe: clamp.
        out[..arity].copy_from_slice(tuple(count - 1));
    } else if index == 0 {
        out[..arity].copy_from_slice(tuple(0));
    } else {
        match driver.interpolation {
            Interpolation::Step => out[..arity].copy_from_slice(tuple(index - 1)),
            Interpolation::Linear => {
                let lerp = (time - driver.times[index])
                    / (driver.times[index - 1] - driver.times[index]);
                let earlier = tuple(index - 1);
                let later = tuple(index);
                for component in 0..arity {
                    out[component] =
                        lerp * earlier[component] + (1.0 - lerp) * later[component];
                }
            }
            Interpolation::Slerp => {
                out = slerp(tuple(index - 1), tuple(index), time - driver.times[index - 1]);
            }
        }
    }

    match driver.channel {
        Channel::Translation | Channel::Scale => {
            DriverValue::Vec3(Vec3::new(out[0], out[1], out[2]))
        }
        Channel::Rotation => DriverValue::Quat(out),
    }
}

/// Spherical interpolation between two quaternion tuples
///
/// The later quaternion is negated when the pair's dot product is negative,
/// so the blend always takes the shortest path.
fn slerp(earlier: &[f32], later: &[f32], t: f32) -> [f32; 4] {
    let mut b = [later[0], later[1], later[2], later[3]];
    let mut dot =
        earlier[0] * b[0] + earlier[1] * b[1] + earlier[2] * b[2] + earlier[3] * b[3];
    if dot < 0.0 {
        for component in &mut b {
            *component = -*component;
        }
        dot = -dot;
    }

    let angle = dot.clamp(-1.0, 1.0).acos();
    let mut out = [0.0f32; 4];
    if angle < SLERP_ANGLE_EPSILON {
        // Nearly parallel quaternions: the sine weights are degenerate.
        for component in 0..4 {
            out[component] = (1.0 - t) * earlier[component] + t * b[component];
        }
    } else {
        let sin_angle = angle.sin();
        let weight_earlier = ((1.0 - t) * angle).sin() / sin_angle;
        let weight_later = (t * angle).sin() / sin_angle;
        for component in 0..4 {
            out[component] = weight_earlier * earlier[component] + weight_later * b[component];
        }
    }
    out
}
