//! Chair placement around the table and the random rotations applied to props.

use std::ops::Range;

use nalgebra::Vector3 as Vec3;
use rand::Rng;
use shared::{domain::Vector3, error::SceneError};

/// Distance a chair is pushed out past the table's bound point.
pub const CHAIR_OFFSET_RANGE: Range<f64> = 0.25..1.0;
/// Yaw jitter applied to each chair after it faces the table, in degrees.
pub const CHAIR_YAW_RANGE: Range<f64> = -20.0..20.0;
/// Yaw applied to books and pens, in degrees.
pub const PROP_YAW_RANGE: Range<f64> = -360.0..360.0;

fn to_na(v: Vector3) -> Vec3<f64> {
    Vec3::new(v.x, v.y, v.z)
}

/// Pushes `bound_point` out along the ray from `table_center` by `scale`, then
/// drops the result to the floor.
pub fn chair_position(
    table_center: Vector3,
    bound_point: Vector3,
    scale: f64,
) -> Result<Vector3, SceneError> {
    let degenerate = || SceneError::DegenerateGeometry {
        center: table_center,
        bound: bound_point,
    };
    if !table_center.is_finite() || !bound_point.is_finite() {
        return Err(degenerate());
    }

    let bound = to_na(bound_point);
    let direction = (bound - to_na(table_center))
        .try_normalize(f64::EPSILON)
        .ok_or_else(degenerate)?;

    let placed = bound + direction * scale;
    Ok(Vector3::new(placed.x, 0.0, placed.z))
}

pub fn sample_chair_position<R: Rng + ?Sized>(
    table_center: Vector3,
    bound_point: Vector3,
    rng: &mut R,
) -> Result<Vector3, SceneError> {
    chair_position(table_center, bound_point, rng.gen_range(CHAIR_OFFSET_RANGE))
}

pub fn sample_chair_yaw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(CHAIR_YAW_RANGE)
}

pub fn sample_prop_yaw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(PROP_YAW_RANGE)
}
