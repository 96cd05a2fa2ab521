//! Numeric constants shared by the geometry operations

/// Lowest strength a generated point may get, so it stays visible
pub const STRENGTH_MIN: f32 = 0.003;

/// Smallest spacing/distance an operation accepts
pub const DIST_EPSILON: f32 = f32::EPSILON;

/// Tolerance for landing exactly on a stored end point while marching
pub const MARCH_LANDING_EPSILON: f32 = 1e-5;

/// Bend magnitude below which an outline corner is treated as straight
pub const PERIMETER_STRAIGHT_EPSILON: f32 = 1e-4;

/// Miter length used when the computed one is zero or negative
pub const PERIMETER_MIN_MITER: f32 = 0.01;

/// Fraction of the way to the first point used for seam points
pub const CLOSE_SEAM_FACTOR: f32 = 0.99;

/// Fallback overshoot fraction when the requested one is not finite
pub const STRETCH_FALLBACK_OVERSHOOT: f32 = 0.1;

/// Points on each side of a join seam that get smoothed
pub const JOIN_SEAM_SAMPLES: usize = 8;

/// Distance below which two segments are considered to intersect
pub const INTERSECT_EPSILON: f32 = 1e-5;
