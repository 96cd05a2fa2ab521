//! Shared settings for the stroke geometry operations
//!
//! Each tunable operation in the `stroke` crate takes one of these structs.
//! They are plain serde data so a host application can keep them in its own
//! settings file and hand them over as JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default smoothing influence (0.0 = no change, 1.0 = full smooth)
pub const DEFAULT_SMOOTH_INFLUENCE: f32 = 0.5;

/// Default number of neighbours on each side used by the smoothing kernel
pub const DEFAULT_SMOOTH_ITERATIONS: u32 = 2;

/// Default fraction of the stroke used to estimate curvature when stretching
pub const DEFAULT_OVERSHOOT_FAC: f32 = 0.1;

/// Default number of points added on each stretched end
pub const DEFAULT_EXTRA_POINT_COUNT: u32 = 10;

/// Default exponent applied to segment lengths in the curvature estimate
pub const DEFAULT_SEGMENT_INFLUENCE: f32 = 0.0;

/// Default per-corner cutoff for the curvature estimate (radians)
pub const DEFAULT_MAX_ANGLE: f32 = std::f32::consts::FRAC_PI_2 + std::f32::consts::FRAC_PI_4;

/// Default cap subdivisions for outline generation
pub const DEFAULT_PERIMETER_SUBDIVISIONS: u32 = 3;

/// Default world units to pixels factor
pub const DEFAULT_PIXEL_FACTOR: f32 = 1000.0;

/// Default adaptive simplify epsilon
pub const DEFAULT_SIMPLIFY_EPSILON: f32 = 0.01;

/// Default resample spacing
pub const DEFAULT_SAMPLE_LENGTH: f32 = 0.1;

/// Default sharp corner threshold for resampling (radians)
pub const DEFAULT_SHARP_THRESHOLD: f32 = 0.1;

/// Errors produced while loading or validating settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Setting `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f32 },
}

/// Which end(s) of a stroke an operation touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EndMode {
    #[default]
    Both = 0,
    Start = 1,
    End = 2,
}

impl EndMode {
    /// True when the start of the stroke is affected
    pub fn does_start(self) -> bool {
        matches!(self, EndMode::Both | EndMode::Start)
    }

    /// True when the end of the stroke is affected
    pub fn does_end(self) -> bool {
        matches!(self, EndMode::Both | EndMode::End)
    }
}

/// Smoothing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothConfig {
    /// Blend factor between original and smoothed value
    pub influence: f32,
    /// Kernel half-width in points
    pub iterations: u32,
    /// Smooth point positions
    pub position: bool,
    /// Smooth per-point strength
    pub strength: bool,
    /// Smooth per-point pressure
    pub thickness: bool,
    /// Smooth UV rotation and factor
    pub uv: bool,
    /// Use the shape-preserving kernel for positions
    pub keep_shape: bool,
    /// Move the end points of open strokes too
    pub smooth_caps: bool,
}

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            influence: DEFAULT_SMOOTH_INFLUENCE,
            iterations: DEFAULT_SMOOTH_ITERATIONS,
            position: true,
            strength: false,
            thickness: false,
            uv: false,
            keep_shape: false,
            smooth_caps: false,
        }
    }
}

/// Stretch (extend) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StretchConfig {
    /// Ends to extend
    pub mode: EndMode,
    /// Fraction of the stroke used for the direction/curvature estimate
    pub overshoot_fac: f32,
    /// Continue the local curvature instead of a straight line
    pub follow_curvature: bool,
    /// Points added per extended end
    pub extra_point_count: u32,
    /// Exponent weighting longer segments in the curvature estimate
    pub segment_influence: f32,
    /// Corners sharper than this are ignored by the curvature estimate
    pub max_angle: f32,
    /// Bend the extension the other way
    pub invert_curvature: bool,
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            mode: EndMode::Both,
            overshoot_fac: DEFAULT_OVERSHOOT_FAC,
            follow_curvature: false,
            extra_point_count: DEFAULT_EXTRA_POINT_COUNT,
            segment_influence: DEFAULT_SEGMENT_INFLUENCE,
            max_angle: DEFAULT_MAX_ANGLE,
            invert_curvature: false,
        }
    }
}

/// Join settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Insert invisible points so the seam is not drawn
    pub leave_gaps: bool,
    /// Rescale the appended pressures to the first stroke's thickness
    pub fit_thickness: bool,
    /// Smooth pressure and position around the seam
    pub smooth: bool,
    /// Flip either stroke so the closest ends meet
    pub auto_flip: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            leave_gaps: false,
            fit_thickness: false,
            smooth: false,
            auto_flip: true,
        }
    }
}

/// Outline generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerimeterConfig {
    /// Subdivisions for round caps and convex joins
    pub subdivisions: u32,
    /// Pixels per world unit of the owning document
    pub pixel_factor: f32,
    /// Thickness offset of the owning layer
    pub line_change: f32,
    /// Thickness removed from the outline radius
    pub thickness_change: f32,
}

impl Default for PerimeterConfig {
    fn default() -> Self {
        Self {
            subdivisions: DEFAULT_PERIMETER_SUBDIVISIONS,
            pixel_factor: DEFAULT_PIXEL_FACTOR,
            line_change: 0.0,
            thickness_change: 0.0,
        }
    }
}

impl PerimeterConfig {
    /// Outline radius for a stroke of the given thickness
    pub fn stroke_radius(&self, thickness: f32) -> f32 {
        let pixsize = 1000.0 / self.pixel_factor;
        let overshoot = self.thickness_change / pixsize / 2.0;
        let radius = ((thickness + self.line_change) / pixsize) / 2.0;
        (radius - overshoot).max(0.0)
    }
}

/// Point reduction strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimplifyMode {
    /// Error-bounded reduction
    Adaptive { epsilon: f32 },
    /// Drop every other point, `steps` times
    Fixed { steps: u32 },
    /// Rebuild at uniform spacing
    Sample { length: f32, sharp_threshold: f32 },
    /// Merge neighbours closer than `distance`
    Merge { distance: f32 },
}

impl Default for SimplifyMode {
    fn default() -> Self {
        SimplifyMode::Adaptive {
            epsilon: DEFAULT_SIMPLIFY_EPSILON,
        }
    }
}

/// Simplify settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimplifyConfig {
    pub mode: SimplifyMode,
}

impl SimplifyConfig {
    /// Resample at the given spacing with the default sharp threshold
    pub fn sample(length: f32) -> Self {
        Self {
            mode: SimplifyMode::Sample {
                length,
                sharp_threshold: DEFAULT_SHARP_THRESHOLD,
            },
        }
    }
}

/// All geometry settings in one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeomConfig {
    pub smooth: SmoothConfig,
    pub stretch: StretchConfig,
    pub join: JoinConfig,
    pub perimeter: PerimeterConfig,
    pub simplify: SimplifyConfig,
}

impl GeomConfig {
    /// Parse and validate settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GeomConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize settings to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the operations cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("smooth.influence", self.smooth.influence, 0.0, 1.0)?;
        check_range("stretch.overshoot_fac", self.stretch.overshoot_fac, 0.0, 1.0)?;
        check_range("stretch.max_angle", self.stretch.max_angle, 0.0, std::f32::consts::PI)?;
        check_range(
            "perimeter.pixel_factor",
            self.perimeter.pixel_factor,
            f32::MIN_POSITIVE,
            f32::MAX,
        )?;
        match self.simplify.mode {
            SimplifyMode::Adaptive { epsilon } => {
                check_range("simplify.epsilon", epsilon, 0.0, f32::MAX)?
            }
            SimplifyMode::Sample {
                length,
                sharp_threshold,
            } => {
                check_range("simplify.length", length, 0.0, f32::MAX)?;
                check_range(
                    "simplify.sharp_threshold",
                    sharp_threshold,
                    0.0,
                    std::f32::consts::PI,
                )?;
            }
            SimplifyMode::Merge { distance } => {
                check_range("simplify.distance", distance, 0.0, f32::MAX)?
            }
            SimplifyMode::Fixed { .. } => {}
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}
