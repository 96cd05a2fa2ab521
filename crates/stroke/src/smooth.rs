//! Binomial-kernel smoothing of point attributes
//!
//! Each point is pulled toward a weighted average of up to `iterations`
//! neighbours on each side. Weights follow binomial coefficients, updated by
//! a running ratio so large windows never evaluate a factorial. The position
//! kernel has a shape-keeping variant that subtracts a wider kernel, which
//! gives small negative side lobes and resists flattening corners.
//!
//! All functions read from a `source` stroke and write into a `target`. To
//! keep the result independent of the order points are visited, `source`
//! should be an untouched copy.

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use stroke_config::SmoothConfig;
use tracing::trace;

use crate::types::Stroke;

/// Smoothing kernel shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothKernel {
    /// Position, plain binomial
    Position,
    /// Position, difference of two binomials
    KeepShape,
    /// Strength and thickness
    Attribute,
    /// UV rotation
    Uv,
}

struct Window {
    iterations: i64,
    n_half: f64,
    w: f64,
    w2: f64,
    /// Scale down contributions that fall past an open end
    taper: bool,
}

impl Window {
    fn new(kernel: SmoothKernel, iterations: u32, taper: bool) -> Self {
        let it = i64::from(iterations);
        let (n_half, w, w2) = match kernel {
            SmoothKernel::Position => ((it * it / 4 + 2 * it + 12) as f64, 1.0, 0.0),
            SmoothKernel::KeepShape => {
                let n_half = (it * it / 8 + it) as f64;
                let w2 = (2 * it * it) as f64 / (n_half * 3.0);
                let w2 = w2.exp() / 3f64.sqrt();
                (n_half, 2.0, w2)
            }
            SmoothKernel::Attribute => ((it * it / 4 + it) as f64, 1.0, 0.0),
            SmoothKernel::Uv => ((it * it + it) as f64, 1.0, 0.0),
        };
        Self {
            iterations: it,
            n_half,
            w,
            w2,
            taper,
        }
    }

    /// Call `visit(neighbour, weight)` for both neighbours at every step and
    /// return the total weight, the center's own weight included
    fn accumulate(&self, n: usize, index: usize, cyclic: bool, mut visit: impl FnMut(usize, f32)) -> f64 {
        let (len, idx) = (n as i64, index as i64);
        let mut w = self.w;
        let mut w2 = self.w2;
        let mut total = 0.0;

        for step in (1..=self.iterations).rev() {
            let mut before = idx - step;
            let mut after = idx + step;
            let mut w_before = (w - w2) as f32;
            let mut w_after = (w - w2) as f32;

            if cyclic {
                before = before.rem_euclid(len);
                after = after.rem_euclid(len);
            } else {
                if before < 0 {
                    if self.taper {
                        w_before *= -before as f32 / idx as f32;
                    }
                    before = 0;
                }
                if after > len - 1 {
                    if self.taper {
                        w_after *= (after - (len - 1)) as f32 / (len - 1 - idx) as f32;
                    }
                    after = len - 1;
                }
            }

            visit(before as usize, w_before);
            visit(after as usize, w_after);
            total += f64::from(w_before) + f64::from(w_after);

            let s = step as f64;
            w *= (self.n_half + s) / (self.n_half + 1.0 - s);
            w2 *= (3.0 * self.n_half + s) / (3.0 * self.n_half + 1.0 - s);
        }
        total + w - w2
    }
}

impl SmoothKernel {
    /// Total weight the kernel accumulates for a point far from either end
    pub fn weight_total(self, iterations: u32) -> f64 {
        let reach = iterations as usize;
        let n = 2 * reach + 3;
        Window::new(self, iterations, false).accumulate(n, reach + 1, false, |_, _| {})
    }
}

/// Smoothed position of point `index`, blended toward the kernel average by
/// `influence`. `None` when the stroke has two or fewer points or
/// `iterations` is zero. Open-stroke end points come back unchanged unless
/// `smooth_caps` is set.
pub fn smoothed_position(
    source: &Stroke,
    index: usize,
    influence: f32,
    iterations: u32,
    smooth_caps: bool,
    keep_shape: bool,
) -> Option<Vec3> {
    let points = source.points();
    let n = points.len();
    if n <= 2 || iterations == 0 || index >= n {
        return None;
    }
    let center = points[index].position;
    if !smooth_caps && !source.cyclic && (index == 0 || index == n - 1) {
        return Some(center);
    }

    let kernel = if keep_shape {
        SmoothKernel::KeepShape
    } else {
        SmoothKernel::Position
    };
    let mut sum = Vec3::ZERO;
    let total = Window::new(kernel, iterations, !smooth_caps).accumulate(n, index, source.cyclic, |j, w| {
        sum += (points[j].position - center) * w;
    });
    let average = center + sum * (1.0 / total) as f32;
    Some(center.lerp(average, influence))
}

/// Smooth the position of point `index` from `source` into `target`
pub fn smooth_point(
    source: &Stroke,
    target: &mut Stroke,
    index: usize,
    influence: f32,
    iterations: u32,
    smooth_caps: bool,
    keep_shape: bool,
) -> bool {
    match smoothed_position(source, index, influence, iterations, smooth_caps, keep_shape) {
        Some(position) => {
            target.points_mut()[index].position = position;
            true
        }
        None => false,
    }
}

fn attribute_delta(source: &Stroke, index: usize, iterations: u32, value: impl Fn(usize) -> f32) -> Option<f32> {
    let n = source.len();
    if n <= 2 || iterations == 0 || index >= n {
        return None;
    }
    let center = value(index);
    let mut sum = 0.0;
    let total = Window::new(SmoothKernel::Attribute, iterations, false).accumulate(n, index, source.cyclic, |j, w| {
        sum += w * (value(j) - center);
    });
    Some(sum / total as f32)
}

/// Smooth the strength of point `index`, clamped to [0, 1]
pub fn smooth_strength(source: &Stroke, target: &mut Stroke, index: usize, influence: f32, iterations: u32) -> bool {
    let points = source.points();
    let Some(delta) = attribute_delta(source, index, iterations, |j| points[j].strength) else {
        return false;
    };
    target.points_mut()[index].strength = (points[index].strength + delta * influence).clamp(0.0, 1.0);
    true
}

/// Smooth the pressure of point `index`, kept non-negative
pub fn smooth_thickness(source: &Stroke, target: &mut Stroke, index: usize, influence: f32, iterations: u32) -> bool {
    let points = source.points();
    let Some(delta) = attribute_delta(source, index, iterations, |j| points[j].pressure) else {
        return false;
    };
    target.points_mut()[index].pressure = (points[index].pressure + delta * influence).max(0.0);
    true
}

/// Smooth the UV rotation of point `index`, clamped to ±π/2, and its UV
/// factor. End points of open strokes are left alone.
pub fn smooth_uv(source: &Stroke, target: &mut Stroke, index: usize, influence: f32, iterations: u32) -> bool {
    let points = source.points();
    let n = points.len();
    if n <= 2 || iterations == 0 || index >= n {
        return false;
    }
    if !source.cyclic && (index == 0 || index == n - 1) {
        return false;
    }

    let center = &points[index];
    let (mut rotation_sum, mut fac_sum) = (0.0, 0.0);
    let total = Window::new(SmoothKernel::Uv, iterations, true).accumulate(n, index, source.cyclic, |j, w| {
        rotation_sum += w * (points[j].uv_rotation - center.uv_rotation);
        fac_sum += w * (points[j].uv_fac - center.uv_fac);
    });
    let total = total as f32;
    let rotation = center.uv_rotation + rotation_sum / total * influence;
    let fac = center.uv_fac + fac_sum / total * influence;

    let point = &mut target.points_mut()[index];
    point.uv_rotation = rotation.clamp(-FRAC_PI_2, FRAC_PI_2);
    point.uv_fac = fac;
    true
}

/// Smooth the whole stroke as configured
///
/// Reads from a snapshot, so every point sees its unsmoothed neighbours.
/// With `weights`, each point's influence is scaled by its weight and points
/// at zero weight are skipped.
pub fn smooth_stroke(stroke: &mut Stroke, config: &SmoothConfig, weights: Option<&[f32]>) {
    if config.influence <= 0.0 || config.iterations == 0 {
        return;
    }
    let source = stroke.clone();
    let (influence, iterations) = (config.influence, config.iterations);

    for i in 0..source.len() {
        let value = match weights {
            Some(weights) => influence * weights.get(i).copied().unwrap_or(0.0),
            None => influence,
        };
        if value <= 0.0 {
            continue;
        }
        if config.position {
            smooth_point(&source, stroke, i, value, iterations, config.smooth_caps, config.keep_shape);
        }
        if config.strength {
            smooth_strength(&source, stroke, i, value, iterations);
        }
        if config.thickness {
            smooth_thickness(&source, stroke, i, value, iterations);
        }
        if config.uv {
            smooth_uv(&source, stroke, i, value, iterations);
        }
    }
    trace!("smooth_stroke: {} points, {} iterations", source.len(), iterations);
}
