//! Stroke points from curve descriptions
//!
//! A closed set of generators that all produce the same output: a point
//! sequence with the curve radius carried as pressure.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::types::{Point, Stroke, lerp};

#[derive(Debug, Error, PartialEq)]
pub enum GenerateError {
    #[error("Curve needs at least {needed} control points, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("NURBS order {order} must be between 2 and the point count {points}")]
    InvalidOrder { order: u32, points: usize },
    #[error("Curve resolution must be at least 1")]
    ZeroResolution,
    #[error("NURBS weight {weight} at control point {index} is not positive")]
    InvalidWeight { index: usize, weight: f32 },
}

/// Control point of a poly or NURBS curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub position: Vec3,
    pub radius: f32,
    /// Rational weight, only read by NURBS curves
    pub weight: f32,
}

impl ControlPoint {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            radius: 1.0,
            weight: 1.0,
        }
    }
}

/// Bezier knot with its two handles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierKnot {
    pub handle_left: Vec3,
    pub position: Vec3,
    pub handle_right: Vec3,
    pub radius: f32,
}

/// Curve to convert into stroke points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurveSource {
    /// Control points used as they are
    Poly { points: Vec<ControlPoint>, cyclic: bool },
    /// Cubic segments between consecutive knots, `resolution` steps each
    Bezier {
        knots: Vec<BezierKnot>,
        resolution: u32,
        cyclic: bool,
    },
    /// Rational B-spline of the given order, `resolution` samples per
    /// control point. Open curves use a clamped knot vector so they start
    /// and end on their end points; cyclic ones are periodic.
    Nurbs {
        points: Vec<ControlPoint>,
        order: u32,
        resolution: u32,
        cyclic: bool,
    },
}

impl CurveSource {
    pub fn is_cyclic(&self) -> bool {
        match self {
            CurveSource::Poly { cyclic, .. }
            | CurveSource::Bezier { cyclic, .. }
            | CurveSource::Nurbs { cyclic, .. } => *cyclic,
        }
    }

    /// Evaluate the curve into stroke points
    ///
    /// Cyclic curves do not repeat their first point at the end; the stroke
    /// closes the loop.
    pub fn to_points(&self) -> Result<Vec<Point>, GenerateError> {
        let points = match self {
            CurveSource::Poly { points, .. } => {
                if points.is_empty() {
                    return Err(GenerateError::TooFewPoints { needed: 1, got: 0 });
                }
                points
                    .iter()
                    .map(|cp| Point::new(cp.position).with_pressure(cp.radius))
                    .collect()
            }
            CurveSource::Bezier {
                knots,
                resolution,
                cyclic,
            } => bezier_points(knots, *resolution, *cyclic)?,
            CurveSource::Nurbs {
                points,
                order,
                resolution,
                cyclic,
            } => nurbs_points(points, *order, *resolution, *cyclic)?,
        };
        trace!("to_points: {} points", points.len());
        Ok(points)
    }
}

/// `resolution + 1` evenly spaced samples of one cubic coordinate, start and
/// end included, by forward differencing
fn forward_difference(q: [f32; 4], resolution: u32) -> Vec<f32> {
    let f = resolution as f32;
    let rt1 = 3.0 * (q[1] - q[0]) / f;
    let rt2 = 3.0 * (q[0] - 2.0 * q[1] + q[2]) / (f * f);
    let rt3 = (q[3] - q[0] + 3.0 * (q[1] - q[2])) / (f * f * f);

    let mut value = q[0];
    let mut d1 = rt1 + rt2 + rt3;
    let mut d2 = 2.0 * rt2 + 6.0 * rt3;
    let d3 = 6.0 * rt3;

    let mut out = Vec::with_capacity(resolution as usize + 1);
    for _ in 0..=resolution {
        out.push(value);
        value += d1;
        d1 += d2;
        d2 += d3;
    }
    out
}

fn bezier_points(knots: &[BezierKnot], resolution: u32, cyclic: bool) -> Result<Vec<Point>, GenerateError> {
    if knots.len() < 2 {
        return Err(GenerateError::TooFewPoints {
            needed: 2,
            got: knots.len(),
        });
    }
    if resolution == 0 {
        return Err(GenerateError::ZeroResolution);
    }

    let mut segments: Vec<(&BezierKnot, &BezierKnot)> = knots.windows(2).map(|w| (&w[0], &w[1])).collect();
    if cyclic {
        segments.push((&knots[knots.len() - 1], &knots[0]));
    }

    let mut points = Vec::with_capacity(segments.len() * resolution as usize + 1);
    for (index, (from, to)) in segments.into_iter().enumerate() {
        let axis = |pick: fn(Vec3) -> f32| {
            forward_difference(
                [pick(from.position), pick(from.handle_right), pick(to.handle_left), pick(to.position)],
                resolution,
            )
        };
        let (xs, ys, zs) = (axis(|v| v.x), axis(|v| v.y), axis(|v| v.z));

        // Later segments start on the previous segment's last sample
        let skip = usize::from(index > 0);
        for step in skip..=resolution as usize {
            let t = step as f32 / resolution as f32;
            let position = Vec3::new(xs[step], ys[step], zs[step]);
            points.push(Point::new(position).with_pressure(lerp(from.radius, to.radius, t)));
        }
    }
    if cyclic {
        points.pop();
    }
    Ok(points)
}

fn find_span(n: usize, degree: usize, u: f32, knots: &[f32]) -> usize {
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[degree] {
        return degree;
    }

    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Homogeneous position plus weighted radius
#[derive(Clone, Copy)]
struct Weighted {
    point: Vec4,
    radius: f32,
}

impl Weighted {
    fn lerp(self, other: Weighted, t: f32) -> Weighted {
        Weighted {
            point: self.point.lerp(other.point, t),
            radius: lerp(self.radius, other.radius, t),
        }
    }
}

fn de_boor(d: &mut [Weighted], span: usize, degree: usize, u: f32, knots: &[f32]) {
    for r in 1..=degree {
        for j in (r..=degree).rev() {
            let i = span - degree + j;
            let denom = knots[i + degree + 1 - r] - knots[i];
            let alpha = if denom == 0.0 { 0.0 } else { (u - knots[i]) / denom };
            d[j] = d[j - 1].lerp(d[j], alpha);
        }
    }
}

fn clamped_knots(count: usize, degree: usize) -> Vec<f32> {
    let interior = count - degree;
    let mut knots = vec![0.0; degree + 1];
    knots.extend((1..interior).map(|i| i as f32 / interior as f32));
    knots.extend(std::iter::repeat_n(1.0, degree + 1));
    knots
}

fn nurbs_points(
    control: &[ControlPoint],
    order: u32,
    resolution: u32,
    cyclic: bool,
) -> Result<Vec<Point>, GenerateError> {
    let count = control.len();
    if count < 2 {
        return Err(GenerateError::TooFewPoints { needed: 2, got: count });
    }
    if order < 2 || order as usize > count {
        return Err(GenerateError::InvalidOrder { order, points: count });
    }
    if resolution == 0 {
        return Err(GenerateError::ZeroResolution);
    }
    if let Some((index, cp)) = control
        .iter()
        .enumerate()
        .find(|(_, cp)| !(cp.weight.is_finite() && cp.weight > 0.0))
    {
        return Err(GenerateError::InvalidWeight {
            index,
            weight: cp.weight,
        });
    }

    let degree = order as usize - 1;
    let weighted: Vec<Weighted> = control
        .iter()
        .cycle()
        .take(if cyclic { count + degree } else { count })
        .map(|cp| Weighted {
            point: (cp.position * cp.weight).extend(cp.weight),
            radius: cp.radius * cp.weight,
        })
        .collect();

    let n = weighted.len() - 1;
    let (knots, start, end) = if cyclic {
        let knots: Vec<f32> = (0..weighted.len() + degree + 1).map(|k| k as f32).collect();
        (knots, degree as f32, weighted.len() as f32)
    } else {
        (clamped_knots(weighted.len(), degree), 0.0, 1.0)
    };

    let samples = count * resolution as usize;
    let mut points = Vec::with_capacity(samples);
    for i in 0..samples {
        let t = if cyclic {
            i as f32 / samples as f32
        } else if samples > 1 {
            i as f32 / (samples - 1) as f32
        } else {
            0.0
        };
        let u = start + (end - start) * t;
        let span = find_span(n, degree, u, &knots);
        let mut d: Vec<Weighted> = weighted[span - degree..=span].to_vec();
        de_boor(&mut d, span, degree, u, &knots);

        let result = d[degree];
        let w = result.point.w;
        points.push(Point::new(result.point.truncate() / w).with_pressure(result.radius / w));
    }
    Ok(points)
}

impl Stroke {
    /// New stroke from a curve, with derived geometry already built
    pub fn from_curve(source: &CurveSource) -> Result<Stroke, GenerateError> {
        let mut stroke = Stroke::new(source.to_points()?);
        stroke.cyclic = source.is_cyclic();
        stroke.geometry_update();
        Ok(stroke)
    }
}
