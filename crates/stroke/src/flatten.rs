//! Projection of a 3D stroke onto its own plane
//!
//! The local X axis runs from the first point to the second. The point at
//! 75% of the stroke fixes the plane, and Y is the in-plane perpendicular.
//! Every point is expressed in that basis with the first point as origin.

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::types::Point;

/// 2D projection plus winding
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened {
    pub points: Vec<Vec2>,
    /// `1` for clockwise (or zero area), `-1` for counter-clockwise
    pub direction: i32,
}

struct LocalBasis {
    origin: Vec3,
    x: Vec3,
    y: Vec3,
}

impl LocalBasis {
    fn from_points(points: &[Point], nudge_reference: bool) -> Self {
        let origin = points[0].position;
        let reference = points[(points.len() as f32 * 0.75) as usize].position;
        // With two points the reference is the second point itself
        let reference = if nudge_reference {
            reference * 0.001
        } else {
            reference
        };

        let x = points[1].position - origin;
        let normal = x.cross(reference - origin);
        let y = normal.cross(x);

        let (x, y) = match (x.try_normalize(), y.try_normalize()) {
            (Some(x), Some(y)) => (x, y),
            (Some(x), None) => {
                debug!("LocalBasis: collinear reference, picking an arbitrary plane");
                (x, x.any_orthonormal_vector())
            }
            _ => {
                debug!("LocalBasis: coincident first points, using the XY plane");
                (Vec3::X, Vec3::Y)
            }
        };
        Self { origin, x, y }
    }

    fn project(&self, position: Vec3) -> Vec2 {
        let local = position - self.origin;
        Vec2::new(local.dot(self.x), local.dot(self.y))
    }
}

/// Project points onto their best-fit plane and measure the winding
///
/// Strokes with fewer than two points project to the origin.
pub fn flatten_2d(points: &[Point]) -> Flattened {
    if points.len() < 2 {
        return Flattened {
            points: vec![Vec2::ZERO; points.len()],
            direction: 1,
        };
    }

    let basis = LocalBasis::from_points(points, points.len() == 2);
    let projected: Vec<Vec2> = points.iter().map(|p| basis.project(p.position)).collect();

    let mut cross = 0.0;
    let mut prev = projected[projected.len() - 1];
    for &curr in &projected {
        cross += (curr.x - prev.x) * (curr.y + prev.y);
        prev = curr;
    }

    Flattened {
        points: projected,
        direction: if cross >= 0.0 { 1 } else { -1 },
    }
}

/// Project `points` using the plane of `reference`, pushing the two end
/// points outward along their end segments by `scale / 10`.
///
/// Used for hit testing, where a slightly longer outline catches strokes
/// that end right at another stroke's edge. The direction reports the sign
/// of the basis Y axis's z component.
pub fn flatten_ref(reference: &[Point], points: &[Point], scale: f32) -> Flattened {
    if reference.len() < 2 || points.len() < 2 {
        return Flattened {
            points: vec![Vec2::ZERO; points.len()],
            direction: 0,
        };
    }

    let basis = LocalBasis::from_points(reference, reference.len() == 2);
    let last = points.len() - 1;
    let projected = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let offset = match i {
                0 => (p.position - points[1].position).normalize_or_zero(),
                i if i == last => (p.position - points[i - 1].position).normalize_or_zero(),
                _ => Vec3::ZERO,
            };
            basis.project(p.position + offset * (scale / 10.0))
        })
        .collect();

    Flattened {
        points: projected,
        direction: basis.y.z as i32,
    }
}
