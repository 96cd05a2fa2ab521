use glam::Vec3;
use stroke_config::EndMode;
use tracing::{debug, trace};

use crate::constants::{DIST_EPSILON, INTERSECT_EPSILON};
use crate::types::Stroke;
use crate::validation::check_range;

/// Keep only points `from..=to`
///
/// A one-point result empties the stroke unless `keep_single` is set, and
/// then returns false. Also returns false when the range is invalid or
/// already covers the whole stroke.
pub fn trim_points(stroke: &mut Stroke, from: usize, to: usize, keep_single: bool) -> bool {
    let n = stroke.points.len();
    if let Err(err) = check_range(from, to, n) {
        debug!("trim_points: {}", err);
        return false;
    }
    let count = to - from + 1;
    if count == 1 && !keep_single {
        stroke.clear();
        stroke.geometry_update();
        return false;
    }
    if count >= n {
        return false;
    }

    stroke.retain_indices(|i| (from..=to).contains(&i));
    trace!("trim_points: kept {}..={} of {}", from, to, n);
    stroke.geometry_update();
    true
}

/// Cut the stroke at `before`
///
/// The returned stroke holds points `before..` with the same style; this
/// stroke keeps `..=before`, so the cut point exists in both. Both pieces
/// are open afterwards. `None` when `before` is 0 or past the last point.
pub fn split(stroke: &mut Stroke, before: usize) -> Option<Stroke> {
    let n = stroke.points.len();
    if before == 0 || before >= n {
        return None;
    }

    let mut tail = stroke.duplicate_style();
    tail.cyclic = false;
    tail.points = stroke.points[before..].to_vec();
    tail.dverts = stroke.dverts.as_ref().map(|dv| dv[before..].to_vec());
    tail.geometry_update();

    stroke.cyclic = false;
    if !trim_points(stroke, 0, before, false) {
        stroke.geometry_update();
    }
    trace!("split: {} points -> {} + {}", n, stroke.len(), tail.len());
    Some(tail)
}

/// Position `dist` along the polyline from `points[0]`, as the index of the
/// segment start and the interpolated location
fn walk_in(positions: &[Vec3], dist: f32) -> (usize, Vec3) {
    let mut travelled = 0.0;
    for (i, w) in positions.windows(2).enumerate() {
        let segment = w[0].distance(w[1]);
        if travelled + segment >= dist {
            let t = if segment > 0.0 { (dist - travelled) / segment } else { 0.0 };
            // Landing on a stored point keeps it instead of stacking a copy
            if t >= 1.0 - f32::EPSILON {
                return (i + 1, w[1]);
            }
            return (i, w[0].lerp(w[1], t));
        }
        travelled += segment;
    }
    let last = positions.len() - 1;
    (last, positions[last])
}

/// Shorten the stroke by `dist` at the ends selected by `mode`
///
/// The new end points land exactly `dist` along the old path. When the
/// requested cut consumes the whole length the stroke is cleared and false
/// is returned. Strokes with fewer than two points are left alone.
pub fn shrink(stroke: &mut Stroke, dist: f32, mode: EndMode) -> bool {
    let n = stroke.points.len();
    if n < 2 || dist < DIST_EPSILON {
        return false;
    }

    let sides = u8::from(mode.does_start()) + u8::from(mode.does_end());
    let total = stroke.length(true);
    if dist * f32::from(sides) >= total {
        debug!("shrink: {} x{} consumes length {}, clearing", dist, sides, total);
        stroke.clear();
        stroke.geometry_update();
        return false;
    }

    let positions: Vec<Vec3> = stroke.points.iter().map(|p| p.position).collect();
    let mut start = 0;
    let mut end = n - 1;
    if mode.does_start() {
        let (segment, position) = walk_in(&positions, dist);
        start = segment;
        stroke.points[start].position = position;
    }
    if mode.does_end() {
        let reversed: Vec<Vec3> = positions.iter().rev().copied().collect();
        let (segment, position) = walk_in(&reversed, dist);
        end = n - 1 - segment;
        stroke.points[end].position = position;
    }

    if !trim_points(stroke, start, end, false) {
        stroke.geometry_update();
    }
    trace!("shrink: {} -> {} points", n, stroke.len());
    true
}

/// Closest points of the infinite lines through `a..b` and `c..d`, with
/// their parameters along each. `None` for parallel lines.
fn closest_on_lines(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Option<(Vec3, f32, Vec3, f32)> {
    let d1 = b - a;
    let d2 = d - c;
    let r = a - c;
    let (aa, ab, bb) = (d1.dot(d1), d1.dot(d2), d2.dot(d2));
    let (ar, br) = (d1.dot(r), d2.dot(r));
    let denom = aa * bb - ab * ab;
    if denom.abs() <= f32::EPSILON * aa * bb {
        return None;
    }
    let s = (ab * br - ar * bb) / denom;
    let t = (aa * br - ab * ar) / denom;
    Some((a + d1 * s, s, c + d2 * t, t))
}

/// Cut the stroke down to its first self-intersecting loop
///
/// Finds the first pair of non-adjacent segments that cross strictly inside
/// both, keeps the points between them and moves both new ends onto the
/// crossing. Needs at least four points; returns false when nothing crosses.
pub fn trim_self_intersection(stroke: &mut Stroke) -> bool {
    let n = stroke.points.len();
    if n < 4 {
        return false;
    }

    let points = &stroke.points;
    let mut hit = None;
    'outer: for i in 0..n - 2 {
        let (a, b) = (points[i].position, points[i + 1].position);
        for j in i + 2..n - 1 {
            let (c, d) = (points[j].position, points[j + 1].position);
            let Some((p, s, q, t)) = closest_on_lines(a, b, c, d) else {
                continue;
            };
            let inside = s > 0.0 && s < 1.0 && t > 0.0 && t < 1.0;
            if inside && p.distance(q) < INTERSECT_EPSILON {
                hit = Some((i, j + 1, p));
                break 'outer;
            }
        }
    }

    let Some((start, end, crossing)) = hit else {
        return false;
    };
    stroke.points[start].position = crossing;
    stroke.points[end].position = crossing;
    if !trim_points(stroke, start, end, false) {
        stroke.geometry_update();
    }
    trace!("trim_self_intersection: loop {}..={} of {}", start, end, n);
    true
}
