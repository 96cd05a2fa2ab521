//! Arc-length marching along a stroke
//!
//! A march starts at a position on the path and the index of the next stored
//! point, and walks `dist` further along the polyline. Cyclic strokes wrap
//! from the last point to the first; open strokes stop at the last point.
//!
//! Two walkers share the same stepping rules so a counting pass and a
//! materializing pass produce the same sequence:
//! - [`march_next_point_sharp`] stops on corners sharper than a threshold and
//!   tags them.
//! - [`march_next_point`] stops on those tags and interpolates every point
//!   attribute at the landing position.
//!
//! Landing within [`MARCH_LANDING_EPSILON`] of the final stored point counts
//! as reaching it, so an exact multiple of the spacing does not emit the end
//! point twice.

use glam::Vec3;
use tracing::trace;

use crate::constants::MARCH_LANDING_EPSILON;
use crate::tags::PointTags;
use crate::types::{Point, Stroke};

/// Result of one interpolating march step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchSample {
    /// Attributes at the landing position
    pub point: Point,
    /// Stored point before the landing position
    pub from: usize,
    /// Stored point after (or at) the landing position
    pub to: usize,
    /// Blend factor from `from` to `to`
    pub ratio: f32,
    /// Index to continue from. `None` once the path is exhausted, in which
    /// case `point` is the final stored point.
    pub next: Option<usize>,
}

enum Landing {
    /// On a stored point
    AtPoint { index: usize, next: Option<usize> },
    /// Between the previous position and stored point `index`
    Between {
        index: usize,
        position: Vec3,
        ratio: f32,
    },
}

fn walk(
    stroke: &Stroke,
    next_index: usize,
    current: Vec3,
    dist: f32,
    mut stop_at: impl FnMut(usize) -> bool,
) -> Landing {
    let points = &stroke.points;
    let n = points.len();
    let cyclic = stroke.cyclic;

    let mut index = if next_index >= n { 0 } else { next_index };
    let mut step_start = current;
    let mut remaining = dist;
    let mut till_next = points[index].position.distance(step_start);

    while till_next < remaining && index != 0 {
        remaining -= till_next;
        // Sitting exactly on the point means it was already emitted
        if till_next > 0.0 && stop_at(index) {
            return Landing::AtPoint {
                index,
                next: Some(index + 1),
            };
        }
        step_start = points[index].position;
        index += 1;
        if index >= n {
            if cyclic {
                index = 0;
            } else {
                index = n - 1;
                till_next = 0.0;
                break;
            }
        }
        till_next = points[index].position.distance(step_start);
    }

    let is_last = if cyclic { index == 0 } else { index == n - 1 };
    if till_next < remaining || (is_last && till_next <= remaining + MARCH_LANDING_EPSILON) {
        return Landing::AtPoint { index, next: None };
    }

    let ratio = remaining / till_next;
    Landing::Between {
        index,
        position: step_start.lerp(points[index].position, ratio),
        ratio,
    }
}

fn continue_from(index: usize, n: usize) -> usize {
    if index == 0 { n } else { index }
}

fn previous(index: usize, n: usize) -> usize {
    if index == 0 { n - 1 } else { index - 1 }
}

/// March `dist` from `current`, stopping on tagged points, and interpolate
/// all attributes at the landing position.
///
/// `next_index` is the stored point after `current`; a value equal to the
/// point count means "wrapped to the first point". The stroke must have at
/// least two points.
pub fn march_next_point(
    stroke: &Stroke,
    tags: &PointTags,
    next_index: usize,
    current: Vec3,
    dist: f32,
) -> MarchSample {
    let n = stroke.points.len();
    match walk(stroke, next_index, current, dist, |i| tags.get(i)) {
        Landing::AtPoint { index, next } => {
            let mut point = stroke.points[index];
            point.selected = false;
            MarchSample {
                point,
                from: previous(index, n),
                to: index,
                ratio: 1.0,
                next,
            }
        }
        Landing::Between {
            index,
            position,
            ratio: step_ratio,
        } => {
            let from = previous(index, n);
            let a = &stroke.points[from];
            let b = &stroke.points[index];
            let d1 = position.distance(a.position);
            let d2 = position.distance(b.position);
            // Blend by distance to the bracketing points, not along the last step
            let ratio = if d1 + d2 > 0.0 {
                d1 / (d1 + d2)
            } else {
                step_ratio
            };
            let mut point = a.lerp(b, ratio);
            point.position = position;
            MarchSample {
                point,
                from,
                to: index,
                ratio,
                next: Some(continue_from(index, n)),
            }
        }
    }
}

/// March `dist` from `current` without interpolating attributes, stopping on
/// (and tagging) interior corners whose angle is below `sharp_threshold`.
///
/// Returns the landing position and the index to continue from, `None` once
/// the path is exhausted.
pub fn march_next_point_sharp(
    stroke: &Stroke,
    tags: &mut PointTags,
    next_index: usize,
    current: Vec3,
    dist: f32,
    sharp_threshold: f32,
) -> (Vec3, Option<usize>) {
    let points = &stroke.points;
    let n = points.len();
    let is_sharp = |i: usize| {
        i < n - 1 && {
            let p = points[i].position;
            let angle = (points[i - 1].position - p).angle_between(points[i + 1].position - p);
            angle < sharp_threshold
        }
    };
    let landing = walk(stroke, next_index, current, dist, |i| {
        let sharp = is_sharp(i);
        if sharp {
            tags.set(i);
        }
        sharp
    });
    match landing {
        Landing::AtPoint { index, next } => (points[index].position, next),
        Landing::Between { index, position, .. } => {
            (position, Some(continue_from(index, n)))
        }
    }
}

/// Count the points a march at spacing `dist` produces, including the first
/// point and the final one. Clears `tags` first, then tags sharp corners.
pub fn march_count(stroke: &Stroke, tags: &mut PointTags, dist: f32, sharp_threshold: f32) -> usize {
    let n = stroke.points.len();
    tags.reset(n);
    if n < 2 {
        return n;
    }

    let mut count = 1;
    let mut current = stroke.points[0].position;
    let mut next_index = 1;
    let limit = march_limit(stroke, dist);
    loop {
        let (position, next) =
            march_next_point_sharp(stroke, tags, next_index, current, dist, sharp_threshold);
        count += 1;
        match next {
            Some(next) if count < limit => {
                next_index = next;
                current = position;
            }
            _ => break,
        }
    }
    trace!("march_count: {} points at spacing {}, {} sharp", count, dist, tags.count());
    count
}

/// Upper bound on the samples a march can produce, guarding against a
/// spacing too small to advance in f32
pub(crate) fn march_limit(stroke: &Stroke, dist: f32) -> usize {
    let mut length = stroke.length(true);
    if stroke.cyclic {
        if let (Some(first), Some(last)) = (stroke.points.first(), stroke.points.last()) {
            length += first.position.distance(last.position);
        }
    }
    let steps = (length / dist).ceil();
    let steps = if steps.is_finite() { steps as usize } else { usize::MAX / 4 };
    steps.saturating_mul(2).saturating_add(2 * stroke.points.len() + 2)
}
