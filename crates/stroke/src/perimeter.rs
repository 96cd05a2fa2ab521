//! Variable-width stroke outlines
//!
//! The outline is built as two sides walked from the first point to the
//! last. At each interior corner the convex side gets both offset points
//! joined by a circular arc and the concave side gets a single miter point.
//! Caps are added to the right side at both ends. The right side is then
//! reversed and appended to the left, giving one closed ring.
//!
//! Everything happens in the xy plane; z is carried from the point the
//! offset belongs to.

use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3, Vec3Swizzles};
use stroke_config::PerimeterConfig;
use tracing::{debug, trace};

use crate::constants::{CLOSE_SEAM_FACTOR, PERIMETER_MIN_MITER, PERIMETER_STRAIGHT_EPSILON};
use crate::list::LinkedPoints;
use crate::types::{CapStyle, Point, Stroke};

fn offset(point: Vec3, by: Vec2) -> Vec3 {
    Vec3::new(point.x + by.x, point.y + by.y, point.z)
}

/// Points on a full half circle for the given subdivision level
fn half_circle_points(subdivisions: u32) -> u32 {
    (1 << (subdivisions + 1)) + 1
}

/// Fill the arc around `center` between the nodes `from` and `to`
///
/// Points go clockwise from `to` when `clockwise` is set, otherwise
/// counter-clockwise from `from`. Returns how many were inserted.
fn arc_between(
    side: &mut LinkedPoints<Vec3>,
    from: usize,
    to: usize,
    center: Vec3,
    subdivisions: u32,
    clockwise: bool,
) -> usize {
    let vec_from = side.get(from).xy() - center.xy();
    let vec_to = side.get(to).xy() - center.xy();
    if vec_from == Vec2::ZERO || vec_to == Vec2::ZERO {
        return 0;
    }

    let dot = vec_from.dot(vec_to);
    let det = vec_from.perp_dot(vec_to);
    let angle = if clockwise {
        PI - (-det).atan2(-dot)
    } else {
        (-det).atan2(-dot) + PI
    };

    let count = ((half_circle_points(subdivisions) - 2) as f32 * (angle / PI)) as i32;
    if count <= 0 {
        return 0;
    }
    let increment = angle / count as f32;
    let (mut anchor, start) = if clockwise { (to, vec_to) } else { (from, vec_from) };
    for i in 1..count {
        let p = Vec2::from_angle(i as f32 * increment).rotate(start) + center.xy();
        let point = Vec3::new(p.x, p.y, center.z);
        anchor = if clockwise {
            side.insert_before(anchor, point)
        } else {
            side.insert_after(anchor, point)
        };
    }
    (count - 1) as usize
}

/// Half circle after node `from` ending on the far side, opposite `from`
/// across the midpoint of `from` and `to`
fn semicircle_between(side: &mut LinkedPoints<Vec3>, from: usize, to: usize, subdivisions: u32) -> usize {
    let count = half_circle_points(subdivisions);
    let center = side.get(from).lerp(*side.get(to), 0.5);
    let radius = side.get(from).xy() - center.xy();
    if radius == Vec2::ZERO {
        return 0;
    }

    let increment = PI / (count - 1) as f32;
    let mut anchor = from;
    for i in 1..count {
        let p = Vec2::from_angle(i as f32 * increment).rotate(radius) + center.xy();
        anchor = side.insert_after(anchor, Vec3::new(p.x, p.y, center.z));
    }
    (count - 1) as usize
}

fn cap(point: Vec3, toward: Vec3, radius: f32, side: &mut LinkedPoints<Vec3>, subdivisions: u32, style: CapStyle) {
    let normal = match (toward.xy() - point.xy()).try_normalize() {
        Some(dir) => dir.perp() * radius,
        None => Vec2::new(0.0, radius),
    };
    let outer = side.push_back(offset(point, normal));
    let inner = side.push_back(offset(point, -normal));
    if style == CapStyle::Round {
        semicircle_between(side, outer, inner, subdivisions);
    }
}

/// Outline ring of a stroke
///
/// `radius` is the half width at pressure 1. Each point's own pressure
/// scales it. Caps follow the stroke's cap styles, with round caps and
/// corner arcs using `2^(subdivisions+1)+1` points per half circle. The
/// ring never ends on a copy of its first point. Empty for an empty stroke.
pub fn perimeter_points(stroke: &Stroke, radius: f32, subdivisions: u32) -> Vec<Vec3> {
    let points = stroke.points();
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }

    let first = points[0].position;
    let last = points[n - 1].position;
    let (mut first_next, mut last_prev) = if n > 1 {
        (points[1].position, points[n - 2].position)
    } else {
        (first, last)
    };
    if n == 1 {
        first_next.x += 1.0;
        last_prev.x -= 1.0;
    }

    let mut left = LinkedPoints::new();
    let mut right = LinkedPoints::new();

    cap(first, first_next, radius * points[0].pressure, &mut right, subdivisions, stroke.start_cap);

    for i in 1..n.saturating_sub(1) {
        let curr = points[i].position;
        let radius = radius * points[i].pressure;

        let to_prev = curr.xy() - points[i - 1].position.xy();
        let to_next = points[i + 1].position.xy() - curr.xy();
        let (prev_length, next_length) = (to_prev.length(), to_next.length());
        let dir_prev = to_prev.try_normalize().unwrap_or(Vec2::X);
        let dir_next = to_next.try_normalize().unwrap_or(Vec2::X);
        let normal_prev = dir_prev.perp();
        let normal_next = dir_next.perp();

        let tangent = (dir_prev + dir_next).try_normalize().unwrap_or(normal_prev);
        let miter_dir = tangent.perp();
        let mut cos_half = miter_dir.dot(normal_prev);
        if cos_half == 0.0 {
            cos_half = 1.0;
        }
        let mut miter_length = radius / cos_half;
        if miter_length <= 0.0 {
            miter_length = PERIMETER_MIN_MITER;
        }
        let miter = miter_dir * miter_length;
        let short_miter = miter_length < prev_length && miter_length < next_length;

        let bend = dir_next.dot(normal_prev);
        if bend.abs() < PERIMETER_STRAIGHT_EPSILON {
            left.push_back(offset(curr, normal_prev * radius));
            right.push_back(offset(curr, -normal_next * radius));
        } else if bend < 0.0 {
            // Left side is convex
            let from = left.push_back(offset(curr, normal_prev * radius));
            let to = left.push_back(offset(curr, normal_next * radius));
            arc_between(&mut left, from, to, curr, subdivisions, true);
            let inner = if short_miter { -miter } else { -normal_next * radius };
            right.push_back(offset(curr, inner));
        } else {
            let from = right.push_back(offset(curr, -normal_prev * radius));
            let to = right.push_back(offset(curr, -normal_next * radius));
            arc_between(&mut right, from, to, curr, subdivisions, false);
            let inner = if short_miter { miter } else { normal_prev * radius };
            left.push_back(offset(curr, inner));
        }
    }

    cap(last, last_prev, radius * points[n - 1].pressure, &mut right, subdivisions, stroke.end_cap);

    let mut ring = left.to_vec();
    ring.extend(right.iter_rev().copied());

    if let (Some(&head), Some(&tail)) = (ring.first(), ring.last()) {
        let seam = tail.lerp(head, CLOSE_SEAM_FACTOR);
        if !seam.abs_diff_eq(head, f32::EPSILON) {
            ring.push(seam);
        } else if ring.len() > 1 && tail == head {
            ring.pop();
        }
    }
    trace!("perimeter_points: {} points -> {} outline points", n, ring.len());
    ring
}

/// Outline of `stroke` as seen through `view`, as a new closed stroke
///
/// Works on a copy of the points (deform weights are left behind), closing
/// it with a copy of the first point when cyclic. The copy is moved into
/// view space, outlined at the radius derived from the stroke thickness and
/// `config`, and the outline is mapped back into object space. The result
/// is selected, cyclic, has pressure 0 and strength 1 on every point and
/// keeps the source material. `None` for an empty stroke.
pub fn perimeter_from_view(
    stroke: &Stroke,
    view: &Mat4,
    object_to_world: &Mat4,
    config: &PerimeterConfig,
) -> Option<Stroke> {
    if stroke.is_empty() {
        return None;
    }

    let mut temp = stroke.duplicate_style();
    temp.points = stroke.points.clone();
    if stroke.cyclic && stroke.points.len() > 1 {
        let closing = Point {
            uv_fac: 1.0,
            uv_rotation: 0.0,
            ..stroke.points[0]
        };
        temp.points.push(closing);
    }
    temp.to_view_space(view, object_to_world);

    let radius = config.stroke_radius(stroke.thickness);
    let ring = perimeter_points(&temp, radius, config.subdivisions);
    if ring.is_empty() {
        debug!("perimeter_from_view: no outline produced");
        return None;
    }

    let mut outline = Stroke::new(
        ring.into_iter()
            .map(|position| Point {
                position,
                pressure: 0.0,
                strength: 1.0,
                selected: true,
                ..Default::default()
            })
            .collect(),
    );
    outline.material_index = stroke.material_index;
    outline.thickness = 1.0;
    outline.from_view_space(&view.inverse(), object_to_world);
    outline.cyclic = true;
    outline.selected = true;
    outline.geometry_update();
    trace!("perimeter_from_view: outline of {} points", outline.len());
    Some(outline)
}
