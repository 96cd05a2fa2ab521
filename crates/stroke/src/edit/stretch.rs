use glam::{Quat, Vec3};
use stroke_config::StretchConfig;
use tracing::{debug, trace};

use crate::constants::{DIST_EPSILON, STRETCH_FALLBACK_OVERSHOOT};
use crate::types::Stroke;

fn rotation(axis: Vec3, angle: f32) -> Quat {
    match axis.try_normalize() {
        Some(axis) => Quat::from_axis_angle(axis, angle),
        None => Quat::IDENTITY,
    }
}

/// Extend the stroke by `dist` beyond the ends selected in `config`
///
/// Without curvature following, or for two-point strokes, the end points
/// move outward along the direction to a point `overshoot_fac` of the way
/// into the stroke. With it, `extra_point_count` points are added per end,
/// continuing the arc whose curvature is estimated over the first
/// `overshoot_fac` of the stroke.
///
/// Returns false for single points, distances below [`DIST_EPSILON`] or a
/// zero extra point count.
pub fn stretch(stroke: &mut Stroke, dist: f32, config: &StretchConfig) -> bool {
    let n = stroke.points.len();
    let extra = config.extra_point_count as usize;
    if n <= 1 || dist < DIST_EPSILON || extra == 0 {
        return false;
    }

    let mut used = config.overshoot_fac.clamp(1e-4, 1.0);
    if !used.is_finite() {
        used = STRETCH_FALLBACK_OVERSHOOT;
    }

    if !config.follow_curvature || n <= 2 {
        stretch_straight(stroke, dist, used, config);
    } else {
        stretch_curved(stroke, dist, used, config);
    }
    stroke.geometry_update();
    trace!("stretch: {} -> {} points", n, stroke.len());
    true
}

/// Sample the polyline at fractional index `param`, counted from the end
/// when `from_end` is set
fn sample(positions: &[Vec3], param: f32, from_end: bool) -> Vec3 {
    let last = positions.len() - 1;
    let low = (param.floor() as usize).min(last);
    let high = (param.ceil() as usize).min(last);
    let (low, high) = if from_end {
        (last - low, last - high)
    } else {
        (low, high)
    };
    positions[low].lerp(positions[high], param.fract())
}

fn stretch_straight(stroke: &mut Stroke, dist: f32, used: f32, config: &StretchConfig) {
    let positions: Vec<Vec3> = stroke.points.iter().map(|p| p.position).collect();
    let n = positions.len();
    let param = used * (n - 1) as f32;

    let mut extend = |index: usize, neighbour: usize, target: Vec3| {
        let origin = positions[index];
        let mut dir = target - origin;
        if dir.length_squared() == 0.0 {
            dir = positions[neighbour] - origin;
        }
        match dir.try_normalize() {
            Some(dir) => stroke.points[index].position = origin - dir * dist,
            None => debug!("stretch: zero length end at {}, skipped", index),
        }
    };

    if config.mode.does_start() {
        extend(0, 1, sample(&positions, param, false));
    }
    if config.mode.does_end() {
        extend(n - 1, n - 2, sample(&positions, param, true));
    }
}

fn stretch_curved(stroke: &mut Stroke, dist: f32, used: f32, config: &StretchConfig) {
    let original = stroke.points.len();
    let extra = config.extra_point_count as usize;
    let (do_start, do_end) = (config.mode.does_start(), config.mode.does_end());

    let head = if do_start { extra } else { 0 };
    let tail = if do_end { extra } else { 0 };
    let first = stroke.points[0];
    let last = stroke.points[original - 1];

    let mut points = Vec::with_capacity(original + head + tail);
    points.extend(std::iter::repeat_n(first, head));
    points.extend_from_slice(&stroke.points);
    points.extend(std::iter::repeat_n(last, tail));
    let dverts = stroke.dverts.as_ref().map(|dv| {
        let mut out = Vec::with_capacity(points.len());
        out.extend(std::iter::repeat_n(dv[0].clone(), head));
        out.extend_from_slice(dv);
        out.extend(std::iter::repeat_n(dv[original - 1].clone(), tail));
        out
    });

    let overshoot_param = used * (original - 2) as f32;
    let overshoot_count = (overshoot_param.ceil() as usize).clamp(1, original - 2);

    let ends = [(do_start, head, 1isize), (do_end, head + original - 1, -1isize)];
    for (enabled, start, dir) in ends {
        if !enabled {
            continue;
        }
        let at = |k: isize| points[(start as isize + dir * k) as usize].position;

        // Both chords point outward, the outer one first
        let mut outer = at(0) - at(1);
        let mut total = Vec3::ZERO;
        let mut overshoot_length = 0.0;
        for j in 0..overshoot_count {
            let fac = (overshoot_param - j as f32).min(1.0);
            let inner = at(j as isize + 1) - at(j as isize + 2);
            let added = (outer.length() + inner.length()) * 0.5 * fac;
            overshoot_length += added;
            let axis = inner.cross(outer);
            let angle = if outer.length_squared() > 0.0 && inner.length_squared() > 0.0 {
                outer.angle_between(inner) * fac
            } else {
                0.0
            };
            outer = inner;
            if angle > config.max_angle || angle > std::f32::consts::PI * 0.995 {
                continue;
            }
            total += axis.normalize_or_zero() * angle * added.powf(config.segment_influence);
        }

        if overshoot_length == 0.0 {
            debug!("stretch: overshoot window has no length, end left as is");
            continue;
        }

        let window = overshoot_param.min(overshoot_count as f32);
        let mut curvature = total.length() / overshoot_length;
        curvature /= (overshoot_length / window).powf(config.segment_influence);
        if config.invert_curvature {
            curvature = -curvature;
        }

        let angle_step = curvature * dist / extra as f32;
        let mut step_length = dist / extra as f32;
        if angle_step.abs() > f32::EPSILON {
            step_length *= (angle_step * 0.5).sin() / (angle_step * 0.5);
        } else {
            total = Vec3::ZERO;
        }

        let edge = at(0) - at(1);
        let prev_length = edge.length();
        let mut step = edge.normalize_or_zero() * step_length;
        let step_rotation = rotation(total, angle_step);
        let lead_in = (1.0 - config.segment_influence.abs()).max(0.0)
            * (curvature * prev_length - angle_step)
            / 2.0;
        step = rotation(total, lead_in) * step;

        let mut previous = at(0);
        for k in 1..=extra as isize {
            step = step_rotation * step;
            previous += step;
            points[(start as isize - dir * k) as usize].position = previous;
        }
    }

    stroke.replace_buffers(points, dverts);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;
    use stroke_config::EndMode;

    fn line(n: usize) -> Stroke {
        Stroke::new((0..n).map(|i| Point::new(Vec3::new(i as f32, 0.0, 0.0))).collect())
    }

    fn config(follow_curvature: bool, mode: EndMode) -> StretchConfig {
        StretchConfig {
            mode,
            follow_curvature,
            extra_point_count: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_straight_moves_ends() {
        let mut stroke = line(4);
        assert!(stretch(&mut stroke, 1.0, &config(false, EndMode::Both)));
        assert_eq!(stroke.len(), 4);
        assert!((stroke.points()[0].position.x + 1.0).abs() < 1e-5);
        assert!((stroke.points()[3].position.x - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_straight_start_only() {
        let mut stroke = line(2);
        assert!(stretch(&mut stroke, 0.5, &config(true, EndMode::Start)));
        assert!((stroke.points()[0].position.x + 0.5).abs() < 1e-5);
        assert_eq!(stroke.points()[1].position.x, 1.0);
    }

    #[test]
    fn test_rejects() {
        let mut single = line(1);
        assert!(!stretch(&mut single, 1.0, &config(false, EndMode::Both)));
        let mut stroke = line(3);
        assert!(!stretch(&mut stroke, 0.0, &config(false, EndMode::Both)));
        let mut none = config(true, EndMode::Both);
        none.extra_point_count = 0;
        assert!(!stretch(&mut stroke, 1.0, &none));
    }

    #[test]
    fn test_curved_on_straight_line_extends_straight() {
        let mut stroke = line(5);
        assert!(stretch(&mut stroke, 1.5, &config(true, EndMode::Both)));
        assert_eq!(stroke.len(), 11);
        let points = stroke.points();
        assert!((points[0].position - Vec3::new(-1.5, 0.0, 0.0)).length() < 1e-4);
        assert!((points[1].position - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-4);
        assert!((points[10].position - Vec3::new(5.5, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_curved_follows_arc() {
        let mut stroke = Stroke::new(
            (0..=10)
                .map(|i| {
                    let a = i as f32 * std::f32::consts::PI / 20.0;
                    Point::new(Vec3::new(a.cos(), a.sin(), 0.0))
                })
                .collect(),
        );
        assert!(stretch(&mut stroke, 0.3, &config(true, EndMode::End)));
        assert_eq!(stroke.len(), 14);
        for p in &stroke.points()[11..] {
            assert!((p.position.length() - 1.0).abs() < 1e-3);
        }
        let end = stroke.points()[13].position;
        let angle = end.y.atan2(end.x);
        assert!((angle - (std::f32::consts::FRAC_PI_2 + 0.3)).abs() < 1e-2);
    }

    #[test]
    fn test_curved_uneven_spacing_stays_on_arc() {
        let mut angle = 0.0f32;
        let mut positions = Vec::new();
        for i in 0..12 {
            positions.push(Vec3::new(angle.cos(), angle.sin(), 0.0));
            angle += if i % 2 == 0 { 0.05 } else { 0.25 };
        }
        let mut stroke = Stroke::new(positions.into_iter().map(Point::new).collect());
        assert!(stretch(&mut stroke, 0.3, &config(true, EndMode::End)));
        assert_eq!(stroke.len(), 15);
        for p in &stroke.points()[12..] {
            assert!((p.position.length() - 1.0).abs() < 2e-2);
        }
    }
}
