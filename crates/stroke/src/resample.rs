//! Point density changes: uniform resampling and subdivision

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{debug, trace, warn};

use crate::constants::{DIST_EPSILON, STRENGTH_MIN};
use crate::list::LinkedPoints;
use crate::march::{march_count, march_limit, march_next_point};
use crate::tags::PointTags;
use crate::types::{DeformVert, Point, Stroke};

/// Rebuild the stroke with points every `spacing` units of arc length.
///
/// Interior corners sharper than `sharp_threshold` (radians) are kept as
/// stored points. The first point is kept, the last point of an open stroke
/// is kept, and a cyclic stroke does not repeat its first point at the end.
/// Deform weights are blended between the bracketing points. New points are
/// selected when `select` is set.
///
/// Returns false (stroke untouched) for fewer than two points or a spacing
/// below [`DIST_EPSILON`].
pub fn resample(stroke: &mut Stroke, spacing: f32, select: bool, sharp_threshold: f32) -> bool {
    let n = stroke.points.len();
    if n < 2 || spacing < DIST_EPSILON {
        debug!("resample: rejected, {} points at spacing {}", n, spacing);
        return false;
    }

    let mut tags = PointTags::new(n);
    let mut count = march_count(stroke, &mut tags, spacing, sharp_threshold);
    if stroke.cyclic {
        count -= 1;
    }
    let limit = march_limit(stroke, spacing);

    let mut points = Vec::with_capacity(count);
    let mut dverts = stroke.dverts.as_ref().map(|_| Vec::with_capacity(count));

    let mut first = stroke.points[0];
    first.selected = select;
    points.push(first);
    if let (Some(out), Some(src)) = (dverts.as_mut(), stroke.dverts.as_ref()) {
        out.push(src[0].clone());
    }

    let mut current = first.position;
    let mut next_index = 1;
    loop {
        let sample = march_next_point(stroke, &tags, next_index, current, spacing);
        if stroke.cyclic && sample.next.is_none() {
            break;
        }

        let mut point = sample.point;
        point.selected = select;
        points.push(point);
        if let (Some(out), Some(src)) = (dverts.as_mut(), stroke.dverts.as_ref()) {
            out.push(src[sample.from].lerp(&src[sample.to], sample.ratio));
        }

        match sample.next {
            Some(next) if points.len() < limit => {
                next_index = next;
                current = point.position;
            }
            Some(_) => {
                warn!("resample: spacing {} too small to advance, stopping early", spacing);
                break;
            }
            None => break,
        }
    }
    debug_assert!(points.len() == count || points.len() >= limit);

    trace!("resample: {} -> {} points", n, points.len());
    stroke.replace_buffers(points, dverts);
    stroke.geometry_update();
    true
}

/// How [`subdivide`] places the original points after inserting midpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubdivideKind {
    /// Originals stay where they are
    #[default]
    Simple,
    /// Originals move halfway toward the midpoint of their new neighbours
    Smooth,
}

fn midpoint(a: &Point, b: &Point) -> Point {
    let mut mid = a.lerp(b, 0.5);
    mid.strength = mid.strength.clamp(STRENGTH_MIN, 1.0);
    mid
}

/// Insert a midpoint on every segment, `level` times over. Cyclic strokes
/// also split their closing segment. Returns false for fewer than two points.
pub fn subdivide(stroke: &mut Stroke, level: u32, kind: SubdivideKind) -> bool {
    if stroke.points.len() < 2 {
        return false;
    }
    let cyclic = stroke.cyclic;

    for _ in 0..level {
        let old = &stroke.points;
        let n = old.len();
        let segments = if cyclic { n } else { n - 1 };

        let mut points = Vec::with_capacity(n + segments);
        let mut dverts = stroke.dverts.as_ref().map(|_| Vec::with_capacity(n + segments));
        for i in 0..n {
            points.push(old[i]);
            if let (Some(out), Some(src)) = (dverts.as_mut(), stroke.dverts.as_ref()) {
                out.push(src[i].clone());
            }
            if i < segments {
                let j = (i + 1) % n;
                points.push(midpoint(&old[i], &old[j]));
                if let (Some(out), Some(src)) = (dverts.as_mut(), stroke.dverts.as_ref()) {
                    out.push(src[i].lerp(&src[j], 0.5));
                }
            }
        }

        if kind == SubdivideKind::Smooth {
            let total = points.len();
            let start = if cyclic { 0 } else { 2 };
            // Originals sit on even indices; open strokes keep both ends
            for i in (start..total).step_by(2) {
                if !cyclic && i + 1 >= total {
                    break;
                }
                let prev = points[(i + total - 1) % total].position;
                let next = points[(i + 1) % total].position;
                let target = prev.lerp(next, 0.5);
                points[i].position = target.lerp(points[i].position, 0.5);
            }
        }

        stroke.replace_buffers(points, dverts);
    }

    trace!("subdivide: {} points after {} levels", stroke.points.len(), level);
    stroke.geometry_update();
    true
}

struct Edge {
    length_squared: f32,
    from: usize,
    to: usize,
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Edge {}

impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> Ordering {
        // Longest first; ties go to the older node
        self.length_squared
            .total_cmp(&other.length_squared)
            .then_with(|| other.from.cmp(&self.from))
    }
}

type Entry = (Point, Option<DeformVert>);

fn edge(list: &LinkedPoints<Entry>, from: usize, to: usize) -> Edge {
    Edge {
        length_squared: list.get(from).0.position.distance_squared(list.get(to).0.position),
        from,
        to,
    }
}

/// Split the longest segment at its midpoint until the stroke has `target`
/// points. Cyclic strokes include the closing segment. New points are
/// selected when `select` is set.
///
/// Returns false when the stroke has fewer than two points or already has
/// `target` or more.
pub fn uniform_subdivide(stroke: &mut Stroke, target: usize, select: bool) -> bool {
    let n = stroke.points.len();
    if n < 2 || n >= target {
        return false;
    }

    let mut list = LinkedPoints::new();
    let handles: Vec<usize> = stroke
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| list.push_back((*p, stroke.dverts.as_ref().map(|dv| dv[i].clone()))))
        .collect();

    let mut heap: BinaryHeap<Edge> = handles.windows(2).map(|w| edge(&list, w[0], w[1])).collect();
    if stroke.cyclic {
        heap.push(edge(&list, handles[n - 1], handles[0]));
    }

    while list.len() < target {
        let Some(longest) = heap.pop() else {
            break;
        };
        let (a, da) = list.get(longest.from);
        let (b, db) = list.get(longest.to);
        let mut mid = a.lerp(b, 0.5);
        mid.selected = select;
        let dvert = match (da, db) {
            (Some(da), Some(db)) => Some(da.lerp(db, 0.5)),
            _ => None,
        };

        let handle = list.insert_after(longest.from, (mid, dvert));
        heap.push(edge(&list, longest.from, handle));
        heap.push(edge(&list, handle, longest.to));
    }

    let (points, dverts): (Vec<Point>, Vec<Option<DeformVert>>) = list.to_vec().into_iter().unzip();
    let dverts = stroke
        .dverts
        .as_ref()
        .map(|_| dverts.into_iter().map(Option::unwrap_or_default).collect());
    trace!("uniform_subdivide: {} -> {} points", n, points.len());
    stroke.replace_buffers(points, dverts);
    stroke.geometry_update();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeformWeight;
    use glam::Vec3;

    fn stroke_from(positions: &[[f32; 3]]) -> Stroke {
        Stroke::new(positions.iter().map(|&p| Point::new(Vec3::from(p))).collect())
    }

    fn xs(stroke: &Stroke) -> Vec<f32> {
        stroke.points().iter().map(|p| p.position.x).collect()
    }

    #[test]
    fn test_resample_straight_line() {
        let mut stroke = stroke_from(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        assert!(resample(&mut stroke, 0.5, false, 0.1));
        let xs = xs(&stroke);
        assert_eq!(xs.len(), 5);
        for (x, expected) in xs.iter().zip([0.0, 0.5, 1.0, 1.5, 2.0]) {
            assert!((x - expected).abs() < 1e-5);
        }
        assert!(stroke.points().iter().all(|p| (p.pressure - 1.0).abs() < 1e-6));
        assert!(!stroke.is_dirty());
    }

    #[test]
    fn test_resample_rejects() {
        let mut single = stroke_from(&[[0.0, 0.0, 0.0]]);
        assert!(!resample(&mut single, 0.5, false, 0.1));
        let mut line = stroke_from(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        assert!(!resample(&mut line, 0.0, false, 0.1));
        assert_eq!(line.len(), 2);
    }

    #[test]
    fn test_resample_keeps_sharp_corners() {
        let mut stroke = stroke_from(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 1.0, 0.0],
            [2.0, 2.0, 0.0],
        ]);
        let before = stroke.length(true);
        assert!(resample(&mut stroke, 0.3, true, 2.0));
        for corner in [Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0), Vec3::new(2.0, 1.0, 0.0)] {
            assert!(stroke.points().iter().any(|p| p.position.distance(corner) < 1e-5));
        }
        assert!((stroke.length(true) - before).abs() < 1e-4);
        assert!(stroke.points().iter().all(|p| p.selected));
    }

    #[test]
    fn test_resample_arc_length_within_spacing() {
        let positions: Vec<[f32; 3]> = (0..=20)
            .map(|i| {
                let a = i as f32 / 20.0 * std::f32::consts::PI;
                [a.cos() * 3.0, a.sin() * 3.0, 0.0]
            })
            .collect();
        let mut stroke = stroke_from(&positions);
        let before = stroke.length(true);
        let spacing = 0.4;
        assert!(resample(&mut stroke, spacing, false, 0.1));
        assert!((stroke.length(true) - before).abs() <= spacing);
        let last = stroke.points().last().unwrap().position;
        assert!((last - Vec3::new(-3.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_resample_cyclic_does_not_repeat_start() {
        let mut stroke = stroke_from(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        stroke.cyclic = true;
        assert!(resample(&mut stroke, 0.5, false, 0.1));
        assert_eq!(stroke.len(), 8);
        let points = stroke.points();
        assert!(points[0].position.distance(points[7].position) > 0.4);
    }

    #[test]
    fn test_resample_blends_weights() {
        let dverts = vec![
            DeformVert::new(vec![DeformWeight { group: 1, weight: 0.0 }]),
            DeformVert::new(vec![DeformWeight { group: 1, weight: 1.0 }]),
        ];
        let points = vec![Point::new(Vec3::ZERO), Point::new(Vec3::X)];
        let mut stroke = Stroke::from_parts(points, Some(dverts)).unwrap();
        assert!(resample(&mut stroke, 0.25, false, 0.1));
        let dverts = stroke.dverts().unwrap();
        assert_eq!(dverts.len(), stroke.len());
        assert!((dverts[1].weight(1) - 0.25).abs() < 1e-5);
        assert!((dverts[4].weight(1) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_subdivide_simple() {
        let mut stroke = stroke_from(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [4.0, 0.0, 0.0]]);
        stroke.points_mut()[1].strength = 0.0;
        stroke.points_mut()[0].strength = 0.0;
        assert!(subdivide(&mut stroke, 1, SubdivideKind::Simple));
        assert_eq!(xs(&stroke), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!((stroke.points()[1].strength - STRENGTH_MIN).abs() < 1e-6);

        assert!(subdivide(&mut stroke, 2, SubdivideKind::Simple));
        assert_eq!(stroke.len(), 17);
    }

    #[test]
    fn test_subdivide_cyclic_splits_closing_edge() {
        let mut stroke = stroke_from(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        stroke.cyclic = true;
        assert!(subdivide(&mut stroke, 1, SubdivideKind::Simple));
        assert_eq!(stroke.len(), 6);
        assert!((stroke.points()[5].position - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_subdivide_smooth_pulls_corner_in() {
        let mut stroke = stroke_from(&[[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 0.0, 0.0]]);
        assert!(subdivide(&mut stroke, 1, SubdivideKind::Smooth));
        let points = stroke.points();
        assert_eq!(points[0].position, Vec3::ZERO);
        assert_eq!(points[4].position, Vec3::new(2.0, 0.0, 0.0));
        // Midpoint of the neighbours is (1, 0.5), halfway back from the corner
        assert!((points[2].position - Vec3::new(1.0, 0.75, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_uniform_subdivide_splits_longest_first() {
        let mut stroke = stroke_from(&[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [5.0, 0.0, 0.0]]);
        assert!(uniform_subdivide(&mut stroke, 5, true));
        assert_eq!(xs(&stroke), vec![0.0, 1.0, 2.0, 4.0, 5.0]);
        assert!(stroke.points()[1].selected && !stroke.points()[0].selected);
    }

    #[test]
    fn test_uniform_subdivide_cyclic_and_rejects() {
        let mut stroke = stroke_from(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 3.0, 0.0]]);
        stroke.cyclic = true;
        assert!(uniform_subdivide(&mut stroke, 4, false));
        // The closing edge (length sqrt 10) is the longest
        assert!((stroke.points()[3].position - Vec3::new(0.5, 1.5, 0.0)).length() < 1e-6);
        assert!(!uniform_subdivide(&mut stroke, 4, false));
        assert!(!uniform_subdivide(&mut stroke_from(&[[0.0; 3]]), 4, false));
    }
}
