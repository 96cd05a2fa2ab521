use tracing::{debug, trace};

use crate::tags::PointTags;
use crate::types::{CapStyle, Stroke};

/// Remove every tagged point, weights included
///
/// Returns false once the stroke has no points left; the owner is expected
/// to unlink it then.
pub fn dissolve_tagged(stroke: &mut Stroke, tags: &PointTags) -> bool {
    debug_assert_eq!(tags.len(), stroke.points.len(), "tags sized for another stroke");
    let n = stroke.points.len();
    let removed = (0..n).filter(|&i| tags.get(i)).count();
    if removed == 0 {
        return n > 0;
    }
    if removed == n {
        stroke.clear();
        return false;
    }

    stroke.retain_indices(|i| !tags.get(i));
    trace!("dissolve_tagged: removed {} of {} points", removed, n);
    stroke.geometry_update();
    true
}

/// Merge runs of points closer than `threshold` into their first point
///
/// A single forward sweep: each kept point absorbs the following points
/// within reach. Unless `use_unselected` is set both points of a pair must
/// be selected. The end points are never removed. Returns true when points
/// were removed.
pub fn merge_by_distance(stroke: &mut Stroke, threshold: f32, use_unselected: bool) -> bool {
    let n = stroke.points.len();
    if n < 2 {
        return false;
    }

    let points = &stroke.points;
    let limit = threshold * threshold;
    let mut tags = PointTags::new(n);
    let mut i = 0;
    let mut step = 1;
    while i < n - 1 && i + step < n {
        if tags.get(i) {
            i += 1;
            step = 1;
            continue;
        }
        let next = i + step;
        if tags.get(next) {
            step += 1;
            continue;
        }
        if !use_unselected && !(points[i].selected && points[next].selected) {
            i += 1;
            step = 1;
            continue;
        }
        if points[i].position.distance_squared(points[next].position) <= limit {
            tags.set(next);
        } else {
            i += 1;
            step = 1;
        }
    }

    tags.unset(0);
    tags.unset(n - 1);
    if !tags.any() {
        return false;
    }
    debug!("merge_by_distance: merging {} points", tags.count());
    dissolve_tagged(stroke, &tags);
    true
}

/// Split a stroke into one new stroke per run of untagged points
///
/// Returns the pieces in order; the caller replaces the source stroke with
/// them. Pieces of `limit` points or fewer are dropped when `limit` is
/// non-zero. With `flat_cap` the cut ends get flat caps. For a cyclic
/// stroke whose first and last runs touch the seam those two runs become a
/// single piece, placed first. All pieces are open.
pub fn delete_tagged_points(
    stroke: &Stroke,
    tags: &PointTags,
    select: bool,
    flat_cap: bool,
    limit: usize,
) -> Vec<Stroke> {
    let n = stroke.points.len();
    let mut islands: Vec<(usize, usize)> = Vec::new();
    let mut in_island = false;
    for i in 0..n {
        if tags.get(i) {
            in_island = false;
        } else if in_island {
            if let Some(island) = islands.last_mut() {
                island.1 = i;
            }
        } else {
            in_island = true;
            islands.push((i, i));
        }
    }

    let piece = |index: usize, (start, end): (usize, usize)| {
        let mut new = stroke.duplicate_style();
        new.cyclic = false;
        new.points = stroke.points[start..=end].to_vec();
        new.dverts = stroke.dverts.as_ref().map(|dv| dv[start..=end].to_vec());
        if flat_cap {
            if index % 2 == 0 {
                new.end_cap = CapStyle::Flat;
            } else {
                new.start_cap = CapStyle::Flat;
            }
        }
        if select {
            new.selected = true;
        }
        new
    };

    let mut pieces: Vec<Option<Stroke>> = islands
        .iter()
        .enumerate()
        .map(|(index, &island)| {
            let new = piece(index, island);
            (limit == 0 || new.len() > limit).then_some(new)
        })
        .collect();

    let wraps = stroke.cyclic
        && islands.len() > 1
        && islands.first().is_some_and(|island| island.0 == 0)
        && islands.last().is_some_and(|island| island.1 == n - 1);
    let count = pieces.len();
    if wraps && pieces[0].is_some() && pieces[count - 1].is_some() {
        if let (Some(first), Some(last)) = (pieces[0].take(), pieces[count - 1].take()) {
            let mut joined = first.duplicate_style();
            joined.points = last.points;
            joined.points.extend_from_slice(&first.points);
            joined.dverts = match (last.dverts, first.dverts) {
                (Some(mut tail), Some(head)) => {
                    tail.extend(head);
                    Some(tail)
                }
                _ => None,
            };
            pieces[0] = Some(joined);
        }
    } else if wraps {
        debug!("delete_tagged_points: seam piece dropped, loop left open");
    }

    let mut pieces: Vec<Stroke> = pieces.into_iter().flatten().collect();
    for piece in &mut pieces {
        piece.geometry_update();
    }
    trace!("delete_tagged_points: {} islands, {} strokes kept", islands.len(), pieces.len());
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeformVert, DeformWeight, Point};
    use glam::Vec3;

    fn line(n: usize) -> Stroke {
        Stroke::new((0..n).map(|i| Point::new(Vec3::new(i as f32, 0.0, 0.0))).collect())
    }

    fn xs(stroke: &Stroke) -> Vec<f32> {
        stroke.points().iter().map(|p| p.position.x).collect()
    }

    #[test]
    fn test_dissolve_tagged() {
        let points = line(5).points().to_vec();
        let dverts = (0..5)
            .map(|i| DeformVert::new(vec![DeformWeight { group: 0, weight: i as f32 }]))
            .collect();
        let mut stroke = Stroke::from_parts(points, Some(dverts)).unwrap();
        let tags = PointTags::from_fn(5, |i| i % 2 == 1);
        assert!(dissolve_tagged(&mut stroke, &tags));
        assert_eq!(xs(&stroke), vec![0.0, 2.0, 4.0]);
        assert_eq!(stroke.dverts().unwrap()[1].weight(0), 2.0);
    }

    #[test]
    fn test_dissolve_everything_empties() {
        let mut stroke = line(3);
        assert!(!dissolve_tagged(&mut stroke, &PointTags::from_fn(3, |_| true)));
        assert!(stroke.is_empty());
    }

    #[test]
    fn test_merge_by_distance() {
        let mut stroke = Stroke::new(
            [0.0, 0.05, 0.1, 1.0, 1.02, 2.0]
                .iter()
                .map(|&x| Point::new(Vec3::new(x, 0.0, 0.0)))
                .collect(),
        );
        assert!(merge_by_distance(&mut stroke, 0.15, true));
        assert_eq!(xs(&stroke), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_merge_keeps_end_points() {
        let mut stroke = Stroke::new(
            [0.0, 1.0, 1.01]
                .iter()
                .map(|&x| Point::new(Vec3::new(x, 0.0, 0.0)))
                .collect(),
        );
        assert!(!merge_by_distance(&mut stroke, 0.1, true));
        assert_eq!(stroke.len(), 3);
    }

    #[test]
    fn test_merge_selection_only() {
        let mut stroke = Stroke::new(
            [0.0, 0.5, 0.51, 0.52, 2.0]
                .iter()
                .map(|&x| Point::new(Vec3::new(x, 0.0, 0.0)))
                .collect(),
        );
        assert!(!merge_by_distance(&mut stroke, 0.1, false));
        stroke.points_mut()[1].selected = true;
        stroke.points_mut()[2].selected = true;
        assert!(merge_by_distance(&mut stroke, 0.1, false));
        assert_eq!(xs(&stroke), vec![0.0, 0.5, 0.52, 2.0]);
    }

    #[test]
    fn test_delete_tagged_islands() {
        let stroke = line(8);
        let tags = PointTags::from_fn(8, |i| i == 2 || i == 5);
        let pieces = delete_tagged_points(&stroke, &tags, false, true, 0);
        assert_eq!(pieces.len(), 3);
        assert_eq!(xs(&pieces[0]), vec![0.0, 1.0]);
        assert_eq!(xs(&pieces[1]), vec![3.0, 4.0]);
        assert_eq!(xs(&pieces[2]), vec![6.0, 7.0]);
        assert_eq!(pieces[0].end_cap, CapStyle::Flat);
        assert_eq!(pieces[1].start_cap, CapStyle::Flat);
        assert!(pieces.iter().all(|p| !p.is_dirty()));
    }

    #[test]
    fn test_delete_tagged_limit() {
        let stroke = line(8);
        let tags = PointTags::from_fn(8, |i| i == 1 || i == 5);
        let pieces = delete_tagged_points(&stroke, &tags, true, false, 1);
        assert_eq!(pieces.len(), 2);
        assert_eq!(xs(&pieces[0]), vec![2.0, 3.0, 4.0]);
        assert!(pieces[0].selected);
    }

    #[test]
    fn test_delete_tagged_cyclic_joins_seam() {
        let mut stroke = line(6);
        stroke.cyclic = true;
        let tags = PointTags::from_fn(6, |i| i == 2);
        let pieces = delete_tagged_points(&stroke, &tags, false, false, 0);
        assert_eq!(pieces.len(), 1);
        assert_eq!(xs(&pieces[0]), vec![3.0, 4.0, 5.0, 0.0, 1.0]);
        assert!(!pieces[0].cyclic);
    }

    #[test]
    fn test_delete_everything() {
        let stroke = line(3);
        let pieces = delete_tagged_points(&stroke, &PointTags::from_fn(3, |_| true), false, false, 0);
        assert!(pieces.is_empty());
    }
}
