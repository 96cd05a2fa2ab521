//! Point reduction

use glam::Vec3;
use stroke_config::{SimplifyConfig, SimplifyMode};
use tracing::{debug, trace};

use crate::edit::merge_by_distance;
use crate::resample::resample;
use crate::types::Stroke;

pub(crate) fn distance_to_segment(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Error-bounded reduction
///
/// Starting from the two end points, every run between kept points keeps
/// its farthest point from the run's chord while that distance exceeds
/// `epsilon / 10`. Repeats until no run changes. Returns true when points
/// were removed.
pub fn simplify_adaptive(stroke: &mut Stroke, epsilon: f32) -> bool {
    let n = stroke.points.len();
    if n < 3 || epsilon <= 0.0 {
        return false;
    }

    let points = &stroke.points;
    let threshold = epsilon / 10.0;
    let mut marked = vec![false; n];
    marked[0] = true;
    marked[n - 1] = true;

    let mut changed = true;
    while changed {
        changed = false;
        let mut start = 0;
        while start < n - 1 {
            let mut end = start + 1;
            while !marked[end] {
                end += 1;
            }

            let (a, b) = (points[start].position, points[end].position);
            let mut farthest = None;
            let mut max_dist = threshold;
            for (i, point) in points.iter().enumerate().take(end).skip(start + 1) {
                let dist = distance_to_segment(point.position, a, b);
                if dist > max_dist {
                    max_dist = dist;
                    farthest = Some(i);
                }
            }
            if let Some(i) = farthest {
                marked[i] = true;
                changed = true;
            }
            start = end;
        }
    }

    let kept = marked.iter().filter(|&&m| m).count();
    if kept == n {
        return false;
    }
    trace!("simplify_adaptive: {} -> {} points", n, kept);
    stroke.retain_indices(|i| marked[i]);
    stroke.geometry_update();
    true
}

/// Keep the end points and every odd index. Needs at least four points.
pub fn simplify_fixed(stroke: &mut Stroke) -> bool {
    let n = stroke.points.len();
    if n < 4 {
        return false;
    }
    stroke.retain_indices(|i| i == 0 || i == n - 1 || i % 2 == 1);
    trace!("simplify_fixed: {} -> {} points", n, stroke.points.len());
    stroke.geometry_update();
    true
}

/// Apply the configured simplify mode. Returns true when the stroke changed.
pub fn simplify_with(stroke: &mut Stroke, config: &SimplifyConfig) -> bool {
    debug!("simplify_with: {:?} on {} points", config.mode, stroke.len());
    match config.mode {
        SimplifyMode::Adaptive { epsilon } => simplify_adaptive(stroke, epsilon),
        SimplifyMode::Fixed { steps } => {
            let mut changed = false;
            for _ in 0..steps {
                if !simplify_fixed(stroke) {
                    break;
                }
                changed = true;
            }
            changed
        }
        SimplifyMode::Sample {
            length,
            sharp_threshold,
        } => resample(stroke, length, false, sharp_threshold),
        SimplifyMode::Merge { distance } => merge_by_distance(stroke, distance, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeformVert, DeformWeight, Point};

    fn stroke_from(positions: &[[f32; 3]]) -> Stroke {
        Stroke::new(positions.iter().map(|&p| Point::new(Vec3::from(p))).collect())
    }

    fn wavy() -> Stroke {
        let positions: Vec<[f32; 3]> = (0..40)
            .map(|i| {
                let x = i as f32 * 0.25;
                [x, x.sin(), 0.0]
            })
            .collect();
        stroke_from(&positions)
    }

    #[test]
    fn test_distance_to_segment() {
        let (a, b) = (Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        assert!((distance_to_segment(Vec3::new(1.0, 1.0, 0.0), a, b) - 1.0).abs() < 1e-6);
        assert!((distance_to_segment(Vec3::new(3.0, 0.0, 0.0), a, b) - 1.0).abs() < 1e-6);
        assert!((distance_to_segment(Vec3::Y, a, a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_collinear_reduces_to_endpoints() {
        let mut stroke = stroke_from(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [3.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
        ]);
        assert!(simplify_adaptive(&mut stroke, 0.001));
        assert_eq!(stroke.len(), 2);
        assert_eq!(stroke.points()[1].position.x, 4.0);
    }

    #[test]
    fn test_adaptive_idempotent() {
        let mut stroke = wavy();
        simplify_adaptive(&mut stroke, 0.5);
        let first = stroke.len();
        assert!(first < 40 && first > 2);
        assert!(!simplify_adaptive(&mut stroke, 0.5));
        assert_eq!(stroke.len(), first);
    }

    #[test]
    fn test_adaptive_keeps_error_bound() {
        let original = wavy();
        let mut stroke = original.clone();
        simplify_adaptive(&mut stroke, 0.5);
        let kept = stroke.points();
        for p in original.points() {
            let nearest = kept
                .windows(2)
                .map(|w| distance_to_segment(p.position, w[0].position, w[1].position))
                .fold(f32::MAX, f32::min);
            assert!(nearest <= 0.05 + 1e-5);
        }
    }

    #[test]
    fn test_adaptive_keeps_weights_aligned() {
        let points: Vec<Point> = [[0.0, 0.0], [1.0, 0.5], [2.0, 1.0], [3.0, 0.0]]
            .iter()
            .map(|&[x, y]| Point::new(Vec3::new(x, y, 0.0)))
            .collect();
        let dverts = (0..4)
            .map(|i| DeformVert::new(vec![DeformWeight { group: 0, weight: i as f32 }]))
            .collect();
        let mut stroke = Stroke::from_parts(points, Some(dverts)).unwrap();
        assert!(simplify_adaptive(&mut stroke, 1.0));
        assert_eq!(stroke.len(), 3);
        let weights: Vec<f32> = stroke.dverts().unwrap().iter().map(|dv| dv.weight(0)).collect();
        assert_eq!(weights, vec![0.0, 2.0, 3.0]);
    }

    #[test]
    fn test_fixed() {
        let mut stroke = stroke_from(&[[0.0; 3]; 3]);
        assert!(!simplify_fixed(&mut stroke));

        let positions: Vec<[f32; 3]> = (0..7).map(|i| [i as f32, 0.0, 0.0]).collect();
        let mut stroke = stroke_from(&positions);
        assert!(simplify_fixed(&mut stroke));
        let xs: Vec<f32> = stroke.points().iter().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 3.0, 5.0, 6.0]);
    }

    #[test]
    fn test_simplify_with_modes() {
        let positions: Vec<[f32; 3]> = (0..9).map(|i| [i as f32, 0.0, 0.0]).collect();

        let mut stroke = stroke_from(&positions);
        let config = SimplifyConfig {
            mode: SimplifyMode::Fixed { steps: 2 },
        };
        assert!(simplify_with(&mut stroke, &config));
        assert_eq!(stroke.len(), 4);

        let mut stroke = stroke_from(&positions);
        assert!(simplify_with(&mut stroke, &SimplifyConfig::sample(2.0)));
        assert_eq!(stroke.len(), 5);

        let mut stroke = stroke_from(&positions);
        let config = SimplifyConfig {
            mode: SimplifyMode::Adaptive { epsilon: 0.1 },
        };
        assert!(simplify_with(&mut stroke, &config));
        assert_eq!(stroke.len(), 2);
    }
}
