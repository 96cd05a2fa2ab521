//! Ear-clipping fill triangulation and fill UVs
//!
//! The polygon is walked counter-clockwise over a ring of prev/next links.
//! A vertex is an ear when its corner is convex and no other remaining
//! vertex lies inside the corner triangle. When a full lap finds no ear the
//! test is relaxed to accept flat corners, and after another empty lap the
//! current corner is clipped regardless. The output therefore always has
//! exactly `n - 2` triangles, degenerate input included.

use glam::Vec2;
use tracing::{debug, trace};

use crate::flatten::flatten_2d;
use crate::types::{Stroke, Triangle};

fn orient(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

fn point_in_triangle(a: Vec2, b: Vec2, c: Vec2, p: Vec2) -> bool {
    orient(a, b, p) >= 0.0 && orient(b, c, p) >= 0.0 && orient(c, a, p) >= 0.0
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EarTest {
    Strict,
    AllowFlat,
    Force,
}

struct Ring<'a> {
    coords: &'a [Vec2],
    order: Vec<usize>,
    prev: Vec<usize>,
    next: Vec<usize>,
}

impl Ring<'_> {
    fn coord(&self, node: usize) -> Vec2 {
        self.coords[self.order[node]]
    }

    fn is_ear(&self, node: usize, test: EarTest) -> bool {
        if test == EarTest::Force {
            return true;
        }
        let (ia, ic) = (self.prev[node], self.next[node]);
        let (a, b, c) = (self.coord(ia), self.coord(node), self.coord(ic));
        let area = orient(a, b, c);
        let convex = match test {
            EarTest::Strict => area > 0.0,
            _ => area >= 0.0,
        };
        if !convex {
            return false;
        }

        let mut p = self.next[ic];
        while p != ia {
            let pt = self.coord(p);
            if pt != a && pt != b && pt != c && point_in_triangle(a, b, c, pt) {
                return false;
            }
            p = self.next[p];
        }
        true
    }

    fn unlink(&mut self, node: usize) {
        let (p, n) = (self.prev[node], self.next[node]);
        self.next[p] = n;
        self.prev[n] = p;
    }

    fn triangle(&self, node: usize) -> Triangle {
        Triangle {
            verts: [
                self.order[self.prev[node]] as u32,
                self.order[node] as u32,
                self.order[self.next[node]] as u32,
            ],
        }
    }
}

/// Triangulate a simple polygon given in 2D
///
/// `direction` is the winding from [`flatten_2d`]: `1` clockwise, `-1`
/// counter-clockwise, `0` to measure it here.
pub fn triangulate(coords: &[Vec2], direction: i32) -> Vec<Triangle> {
    let n = coords.len();
    if n < 3 {
        return Vec::new();
    }

    let clockwise = match direction {
        0 => {
            let twice_area: f32 = (0..n).map(|i| coords[i].perp_dot(coords[(i + 1) % n])).sum();
            twice_area < 0.0
        }
        d => d > 0,
    };
    let order: Vec<usize> = if clockwise {
        (0..n).rev().collect()
    } else {
        (0..n).collect()
    };

    let mut ring = Ring {
        coords,
        order,
        prev: (0..n).map(|i| (i + n - 1) % n).collect(),
        next: (0..n).map(|i| (i + 1) % n).collect(),
    };

    let mut triangles = Vec::with_capacity(n - 2);
    let mut remaining = n;
    let mut node = 0;
    let mut misses = 0;
    let mut test = EarTest::Strict;

    while remaining > 3 {
        if ring.is_ear(node, test) {
            triangles.push(ring.triangle(node));
            ring.unlink(node);
            node = ring.next[node];
            remaining -= 1;
            misses = 0;
            test = EarTest::Strict;
            continue;
        }

        node = ring.next[node];
        misses += 1;
        if misses >= remaining {
            misses = 0;
            test = match test {
                EarTest::Strict => EarTest::AllowFlat,
                _ => {
                    debug!("triangulate: no ear among {} vertices, clipping anyway", remaining);
                    EarTest::Force
                }
            };
        }
    }
    triangles.push(ring.triangle(node));

    trace!("triangulate: {} points -> {} triangles", n, triangles.len());
    triangles
}

/// Fill UVs: map the unit square around the stroke origin to [0, 1], then
/// translate, rotate about the UV center and scale.
pub fn fill_uvs(coords: &[Vec2], rotation: f32, translation: Vec2, scale: f32) -> Vec<Vec2> {
    let min = Vec2::splat(-1.0);
    let size = Vec2::splat(2.0);
    let center = Vec2::splat(0.5);
    let rotation = Vec2::from_angle(rotation);

    coords
        .iter()
        .map(|&p| {
            let uv = (p - min) / size + translation;
            let uv = rotation.rotate(uv - center) + center;
            if scale != 0.0 { uv / scale } else { uv }
        })
        .collect()
}

/// Rebuild the stroke's fill triangles and per-point fill UVs
pub(crate) fn fill_triangulate(stroke: &mut Stroke) {
    let flat = flatten_2d(&stroke.points);
    let triangles = triangulate(&flat.points, flat.direction);

    if triangles.is_empty() {
        stroke.triangles.clear();
        return;
    }

    let uvs = fill_uvs(
        &flat.points,
        stroke.uv_rotation,
        stroke.uv_translation,
        stroke.uv_scale,
    );
    for (point, uv) in stroke.points.iter_mut().zip(uvs) {
        point.uv_fill = uv;
    }
    stroke.triangles = triangles;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(coords: &[Vec2], tris: &[Triangle]) -> f32 {
        tris.iter()
            .map(|t| {
                let [a, b, c] = t.verts.map(|i| coords[i as usize]);
                orient(a, b, c).abs() * 0.5
            })
            .sum()
    }

    fn l_shape() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
        ]
    }

    #[test]
    fn test_square() {
        let square = [Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
        let tris = triangulate(&square, -1);
        assert_eq!(tris.len(), 2);
        assert!((area(&square, &tris) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_concave_area_preserved() {
        let shape = l_shape();
        let tris = triangulate(&shape, 0);
        assert_eq!(tris.len(), shape.len() - 2);
        assert!((area(&shape, &tris) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_clockwise_input() {
        let mut shape = l_shape();
        shape.reverse();
        let tris = triangulate(&shape, 1);
        assert_eq!(tris.len(), 4);
        assert!((area(&shape, &tris) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_still_n_minus_two() {
        let line: Vec<Vec2> = (0..6).map(|i| Vec2::new(i as f32, 0.0)).collect();
        assert_eq!(triangulate(&line, 0).len(), 4);
        let same = vec![Vec2::ONE; 5];
        assert_eq!(triangulate(&same, 1).len(), 3);
    }

    #[test]
    fn test_every_index_used() {
        let shape = l_shape();
        let tris = triangulate(&shape, 0);
        let mut used = [false; 6];
        for t in &tris {
            for v in t.verts {
                used[v as usize] = true;
            }
        }
        assert!(used.iter().all(|&u| u));
    }

    #[test]
    fn test_fill_uvs_identity() {
        let uvs = fill_uvs(&[Vec2::splat(-1.0), Vec2::ONE, Vec2::ZERO], 0.0, Vec2::ZERO, 1.0);
        assert!((uvs[0] - Vec2::ZERO).length() < 1e-6);
        assert!((uvs[1] - Vec2::ONE).length() < 1e-6);
        assert!((uvs[2] - Vec2::splat(0.5)).length() < 1e-6);
    }

    #[test]
    fn test_fill_uvs_rotate_and_scale() {
        let uvs = fill_uvs(&[Vec2::new(1.0, 0.0)], std::f32::consts::FRAC_PI_2, Vec2::ZERO, 2.0);
        // (1, 0.5) rotated a quarter turn about the center is (0.5, 1), then halved
        assert!((uvs[0] - Vec2::new(0.25, 0.5)).length() < 1e-5);
    }

    #[test]
    fn test_stroke_fill() {
        use crate::types::Point;
        use glam::Vec3;
        let mut stroke = Stroke::new(
            [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.5, 1.5], [0.0, 1.0]]
                .iter()
                .map(|&[x, y]| Point::new(Vec3::new(x, y, 0.0)))
                .collect(),
        );
        stroke.geometry_update();
        assert_eq!(stroke.triangles().map(<[_]>::len), Some(3));
        assert!(stroke.points().iter().any(|p| p.uv_fill != Vec2::ZERO));
    }
}
