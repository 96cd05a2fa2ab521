//! Derived stroke data and whole-stroke queries

use glam::{Mat4, Vec3, Vec3Swizzles};
use tracing::trace;

use crate::triangulate::fill_triangulate;
use crate::types::{BoundBox, Stroke};

impl Stroke {
    /// Rebuild everything derived from the point buffer: fill triangles and
    /// fill UVs (when there are more than two points), the per-point length
    /// coordinate and the bounds. Call after any point mutation.
    pub fn geometry_update(&mut self) {
        if self.points.len() > 2 {
            fill_triangulate(self);
        } else {
            self.triangles.clear();
        }
        self.uv_update();
        self.bound_box = self.minmax(false).unwrap_or_default();
        self.dirty = false;
        trace!(
            "geometry_update: {} points, {} triangles",
            self.points.len(),
            self.triangles.len()
        );
    }

    /// Write the accumulated arc length into each point's `uv_fac`
    pub fn uv_update(&mut self) {
        let mut total = 0.0;
        let mut last = match self.points.first() {
            Some(first) => first.position,
            None => return,
        };
        for point in &mut self.points {
            total += point.position.distance(last);
            point.uv_fac = total;
            last = point.position;
        }
    }

    /// Bounds of all points, or only the selected ones
    pub fn minmax(&self, select_only: bool) -> Option<BoundBox> {
        BoundBox::from_positions(
            self.points
                .iter()
                .filter(|p| !select_only || p.selected)
                .map(|p| p.position),
        )
    }

    /// Polyline length, ignoring z when `use_3d` is false
    pub fn length(&self, use_3d: bool) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.segment_length(0, self.points.len() - 1, use_3d)
    }

    /// Length of the sub-polyline `start..=end`, indices clamped to the stroke
    pub fn segment_length(&self, start: usize, end: usize, use_3d: bool) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let last = self.points.len() - 1;
        let (start, end) = (start.min(last), end.min(last));
        if start >= end {
            return 0.0;
        }
        self.points[start..=end]
            .windows(2)
            .map(|w| {
                if use_3d {
                    w[0].position.distance(w[1].position)
                } else {
                    w[0].position.xy().distance(w[1].position.xy())
                }
            })
            .sum()
    }

    /// Plane normal from the first segment and the point at 75% of the
    /// stroke. Zero for fewer than three points.
    pub fn normal(&self) -> Vec3 {
        if self.points.len() < 3 {
            return Vec3::ZERO;
        }
        let p0 = self.points[0].position;
        let p1 = self.points[1].position;
        let p3 = self.points[(self.points.len() as f32 * 0.75) as usize].position;
        (p1 - p0).cross(p3 - p0).normalize_or_zero()
    }

    /// Apply an affine transform to every point
    pub fn transform(&mut self, matrix: &Mat4) {
        for point in &mut self.points {
            point.position = matrix.transform_point3(point.position);
        }
        self.dirty = true;
    }

    /// Move points from object space into view space
    pub fn to_view_space(&mut self, view: &Mat4, object_to_world: &Mat4) {
        self.transform(&(*view * *object_to_world));
    }

    /// Inverse of [`Stroke::to_view_space`]
    pub fn from_view_space(&mut self, view_inverse: &Mat4, object_to_world: &Mat4) {
        self.transform(&(object_to_world.inverse() * *view_inverse));
    }

    /// Mean pressure over all points
    pub fn average_pressure(&self) -> f32 {
        match self.points.len() {
            0 => 0.0,
            n => self.points.iter().map(|p| p.pressure).sum::<f32>() / n as f32,
        }
    }

    /// True when every point has exactly the first point's pressure
    pub fn is_pressure_constant(&self) -> bool {
        match self.points.first() {
            Some(first) => self.points.iter().all(|p| p.pressure == first.pressure),
            None => true,
        }
    }
}
