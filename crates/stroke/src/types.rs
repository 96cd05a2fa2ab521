use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::validation::{StrokeError, check_deform_length};

/// Default stroke thickness in pixels
pub const DEFAULT_THICKNESS: f32 = 10.0;

/// A single stroke point
///
/// Everything here is persistent. Scratch marks used while an algorithm
/// runs live in [`crate::PointTags`], never on the point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Location in object space
    pub position: Vec3,
    /// Radius multiplier (>= 0)
    pub pressure: f32,
    /// Opacity multiplier in [0, 1]
    pub strength: f32,
    /// Per-point vertex color, alpha is the mix factor
    pub vertex_color: Vec4,
    /// Texture rotation along the stroke
    pub uv_rotation: f32,
    /// Accumulated length used as texture coordinate along the stroke
    pub uv_fac: f32,
    /// Fill texture coordinate
    pub uv_fill: Vec2,
    /// Selection state
    pub selected: bool,
}

impl Default for Point {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            pressure: 1.0,
            strength: 1.0,
            vertex_color: Vec4::ZERO,
            uv_rotation: 0.0,
            uv_fac: 0.0,
            uv_fill: Vec2::ZERO,
            selected: false,
        }
    }
}

impl Point {
    /// Point at `position` with unit pressure and strength
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Same point with a different pressure
    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = pressure;
        self
    }

    /// Interpolate every attribute from `self` (t = 0) to `other` (t = 1).
    /// The result is unselected.
    pub fn lerp(&self, other: &Point, t: f32) -> Point {
        Point {
            position: self.position.lerp(other.position, t),
            pressure: lerp(self.pressure, other.pressure, t),
            strength: lerp(self.strength, other.strength, t),
            vertex_color: self.vertex_color.lerp(other.vertex_color, t),
            uv_rotation: lerp(self.uv_rotation, other.uv_rotation, t),
            uv_fac: lerp(self.uv_fac, other.uv_fac, t),
            uv_fill: self.uv_fill.lerp(other.uv_fill, t),
            selected: false,
        }
    }
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// One `(group, weight)` pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeformWeight {
    pub group: u32,
    pub weight: f32,
}

/// Sparse deform weights of one point
///
/// The engine copies and blends these but never interprets the groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeformVert {
    pub weights: Vec<DeformWeight>,
}

impl DeformVert {
    pub fn new(weights: Vec<DeformWeight>) -> Self {
        Self { weights }
    }

    /// Weight of `group`, 0.0 when the point is not in it
    pub fn weight(&self, group: u32) -> f32 {
        self.weights
            .iter()
            .find(|dw| dw.group == group)
            .map_or(0.0, |dw| dw.weight)
    }

    /// Entry for `group`, created with weight 0.0 if missing
    pub fn ensure(&mut self, group: u32) -> &mut DeformWeight {
        let index = match self.weights.iter().position(|dw| dw.group == group) {
            Some(index) => index,
            None => {
                self.weights.push(DeformWeight { group, weight: 0.0 });
                self.weights.len() - 1
            }
        };
        &mut self.weights[index]
    }

    /// Blend over the union of both group sets
    pub fn lerp(&self, other: &DeformVert, t: f32) -> DeformVert {
        let mut groups: Vec<u32> = self.weights.iter().map(|dw| dw.group).collect();
        for dw in &other.weights {
            if !groups.contains(&dw.group) {
                groups.push(dw.group);
            }
        }
        DeformVert {
            weights: groups
                .into_iter()
                .map(|group| DeformWeight {
                    group,
                    weight: lerp(self.weight(group), other.weight(group), t),
                })
                .collect(),
        }
    }
}

/// End cap shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum CapStyle {
    #[default]
    Round = 0,
    Flat = 1,
}

/// Axis aligned bounds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundBox {
    /// Bounds of a set of positions, `None` when empty
    pub fn from_positions(positions: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let mut bounds = BoundBox {
            min: first,
            max: first,
        };
        for position in iter {
            bounds.extend(position);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, position: Vec3) {
        self.min = self.min.min(position);
        self.max = self.max.max(position);
    }

    pub fn union(&self, other: &BoundBox) -> BoundBox {
        BoundBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Fill triangle, indices into the stroke's points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Triangle {
    pub verts: [u32; 3],
}

fn stale() -> bool {
    true
}

/// An ordered polyline (or polygon when cyclic) of points with shared style
///
/// The point buffer and the optional deform buffer are private so they stay
/// index aligned. The fill triangles and bounds are derived data, rebuilt by
/// [`Stroke::geometry_update`] and never edited by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stroke {
    pub(crate) points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) dverts: Option<Vec<DeformVert>>,
    /// Closed loop: the last point connects back to the first
    pub cyclic: bool,
    pub start_cap: CapStyle,
    pub end_cap: CapStyle,
    pub material_index: u32,
    /// Base thickness in pixels
    pub thickness: f32,
    pub fill_opacity: f32,
    pub uv_scale: f32,
    pub uv_rotation: f32,
    pub uv_translation: Vec2,
    /// Softness of the stroke edge, 1.0 = hard
    pub hardness: f32,
    pub aspect_ratio: Vec2,
    pub selected: bool,
    #[serde(skip)]
    pub(crate) bound_box: BoundBox,
    #[serde(skip)]
    pub(crate) triangles: Vec<Triangle>,
    #[serde(skip, default = "stale")]
    pub(crate) dirty: bool,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            dverts: None,
            cyclic: false,
            start_cap: CapStyle::Round,
            end_cap: CapStyle::Round,
            material_index: 0,
            thickness: DEFAULT_THICKNESS,
            fill_opacity: 1.0,
            uv_scale: 1.0,
            uv_rotation: 0.0,
            uv_translation: Vec2::ZERO,
            hardness: 1.0,
            aspect_ratio: Vec2::ONE,
            selected: false,
            bound_box: BoundBox::default(),
            triangles: Vec::new(),
            dirty: true,
        }
    }
}

impl Stroke {
    /// Stroke without deform weights
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }

    /// Stroke from a point buffer and an optional deform buffer of the same length
    pub fn from_parts(
        points: Vec<Point>,
        dverts: Option<Vec<DeformVert>>,
    ) -> Result<Self, StrokeError> {
        check_deform_length(points.len(), dverts.as_ref().map(Vec::len))?;
        Ok(Self {
            points,
            dverts,
            ..Default::default()
        })
    }

    /// Empty stroke carrying this stroke's style and flags
    pub fn duplicate_style(&self) -> Self {
        Self {
            points: Vec::new(),
            dverts: None,
            cyclic: self.cyclic,
            start_cap: self.start_cap,
            end_cap: self.end_cap,
            material_index: self.material_index,
            thickness: self.thickness,
            fill_opacity: self.fill_opacity,
            uv_scale: self.uv_scale,
            uv_rotation: self.uv_rotation,
            uv_translation: self.uv_translation,
            hardness: self.hardness,
            aspect_ratio: self.aspect_ratio,
            selected: self.selected,
            bound_box: BoundBox::default(),
            triangles: Vec::new(),
            dirty: true,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Mutable point access. The point count cannot change through this, but
    /// the fill cache is considered stale until the next geometry update.
    pub fn points_mut(&mut self) -> &mut [Point] {
        self.dirty = true;
        &mut self.points
    }

    pub fn dverts(&self) -> Option<&[DeformVert]> {
        self.dverts.as_deref()
    }

    pub fn dverts_mut(&mut self) -> Option<&mut [DeformVert]> {
        self.dverts.as_deref_mut()
    }

    /// Give every point an empty deform record if the stroke has none yet
    pub fn ensure_dverts(&mut self) -> &mut [DeformVert] {
        let len = self.points.len();
        self.dverts
            .get_or_insert_with(|| vec![DeformVert::default(); len])
    }

    /// Replace both buffers at once
    pub fn set_points(
        &mut self,
        points: Vec<Point>,
        dverts: Option<Vec<DeformVert>>,
    ) -> Result<(), StrokeError> {
        check_deform_length(points.len(), dverts.as_ref().map(Vec::len))?;
        self.replace_buffers(points, dverts);
        Ok(())
    }

    /// Drop all points and weights
    pub fn clear(&mut self) {
        self.replace_buffers(Vec::new(), None);
        self.triangles.clear();
    }

    pub(crate) fn replace_buffers(&mut self, points: Vec<Point>, dverts: Option<Vec<DeformVert>>) {
        debug_assert!(
            dverts.as_ref().is_none_or(|dv| dv.len() == points.len()),
            "deform buffer out of sync with points"
        );
        self.points = points;
        self.dverts = dverts;
        self.dirty = true;
    }

    /// Keep only the points whose index passes `keep`, weights included
    pub(crate) fn retain_indices(&mut self, mut keep: impl FnMut(usize) -> bool) {
        let mut points = Vec::with_capacity(self.points.len());
        let mut dverts = self.dverts.as_ref().map(|dv| Vec::with_capacity(dv.len()));
        for (i, point) in self.points.iter().enumerate() {
            if keep(i) {
                points.push(*point);
                if let (Some(out), Some(src)) = (dverts.as_mut(), self.dverts.as_ref()) {
                    out.push(src[i].clone());
                }
            }
        }
        self.replace_buffers(points, dverts);
    }

    /// Derived bounds, valid after [`Stroke::geometry_update`]
    pub fn bound_box(&self) -> BoundBox {
        self.bound_box
    }

    /// Fill triangles, `None` while the cache is stale
    pub fn triangles(&self) -> Option<&[Triangle]> {
        if self.dirty {
            None
        } else {
            Some(&self.triangles)
        }
    }

    /// Fill triangles as a flat index buffer
    pub fn triangle_indices(&self) -> Option<&[u32]> {
        self.triangles().map(bytemuck::cast_slice)
    }

    /// True when points changed since the last geometry update
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_lerp() {
        let a = Point::new(Vec3::ZERO).with_pressure(0.0);
        let b = Point {
            position: Vec3::new(2.0, 0.0, 0.0),
            strength: 0.0,
            vertex_color: Vec4::ONE,
            selected: true,
            ..Default::default()
        };
        let mid = a.lerp(&b, 0.5);
        assert!((mid.position.x - 1.0).abs() < 1e-6);
        assert!((mid.pressure - 0.5).abs() < 1e-6);
        assert!((mid.strength - 0.5).abs() < 1e-6);
        assert!((mid.vertex_color.w - 0.5).abs() < 1e-6);
        assert!(!mid.selected);
    }

    #[test]
    fn test_deform_vert_lerp_union() {
        let a = DeformVert::new(vec![DeformWeight {
            group: 0,
            weight: 1.0,
        }]);
        let b = DeformVert::new(vec![DeformWeight {
            group: 3,
            weight: 1.0,
        }]);
        let mid = a.lerp(&b, 0.25);
        assert_eq!(mid.weights.len(), 2);
        assert!((mid.weight(0) - 0.75).abs() < 1e-6);
        assert!((mid.weight(3) - 0.25).abs() < 1e-6);
        assert_eq!(mid.weight(7), 0.0);
    }

    #[test]
    fn test_deform_vert_ensure() {
        let mut dv = DeformVert::default();
        dv.ensure(2).weight = 0.5;
        dv.ensure(2).weight += 0.25;
        assert_eq!(dv.weights.len(), 1);
        assert!((dv.weight(2) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_from_parts_rejects_mismatch() {
        let points = vec![Point::default(); 3];
        assert!(Stroke::from_parts(points.clone(), Some(vec![DeformVert::default(); 3])).is_ok());
        assert!(Stroke::from_parts(points, Some(vec![DeformVert::default(); 2])).is_err());
    }

    #[test]
    fn test_triangles_stale_until_update() {
        let mut stroke = Stroke::new(vec![
            Point::new(Vec3::ZERO),
            Point::new(Vec3::X),
            Point::new(Vec3::Y),
        ]);
        assert!(stroke.triangles().is_none());
        stroke.geometry_update();
        assert_eq!(stroke.triangles().map(<[Triangle]>::len), Some(1));
        assert_eq!(stroke.triangle_indices().map(<[u32]>::len), Some(3));

        stroke.points_mut()[0].position.z = 1.0;
        assert!(stroke.triangles().is_none());
    }

    #[test]
    fn test_duplicate_style_keeps_flags() {
        let mut stroke = Stroke::new(vec![Point::default(); 2]);
        stroke.cyclic = true;
        stroke.material_index = 4;
        stroke.end_cap = CapStyle::Flat;
        let copy = stroke.duplicate_style();
        assert!(copy.is_empty());
        assert!(copy.cyclic);
        assert_eq!(copy.material_index, 4);
        assert_eq!(copy.end_cap, CapStyle::Flat);
    }

    #[test]
    fn test_serde_skips_derived_data() {
        let mut stroke = Stroke::new(vec![
            Point::new(Vec3::ZERO),
            Point::new(Vec3::X),
            Point::new(Vec3::Y),
        ]);
        stroke.geometry_update();
        let json = serde_json::to_string(&stroke).unwrap();
        assert!(!json.contains("triangles"));
        let back: Stroke = serde_json::from_str(&json).unwrap();
        assert_eq!(back.points(), stroke.points());
        assert!(back.is_dirty());
    }

    #[test]
    fn test_bound_box() {
        let bounds = BoundBox::from_positions([Vec3::new(1.0, -1.0, 0.0), Vec3::new(-2.0, 3.0, 1.0)])
            .unwrap();
        assert_eq!(bounds.min, Vec3::new(-2.0, -1.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 1.0));
        assert!(BoundBox::from_positions(std::iter::empty()).is_none());
    }
}
