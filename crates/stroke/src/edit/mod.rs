//! In-place stroke editing
//!
//! Operations that cut, extend, close, merge or reorder a stroke's points.
//! Each one rebuilds the derived geometry of the strokes it changes.

mod close;
mod dissolve;
mod join;
mod stretch;
mod trim;

pub use close::*;
pub use dissolve::*;
pub use join::*;
pub use stretch::*;
pub use trim::*;

use tracing::debug;

use crate::types::Stroke;

/// Reverse the point order, weights included
pub fn flip(stroke: &mut Stroke) {
    stroke.points.reverse();
    if let Some(dverts) = stroke.dverts.as_mut() {
        dverts.reverse();
    }
    stroke.dirty = true;
}

/// Make point `index` of a cyclic stroke its first point
///
/// The loop itself is unchanged, only where it starts. Returns false for
/// open strokes and for indices outside `1..len`.
pub fn start_set(stroke: &mut Stroke, index: usize) -> bool {
    if !stroke.cyclic || index == 0 || index >= stroke.points.len() {
        debug!("start_set: ignored index {} on {} points", index, stroke.points.len());
        return false;
    }
    stroke.points.rotate_left(index);
    if let Some(dverts) = stroke.dverts.as_mut() {
        dverts.rotate_left(index);
    }
    stroke.geometry_update();
    true
}
