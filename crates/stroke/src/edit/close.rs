use tracing::trace;

use crate::constants::CLOSE_SEAM_FACTOR;
use crate::types::{DeformVert, DeformWeight, Stroke, lerp};

/// Close an open stroke into a loop
///
/// When the gap from the last point back to the first is no wider than the
/// average point spacing only the cyclic flag is set. Otherwise points are
/// added across the gap at roughly that spacing; the final one stops short
/// of the first point so the loop never has a zero-length closing edge.
/// Needs at least three points.
pub fn close(stroke: &mut Stroke) -> bool {
    let n = stroke.points.len();
    if n < 3 {
        return false;
    }

    let length = stroke.length(true);
    let average = length / (n - 1) as f32;
    let (first, last) = (stroke.points[0], stroke.points[n - 1]);
    let gap = last.position.distance(first.position);

    if gap <= average {
        stroke.cyclic = true;
        return true;
    }

    let added = ((gap / average).round() as usize).max(1);
    let select = stroke.selected;
    for i in 1..=added {
        let step = if added > 1 {
            let step = i as f32 / added as f32;
            if i == added { step * CLOSE_SEAM_FACTOR } else { step }
        } else {
            CLOSE_SEAM_FACTOR
        };

        let mut point = last.lerp(&first, step);
        point.selected = select;
        stroke.points.push(point);

        if let Some(dverts) = stroke.dverts.as_mut() {
            let from = dverts[n - 1].weight(0);
            let to = dverts[0].weight(0);
            dverts.push(DeformVert::new(vec![DeformWeight {
                group: 0,
                weight: lerp(from, to, step),
            }]));
        }
    }

    stroke.cyclic = true;
    trace!("close: added {} points across a gap of {}", added, gap);
    stroke.geometry_update();
    true
}
