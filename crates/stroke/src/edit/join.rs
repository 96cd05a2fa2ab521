use stroke_config::JoinConfig;
use tracing::trace;

use super::flip;
use crate::constants::JOIN_SEAM_SAMPLES;
use crate::smooth::smoothed_position;
use crate::types::{DeformVert, Point, Stroke};

/// Which of the two strokes to reverse so the closest pair of end points
/// meets at the seam
fn closest_orientation(a: &Stroke, b: &Stroke) -> (bool, bool) {
    let (start_a, end_a) = (a.points[0].position, a.points[a.points.len() - 1].position);
    let (start_b, end_b) = (b.points[0].position, b.points[b.points.len() - 1].position);

    let candidates = [
        (end_a.distance_squared(start_b), (false, false)),
        (end_a.distance_squared(end_b), (false, true)),
        (start_a.distance_squared(start_b), (true, false)),
        (start_a.distance_squared(end_b), (true, true)),
    ];
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.0 < best.0 {
            best = *candidate;
        }
    }
    best.1
}

/// Append `b` to the end of `a`
///
/// See [`JoinConfig`] for the options: orienting both strokes so the
/// closest ends meet, leaving an invisible gap between them, scaling `b`'s
/// pressure to `a`'s thickness and smoothing the seam. Returns false when
/// either stroke is empty.
pub fn join(a: &mut Stroke, mut b: Stroke, config: &JoinConfig) -> bool {
    if a.points.is_empty() || b.points.is_empty() {
        return false;
    }

    if config.auto_flip {
        let (flip_a, flip_b) = closest_orientation(a, &b);
        if flip_a {
            flip(a);
        }
        if flip_b {
            flip(&mut b);
        }
    }

    if a.dverts.is_none() && b.dverts.is_some() {
        a.ensure_dverts();
    }

    if config.leave_gaps {
        let hidden = |point: &Point| Point {
            pressure: 0.0,
            strength: 0.0,
            ..*point
        };
        let (tail, head) = (hidden(&a.points[a.points.len() - 1]), hidden(&b.points[0]));
        a.points.push(tail);
        a.points.push(head);
        if let Some(dverts) = a.dverts.as_mut() {
            dverts.push(DeformVert::default());
            dverts.push(DeformVert::default());
        }
    }

    let ratio = if config.fit_thickness && a.thickness > 0.0 {
        b.thickness / a.thickness
    } else {
        1.0
    };
    let seam = a.points.len();
    a.points.extend(b.points.iter().map(|p| p.with_pressure(p.pressure * ratio)));
    if let Some(dverts) = a.dverts.as_mut() {
        match b.dverts.take() {
            Some(from_b) => dverts.extend(from_b),
            None => dverts.resize(a.points.len(), DeformVert::default()),
        }
    }
    a.dirty = true;

    if config.smooth {
        smooth_seam(a, seam);
    }

    trace!("join: {} points after joining at {}", a.points.len(), seam);
    a.geometry_update();
    true
}

/// Blend pressure and position across the points around `seam`, with the
/// blend rising toward the seam and falling after it
fn smooth_seam(stroke: &mut Stroke, seam: usize) {
    let n = stroke.points.len();
    let start = seam.saturating_sub(JOIN_SEAM_SAMPLES);
    let end = (n - 1).min(start + JOIN_SEAM_SAMPLES * 2);
    let len = end - start;
    if len == 0 {
        return;
    }

    let mut step = 1.0 / ((len / 2) as f32 + 1.0);
    let average = stroke.points[start..end].iter().map(|p| p.pressure).sum::<f32>() / len as f32;

    let mut ratio = step;
    for i in start..end {
        let pressure = stroke.points[i].pressure;
        stroke.points[i].pressure += (average - pressure) * ratio;
        // Reads neighbours this loop already moved
        if let Some(position) = smoothed_position(stroke, i, ratio * 0.6, 2, false, true) {
            stroke.points[i].position = position;
        }
        ratio += step;
        if ratio > 1.0 {
            ratio -= step + step;
            step = -step;
        }
    }
}
