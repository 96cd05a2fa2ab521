//! Stroke owners
//!
//! A frame owns an ordered list of strokes; a layer owns frames keyed by
//! frame number. These carry only what the stroke operations need from
//! their owner: adding, removing and replacing strokes in place.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::edit;
use crate::tags::PointTags;
use crate::types::{BoundBox, Stroke};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    pub number: i32,
    /// Drawing order, first stroke at the back
    pub strokes: Vec<Stroke>,
    pub selected: bool,
}

impl Frame {
    pub fn new(number: i32) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    /// Add a stroke on top, returns its index
    pub fn append_stroke(&mut self, stroke: Stroke) -> usize {
        self.strokes.push(stroke);
        self.strokes.len() - 1
    }

    pub fn remove_stroke(&mut self, index: usize) -> Option<Stroke> {
        (index < self.strokes.len()).then(|| self.strokes.remove(index))
    }

    /// Dissolve the tagged points of stroke `index`, unlinking the stroke
    /// when nothing is left. Returns true while the stroke still exists.
    pub fn dissolve_points(&mut self, index: usize, tags: &PointTags) -> bool {
        let Some(stroke) = self.strokes.get_mut(index) else {
            return false;
        };
        if edit::dissolve_tagged(stroke, tags) {
            return true;
        }
        debug!("dissolve_points: stroke {} emptied, removing", index);
        self.strokes.remove(index);
        false
    }

    /// Split stroke `index` at `before`, placing the second piece directly
    /// above the first
    pub fn split_stroke(&mut self, index: usize, before: usize) -> bool {
        let Some(stroke) = self.strokes.get_mut(index) else {
            return false;
        };
        match edit::split(stroke, before) {
            Some(tail) => {
                self.strokes.insert(index + 1, tail);
                true
            }
            None => false,
        }
    }

    /// Merge close points of stroke `index`, see [`edit::merge_by_distance`]
    pub fn merge_distance(&mut self, index: usize, threshold: f32, use_unselected: bool) -> bool {
        match self.strokes.get_mut(index) {
            Some(stroke) => edit::merge_by_distance(stroke, threshold, use_unselected),
            None => false,
        }
    }

    /// Replace stroke `index` by the pieces left after deleting its tagged
    /// points, in order and at the same depth. Returns the piece count.
    pub fn delete_tagged_points(
        &mut self,
        index: usize,
        tags: &PointTags,
        select: bool,
        flat_cap: bool,
        limit: usize,
    ) -> usize {
        let Some(stroke) = self.strokes.get(index) else {
            return 0;
        };
        let pieces = edit::delete_tagged_points(stroke, tags, select, flat_cap, limit);
        let count = pieces.len();
        self.strokes.splice(index..=index, pieces);
        trace!("delete_tagged_points: stroke {} replaced by {}", index, count);
        count
    }

    /// Bounds over every stroke, or over selected points only
    pub fn minmax(&self, select_only: bool) -> Option<BoundBox> {
        self.strokes
            .iter()
            .filter_map(|stroke| stroke.minmax(select_only))
            .reduce(|a, b| a.union(&b))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layer {
    /// Sorted by frame number
    pub frames: Vec<Frame>,
    pub active_frame: Option<usize>,
}

impl Layer {
    /// Frame with `number`, created if missing, made active
    pub fn get_or_create_frame(&mut self, number: i32) -> &mut Frame {
        let index = match self.frames.binary_search_by_key(&number, |frame| frame.number) {
            Ok(index) => index,
            Err(index) => {
                trace!("get_or_create_frame: new frame {}", number);
                self.frames.insert(index, Frame::new(number));
                index
            }
        };
        self.active_frame = Some(index);
        &mut self.frames[index]
    }

    pub fn active_frame_mut(&mut self) -> Option<&mut Frame> {
        self.active_frame.and_then(|index| self.frames.get_mut(index))
    }

    /// Copy stroke `stroke` of frame `frame` into every other selected
    /// frame, at the back of the drawing order when `at_head` is set and on
    /// top otherwise. Returns how many copies were made.
    pub fn copy_stroke_to_selected_frames(&mut self, frame: usize, stroke: usize, at_head: bool) -> usize {
        let Some(source) = self.frames.get(frame).and_then(|f| f.strokes.get(stroke)).cloned() else {
            return 0;
        };

        let mut copies = 0;
        for (index, target) in self.frames.iter_mut().enumerate() {
            if index == frame || !target.selected {
                continue;
            }
            let mut copy = source.clone();
            copy.geometry_update();
            if at_head {
                target.strokes.insert(0, copy);
            } else {
                target.strokes.push(copy);
            }
            copies += 1;
        }
        copies
    }

    /// Center of the active frame's bounds
    pub fn centroid(&self) -> Option<Vec3> {
        let frame = self.frames.get(self.active_frame?)?;
        frame.minmax(false).map(|bounds| bounds.center())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn line(n: usize, y: f32) -> Stroke {
        let mut stroke = Stroke::new((0..n).map(|i| Point::new(Vec3::new(i as f32, y, 0.0))).collect());
        stroke.geometry_update();
        stroke
    }

    #[test]
    fn test_append_and_remove() {
        let mut frame = Frame::new(1);
        assert_eq!(frame.append_stroke(line(2, 0.0)), 0);
        assert_eq!(frame.append_stroke(line(3, 0.0)), 1);
        assert_eq!(frame.remove_stroke(0).map(|s| s.len()), Some(2));
        assert!(frame.remove_stroke(5).is_none());
        assert_eq!(frame.strokes.len(), 1);
    }

    #[test]
    fn test_dissolve_unlinks_empty_stroke() {
        let mut frame = Frame::new(1);
        frame.append_stroke(line(3, 0.0));
        frame.append_stroke(line(4, 1.0));
        assert!(frame.dissolve_points(1, &PointTags::from_fn(4, |i| i == 0)));
        assert_eq!(frame.strokes[1].len(), 3);
        assert!(!frame.dissolve_points(0, &PointTags::from_fn(3, |_| true)));
        assert_eq!(frame.strokes.len(), 1);
        assert_eq!(frame.strokes[0].points()[0].position.y, 1.0);
    }

    #[test]
    fn test_split_inserts_after() {
        let mut frame = Frame::new(1);
        frame.append_stroke(line(5, 0.0));
        frame.append_stroke(line(2, 1.0));
        assert!(frame.split_stroke(0, 2));
        let lengths: Vec<usize> = frame.strokes.iter().map(Stroke::len).collect();
        assert_eq!(lengths, vec![3, 3, 2]);
        assert!(!frame.split_stroke(0, 0));
    }

    #[test]
    fn test_delete_tagged_replaces_in_place() {
        let mut frame = Frame::new(1);
        frame.append_stroke(line(2, -1.0));
        frame.append_stroke(line(7, 0.0));
        frame.append_stroke(line(2, 1.0));
        let count = frame.delete_tagged_points(1, &PointTags::from_fn(7, |i| i == 3), false, false, 0);
        assert_eq!(count, 2);
        let ys: Vec<f32> = frame.strokes.iter().map(|s| s.points()[0].position.y).collect();
        assert_eq!(ys, vec![-1.0, 0.0, 0.0, 1.0]);
        assert_eq!(frame.strokes[2].points()[0].position.x, 4.0);
    }

    #[test]
    fn test_merge_distance() {
        let mut frame = Frame::new(1);
        frame.append_stroke(Stroke::new(
            [0.0, 0.01, 0.5, 1.0].iter().map(|&x| Point::new(Vec3::new(x, 0.0, 0.0))).collect(),
        ));
        assert!(frame.merge_distance(0, 0.1, true));
        assert_eq!(frame.strokes[0].len(), 3);
        assert!(!frame.merge_distance(0, 0.1, true));
        assert!(!frame.merge_distance(4, 0.1, true));
    }

    #[test]
    fn test_minmax_and_centroid() {
        let mut layer = Layer::default();
        let frame = layer.get_or_create_frame(3);
        frame.append_stroke(line(3, 0.0));
        frame.append_stroke(line(2, 4.0));
        let bounds = frame.minmax(false).unwrap();
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::new(2.0, 4.0, 0.0));
        assert_eq!(layer.centroid(), Some(Vec3::new(1.0, 2.0, 0.0)));
        assert!(Frame::new(0).minmax(false).is_none());
    }

    #[test]
    fn test_get_or_create_keeps_order() {
        let mut layer = Layer::default();
        layer.get_or_create_frame(10);
        layer.get_or_create_frame(2);
        layer.get_or_create_frame(5).append_stroke(line(2, 0.0));
        let numbers: Vec<i32> = layer.frames.iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![2, 5, 10]);
        assert_eq!(layer.active_frame, Some(1));

        layer.get_or_create_frame(5);
        assert_eq!(layer.frames.len(), 3);
        assert_eq!(layer.active_frame_mut().map(|f| f.strokes.len()), Some(1));
    }

    #[test]
    fn test_copy_to_selected_frames() {
        let mut layer = Layer::default();
        for number in 1..=4 {
            let frame = layer.get_or_create_frame(number);
            frame.selected = number != 3;
            frame.append_stroke(line(2, number as f32));
        }
        let copies = layer.copy_stroke_to_selected_frames(0, 0, false);
        assert_eq!(copies, 2);
        assert_eq!(layer.frames[0].strokes.len(), 1);
        assert_eq!(layer.frames[2].strokes.len(), 1);
        assert_eq!(layer.frames[1].strokes[1].points()[0].position.y, 1.0);

        assert_eq!(layer.copy_stroke_to_selected_frames(0, 0, true), 2);
        assert_eq!(layer.frames[3].strokes[0].points()[0].position.y, 1.0);
        assert_eq!(layer.copy_stroke_to_selected_frames(9, 0, true), 0);
    }
}
