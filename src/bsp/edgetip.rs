//! Per-vertex fans of edge tips.
//!
//! Every half-edge leaving or entering a vertex leaves a "tip" there, recording
//! the direction the edge runs away from the vertex and the half-edges lying on
//! either side of it.  Sorted by angle, the tips describe which sector occupies
//! each wedge of space around the vertex.

use std::slice;

/// Angles closer than this (in degrees) are treated as the same direction.
pub const ANG_EPSILON: f64 = 1.0 / 1024.0;

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeTip<S> {
    angle: f64,
    front: Option<S>,
    back: Option<S>,
}

impl<S: Copy + PartialEq> EdgeTip<S> {
    pub fn new(angle: f64, front: Option<S>, back: Option<S>) -> Self {
        EdgeTip { angle, front, back }
    }

    /// Direction of the edge away from the vertex, in degrees within `[0, 360)`.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: f64) -> &mut Self {
        self.angle = angle;
        self
    }

    pub fn has_front(&self) -> bool {
        self.front.is_some()
    }

    pub fn has_back(&self) -> bool {
        self.back.is_some()
    }

    /// The half-edge on the increasing-angle side of the tip.  Panics if there
    /// is none; check with `has_front` first.
    pub fn front(&self) -> S {
        match self.front {
            Some(seg) => seg,
            None => panic!("edge tip at {} degrees has no front half-edge", self.angle),
        }
    }

    /// The half-edge on the decreasing-angle side of the tip.  Panics if there
    /// is none; check with `has_back` first.
    pub fn back(&self) -> S {
        match self.back {
            Some(seg) => seg,
            None => panic!("edge tip at {} degrees has no back half-edge", self.angle),
        }
    }

    pub fn front_opt(&self) -> Option<S> {
        self.front
    }

    pub fn back_opt(&self) -> Option<S> {
        self.back
    }

    pub fn set_front(&mut self, front: Option<S>) -> &mut Self {
        self.front = front;
        self
    }

    pub fn set_back(&mut self, back: Option<S>) -> &mut Self {
        self.back = back;
        self
    }

    pub fn references(&self, seg: S) -> bool {
        self.front == Some(seg) || self.back == Some(seg)
    }
}

/// The tips around one vertex, kept sorted by ascending angle.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeTips<S> {
    tips: Vec<EdgeTip<S>>,
}

impl<S> Default for EdgeTips<S> {
    fn default() -> Self {
        EdgeTips { tips: Vec::new() }
    }
}

impl<S: Copy + PartialEq> EdgeTips<S> {
    pub fn new() -> Self {
        EdgeTips::default()
    }

    /// Inserts a tip, keeping the list sorted.  Tips within `epsilon` of an
    /// existing angle are placed after it; nothing is merged.
    pub fn add(&mut self, angle: f64, front: Option<S>, back: Option<S>, epsilon: f64) -> &mut EdgeTip<S> {
        let mut index = self.tips.len();
        while index > 0 && self.tips[index - 1].angle > angle + epsilon {
            index -= 1;
        }
        self.tips.insert(index, EdgeTip::new(angle, front, back));
        &mut self.tips[index]
    }

    /// Removes every tip that refers to `seg` on either side.
    pub fn clear_by_line_segment(&mut self, seg: S) {
        self.tips.retain(|tip| !tip.references(seg));
    }

    pub fn clear(&mut self) {
        self.tips.clear();
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<EdgeTip<S>> {
        self.tips.iter()
    }

    /// Finds the half-edge bounding the open space in direction `angle`.
    ///
    /// Returns `None` when the direction runs along one of the tips (there is
    /// an edge there, not open space) or when no tip borders the wedge on that
    /// side.  Otherwise the wedge containing `angle` lies between two tips and
    /// the half-edge facing into it is returned.
    pub fn open_at(&self, angle: f64, epsilon: f64) -> Option<S> {
        for tip in self.tips.iter() {
            let diff = (tip.angle - angle).abs();
            if diff < epsilon || diff > 360.0 - epsilon {
                return None;
            }
        }

        match self.tips.iter().find(|tip| tip.angle > angle + epsilon) {
            Some(tip) => tip.back,
            None => self.tips.last().and_then(|tip| tip.front),
        }
    }
}

impl<'a, S> IntoIterator for &'a EdgeTips<S> {
    type Item = &'a EdgeTip<S>;
    type IntoIter = slice::Iter<'a, EdgeTip<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tips.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angles(tips: &EdgeTips<u32>) -> Vec<f64> {
        tips.iter().map(|tip| tip.angle()).collect()
    }

    #[test]
    fn insertion_keeps_angles_sorted() {
        let mut tips = EdgeTips::new();
        tips.add(350.0, Some(1), None, ANG_EPSILON);
        tips.add(10.0, Some(2), None, ANG_EPSILON);
        tips.add(180.0, Some(3), None, ANG_EPSILON);
        assert_eq!(angles(&tips), vec![10.0, 180.0, 350.0]);
    }

    #[test]
    fn many_insertions_stay_sorted() {
        let mut tips = EdgeTips::new();
        // deterministic scramble of angles, including duplicates
        let mut state: u32 = 12345;
        for i in 0..200 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let angle = (state >> 8) as f64 % 360.0;
            tips.add(angle, Some(i), None, ANG_EPSILON);
        }
        let sorted = angles(&tips);
        assert_eq!(sorted.len(), 200);
        for pair in sorted.windows(2) {
            assert!(pair[0] <= pair[1] + ANG_EPSILON, "{} came before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn near_equal_tips_are_kept() {
        let mut tips = EdgeTips::new();
        tips.add(90.0, Some(1), None, ANG_EPSILON);
        tips.add(90.0 + ANG_EPSILON / 2.0, Some(2), None, ANG_EPSILON);
        tips.add(90.0, Some(3), None, ANG_EPSILON);
        assert_eq!(tips.len(), 3);
        assert_eq!(tips.iter().map(|tip| tip.front()).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn clearing_by_segment_removes_every_reference() {
        let mut tips = EdgeTips::new();
        tips.add(0.0, Some(7), Some(8), ANG_EPSILON);
        tips.add(90.0, Some(9), Some(7), ANG_EPSILON);
        tips.add(180.0, Some(10), None, ANG_EPSILON);
        tips.add(270.0, None, Some(7), ANG_EPSILON);

        tips.clear_by_line_segment(7);
        assert_eq!(angles(&tips), vec![180.0]);
        assert!(tips.iter().all(|tip| !tip.references(7)));

        tips.clear_by_line_segment(42);
        assert_eq!(tips.len(), 1);
    }

    #[test]
    fn accessors() {
        let mut tip = EdgeTip::new(45.0, Some(1u32), None);
        assert!(tip.has_front());
        assert!(!tip.has_back());
        assert_eq!(tip.front(), 1);
        tip.set_back(Some(2)).set_angle(50.0);
        assert_eq!(tip.back(), 2);
        assert_eq!(tip.angle(), 50.0);
    }

    #[test]
    #[should_panic]
    fn missing_front_is_a_contract_violation() {
        let tip: EdgeTip<u32> = EdgeTip::new(0.0, None, Some(1));
        tip.front();
    }

    #[test]
    fn open_space_lookup() {
        // A vertex with edges leaving east (0) and north (90).  Between them
        // lies half-edge 1, everywhere else half-edge 2.
        let mut tips = EdgeTips::new();
        tips.add(0.0, Some(1), Some(2), ANG_EPSILON);
        tips.add(90.0, Some(2), Some(1), ANG_EPSILON);

        assert_eq!(tips.open_at(45.0, ANG_EPSILON), Some(1));
        assert_eq!(tips.open_at(180.0, ANG_EPSILON), Some(2));
        assert_eq!(tips.open_at(300.0, ANG_EPSILON), Some(2));
        // along an edge there is no open space
        assert_eq!(tips.open_at(90.0, ANG_EPSILON), None);
        assert_eq!(tips.open_at(360.0 - ANG_EPSILON / 4.0, ANG_EPSILON), None);

        assert_eq!(EdgeTips::<u32>::new().open_at(10.0, ANG_EPSILON), None);
    }
}
