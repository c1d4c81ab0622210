//! A partition line together with the points where the map geometry touches it.

use std::slice;

use crate::geom::{BBox, Coord, Point, Vector};
use super::DIST_EPSILON;

/// An infinite line through `origin`, running along `direction`.
///
/// Distances measured across the line are positive on the right-hand side,
/// which in Doom terms is the front.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HPlanePartition {
    pub origin: Point,
    pub direction: Vector,
}

/// Where a segment lies relative to a partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentSide {
    Front,
    Back,
    /// Endpoints on opposite sides; the segment has to be split.
    Crosses,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentClassification {
    pub side: SegmentSide,
    pub start_distance: Coord,
    pub end_distance: Coord,
}

impl SegmentClassification {
    pub fn start_on_line(&self) -> bool {
        self.start_distance.abs() < DIST_EPSILON
    }

    pub fn end_on_line(&self) -> bool {
        self.end_distance.abs() < DIST_EPSILON
    }
}

impl HPlanePartition {
    pub fn new(origin: Point, direction: Vector) -> Self {
        HPlanePartition { origin, direction }
    }

    pub fn length(&self) -> Coord {
        self.direction.length()
    }

    /// Signed distance from the line; positive on the front (right) side.
    pub fn perp_distance(&self, point: Point) -> Coord {
        (point - self.origin).cross(self.direction) / self.length()
    }

    /// Distance along the line from the origin to the projection of `point`.
    pub fn parallel_distance(&self, point: Point) -> Coord {
        (point - self.origin).dot(self.direction) / self.length()
    }

    pub fn is_front(&self, point: Point) -> bool {
        self.perp_distance(point) >= 0.0
    }

    pub fn classify_segment(&self, start: Point, end: Point) -> SegmentClassification {
        let start_distance = self.perp_distance(start);
        let end_distance = self.perp_distance(end);
        let start_on = start_distance.abs() < DIST_EPSILON;
        let end_on = end_distance.abs() < DIST_EPSILON;

        let side = if start_on && end_on {
            // Collinear: goes with the side it faces
            if (end - start).dot(self.direction) > 0.0 { SegmentSide::Front } else { SegmentSide::Back }
        }
        else if start_distance > -DIST_EPSILON && end_distance > -DIST_EPSILON {
            SegmentSide::Front
        }
        else if start_distance < DIST_EPSILON && end_distance < DIST_EPSILON {
            SegmentSide::Back
        }
        else {
            SegmentSide::Crosses
        };

        SegmentClassification { side, start_distance, end_distance }
    }

    /// Point where the segment `start -> end` crosses the line.  When the
    /// partition is axis-aligned the result is snapped exactly onto it.
    pub fn intersection(&self, start: Point, end: Point) -> Point {
        let a = self.perp_distance(start);
        let b = self.perp_distance(end);
        let t = a / (a - b);
        let mut point = start + (end - start) * t;
        if self.direction.x == 0.0 {
            point.x = self.origin.x;
        }
        if self.direction.y == 0.0 {
            point.y = self.origin.y;
        }
        point
    }

    /// Which side of the line a box lies on, `Crosses` if it straddles or
    /// touches the line.
    pub fn box_side(&self, bbox: &BBox) -> SegmentSide {
        let corners = [
            bbox.min,
            Point::new(bbox.max.x, bbox.min.y),
            bbox.max,
            Point::new(bbox.min.x, bbox.max.y),
        ];
        let mut min = Coord::INFINITY;
        let mut max = Coord::NEG_INFINITY;
        for &corner in corners.iter() {
            let distance = self.perp_distance(corner);
            min = min.min(distance);
            max = max.max(distance);
        }

        if min >= DIST_EPSILON {
            SegmentSide::Front
        }
        else if max <= -DIST_EPSILON {
            SegmentSide::Back
        }
        else {
            SegmentSide::Crosses
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HPlaneIntercept<T> {
    distance: Coord,
    user_data: T,
}

impl<T> HPlaneIntercept<T> {
    /// Signed distance along the partition from its origin.
    pub fn distance(&self) -> Coord {
        self.distance
    }

    pub fn user_data(&self) -> &T {
        &self.user_data
    }

    pub fn user_data_mut(&mut self) -> &mut T {
        &mut self.user_data
    }

    pub fn into_user_data(self) -> T {
        self.user_data
    }
}

/// A partition line plus an ordered list of intercepts along it.
///
/// Changing the partition does not touch the intercepts; callers clear them
/// when they move on to a new line.
#[derive(Debug)]
pub struct HPlane<T> {
    partition: HPlanePartition,
    intercepts: Vec<HPlaneIntercept<T>>,
}

impl<T> HPlane<T> {
    pub fn new(partition: HPlanePartition) -> Self {
        HPlane {
            partition,
            intercepts: Vec::new(),
        }
    }

    pub fn partition(&self) -> &HPlanePartition {
        &self.partition
    }

    pub fn origin(&self) -> Point {
        self.partition.origin
    }

    pub fn x(&self) -> Coord {
        self.partition.origin.x
    }

    pub fn y(&self) -> Coord {
        self.partition.origin.y
    }

    pub fn direction(&self) -> Vector {
        self.partition.direction
    }

    pub fn dx(&self) -> Coord {
        self.partition.direction.x
    }

    pub fn dy(&self) -> Coord {
        self.partition.direction.y
    }

    pub fn set_origin(&mut self, origin: Point) -> &mut Self {
        self.partition.origin = origin;
        self
    }

    pub fn set_x(&mut self, x: Coord) -> &mut Self {
        self.partition.origin.x = x;
        self
    }

    pub fn set_y(&mut self, y: Coord) -> &mut Self {
        self.partition.origin.y = y;
        self
    }

    pub fn set_direction(&mut self, direction: Vector) -> &mut Self {
        self.partition.direction = direction;
        self
    }

    pub fn set_dx(&mut self, dx: Coord) -> &mut Self {
        self.partition.direction.x = dx;
        self
    }

    pub fn set_dy(&mut self, dy: Coord) -> &mut Self {
        self.partition.direction.y = dy;
        self
    }

    /// Records an intercept, keeping the list sorted by distance.  Intercepts
    /// at an equal distance keep their insertion order.
    pub fn new_intercept(&mut self, distance: Coord, user_data: T) -> &mut HPlaneIntercept<T> {
        let index = self.intercepts.partition_point(|intercept| intercept.distance <= distance);
        self.intercepts.insert(index, HPlaneIntercept { distance, user_data });
        &mut self.intercepts[index]
    }

    /// Removes the intercept at `index` and returns it.  The intercept that
    /// followed it now sits at `index`.
    pub fn delete_intercept(&mut self, index: usize) -> HPlaneIntercept<T> {
        self.intercepts.remove(index)
    }

    /// Drops every intercept.  The partition itself is kept.
    pub fn clear(&mut self) {
        self.intercepts.clear();
    }

    pub fn intercepts(&self) -> &[HPlaneIntercept<T>] {
        &self.intercepts
    }

    pub fn intercept_mut(&mut self, index: usize) -> &mut HPlaneIntercept<T> {
        &mut self.intercepts[index]
    }

    pub fn iter(&self) -> slice::Iter<HPlaneIntercept<T>> {
        self.intercepts.iter()
    }

    pub fn len(&self) -> usize {
        self.intercepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intercepts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal() -> HPlane<&'static str> {
        HPlane::new(HPlanePartition::new(Point::new(0.0, 0.0), Vector::new(1.0, 0.0)))
    }

    fn distances<T>(hplane: &HPlane<T>) -> Vec<Coord> {
        hplane.iter().map(|intercept| intercept.distance()).collect()
    }

    #[test]
    fn intercepts_are_sorted() {
        let mut hplane = horizontal();
        hplane.new_intercept(5.0, "five");
        hplane.new_intercept(-2.0, "minus two");
        hplane.new_intercept(3.0, "three");
        assert_eq!(distances(&hplane), vec![-2.0, 3.0, 5.0]);
        assert_eq!(*hplane.intercepts()[1].user_data(), "three");
    }

    #[test]
    fn equal_distances_keep_insertion_order() {
        let mut hplane = horizontal();
        hplane.new_intercept(1.0, "a");
        hplane.new_intercept(1.0, "b");
        hplane.new_intercept(0.0, "c");
        hplane.new_intercept(1.0, "d");
        let order: Vec<_> = hplane.iter().map(|intercept| *intercept.user_data()).collect();
        assert_eq!(order, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn scrambled_insertions_stay_sorted() {
        let mut hplane = HPlane::new(HPlanePartition::new(Point::new(0.0, 0.0), Vector::new(0.0, 1.0)));
        // deterministic scramble of distances, with repeats and negatives
        let mut state: u32 = 4242;
        for i in 0..300u32 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let distance = f64::from((state >> 8) % 512) - 256.0;
            hplane.new_intercept(distance / 4.0, i);
        }
        assert_eq!(hplane.len(), 300);
        for pair in hplane.intercepts().windows(2) {
            assert!(pair[0].distance() <= pair[1].distance(), "{} came before {}", pair[0].distance(), pair[1].distance());
            if pair[0].distance() == pair[1].distance() {
                assert!(pair[0].user_data() < pair[1].user_data());
            }
        }
    }

    #[test]
    fn delete_hands_back_payload() {
        let mut hplane = horizontal();
        hplane.new_intercept(1.0, "one");
        hplane.new_intercept(2.0, "two");
        hplane.new_intercept(3.0, "three");
        let removed = hplane.delete_intercept(1);
        assert_eq!(removed.distance(), 2.0);
        assert_eq!(removed.into_user_data(), "two");
        assert_eq!(*hplane.intercepts()[1].user_data(), "three");
        assert_eq!(hplane.len(), 2);
    }

    #[test]
    fn clear_keeps_partition() {
        let mut hplane = horizontal();
        hplane.set_origin(Point::new(4.0, 5.0)).set_dy(2.0);
        hplane.new_intercept(1.0, "x");
        hplane.clear();
        assert!(hplane.is_empty());
        hplane.clear();
        assert!(hplane.is_empty());
        assert_eq!(hplane.origin(), Point::new(4.0, 5.0));
        assert_eq!(hplane.direction(), Vector::new(1.0, 2.0));
    }

    #[test]
    fn moving_the_partition_keeps_intercepts() {
        let mut hplane = horizontal();
        hplane.new_intercept(1.0, "x");
        hplane.set_x(10.0).set_y(-3.0).set_dx(0.0).set_dy(1.0);
        assert_eq!(hplane.len(), 1);
        assert_eq!((hplane.x(), hplane.y(), hplane.dx(), hplane.dy()), (10.0, -3.0, 0.0, 1.0));
        hplane.set_direction(Vector::new(-1.0, 0.0));
        assert_eq!(hplane.len(), 1);
    }

    #[test]
    fn sides_follow_doom_convention() {
        // Line running north along x = 0: the front is to the east.
        let partition = HPlanePartition::new(Point::new(0.0, 0.0), Vector::new(0.0, 64.0));
        assert_eq!(partition.perp_distance(Point::new(16.0, 5.0)), 16.0);
        assert_eq!(partition.perp_distance(Point::new(-8.0, 5.0)), -8.0);
        assert_eq!(partition.parallel_distance(Point::new(-8.0, 5.0)), 5.0);

        let front = partition.classify_segment(Point::new(8.0, 0.0), Point::new(8.0, 10.0));
        assert_eq!(front.side, SegmentSide::Front);
        let touching = partition.classify_segment(Point::new(0.0, 0.0), Point::new(-8.0, 10.0));
        assert_eq!(touching.side, SegmentSide::Back);
        assert!(touching.start_on_line());
        assert!(!touching.end_on_line());
        let along = partition.classify_segment(Point::new(0.0, 10.0), Point::new(0.0, 0.0));
        assert_eq!(along.side, SegmentSide::Back);

        let crossing = partition.classify_segment(Point::new(-8.0, 3.0), Point::new(8.0, 7.0));
        assert_eq!(crossing.side, SegmentSide::Crosses);
        assert_eq!(partition.intersection(Point::new(-8.0, 3.0), Point::new(8.0, 7.0)), Point::new(0.0, 5.0));
    }

    #[test]
    fn boxes() {
        let partition = HPlanePartition::new(Point::new(0.0, 0.0), Vector::new(1.0, 0.0));
        let below = BBox::new(Point::new(-5.0, -10.0), Point::new(5.0, -1.0));
        let above = BBox::new(Point::new(-5.0, 1.0), Point::new(5.0, 10.0));
        let straddling = BBox::new(Point::new(-5.0, -1.0), Point::new(5.0, 1.0));
        // eastward line: the front is to the south
        assert_eq!(partition.box_side(&below), SegmentSide::Front);
        assert_eq!(partition.box_side(&above), SegmentSide::Back);
        assert_eq!(partition.box_side(&straddling), SegmentSide::Crosses);
    }
}
