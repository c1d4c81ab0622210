use euclid::{Box2D, Point2D, Size2D, Vector2D};

/// Unit tag for map coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MapSpace;

pub type Coord = f64;
pub type Point = Point2D<Coord, MapSpace>;
pub type Vector = Vector2D<Coord, MapSpace>;
pub type BBox = Box2D<Coord, MapSpace>;
pub type Size = Size2D<Coord, MapSpace>;

/// Inclusive box predicates.  euclid's own `contains` and `intersects` treat
/// the max edges as exclusive, which is wrong for map geometry, where a line
/// lying exactly on a box edge still touches the box.
pub trait BBoxExt {
    fn touches(&self, other: &Self) -> bool;
    fn contains_point(&self, point: Point) -> bool;
    fn contains_box(&self, other: &Self) -> bool;
}

impl BBoxExt for BBox {
    fn touches(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x && other.min.x <= self.max.x &&
            self.min.y <= other.max.y && other.min.y <= self.max.y
    }

    fn contains_point(&self, point: Point) -> bool {
        self.min.x <= point.x && point.x <= self.max.x &&
            self.min.y <= point.y && point.y <= self.max.y
    }

    fn contains_box(&self, other: &BBox) -> bool {
        self.min.x <= other.min.x && other.max.x <= self.max.x &&
            self.min.y <= other.min.y && other.max.y <= self.max.y
    }
}

/// Bounding box of a set of points, or `None` if there are none.
pub fn bbox_of_points<I>(points: I) -> Option<BBox>
where
    I: IntoIterator<Item = Point>,
{
    let mut points = points.into_iter();
    let first = points.next()?;
    let mut bbox = BBox::new(first, first);
    for point in points {
        bbox.min = bbox.min.min(point);
        bbox.max = bbox.max.max(point);
    }
    Some(bbox)
}

/// Direction of a vector in degrees, in `[0, 360)`, with 0 pointing east and 90
/// pointing north.
pub fn direction_angle(vector: Vector) -> f64 {
    let angle = vector.y.atan2(vector.x).to_degrees();
    if angle < 0.0 {
        angle + 360.0
    }
    else if angle >= 360.0 {
        angle - 360.0
    }
    else {
        angle
    }
}
