use std::ops::Index;

use super::{AABB, WorldPoint};

#[derive(Clone, Debug, PartialEq)]
pub struct Triangle<Point>([Point; 3]);

impl<Point> Triangle<Point> {
    pub fn new(a: Point, b: Point, c: Point) -> Triangle<Point> {
        Triangle([a, b, c])
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a Point> {
        self.0.iter()
    }

    pub fn map<Point2, F: FnMut(&Point) -> Point2>(&self, mut f: F) -> Triangle<Point2> {
        Triangle([f(&self[0]), f(&self[1]), f(&self[2])])
    }
}

impl<Point> Index<usize> for Triangle<Point> {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl Triangle<WorldPoint> {
    pub fn bounding_box(&self) -> AABB {
        let mut bound = AABB::empty();
        for vertex in self.iter() {
            bound.grow_point(vertex);
        }
        bound
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn bounding_box_covers_vertices() {
        let t = Triangle::new(
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
            WorldPoint::new(0.0, 0.0, -1.0),
        );
        assert!(
            t.bounding_box()
                == AABB::new(WorldPoint::new(0.0, 0.0, -1.0), WorldPoint::new(1.0, 1.0, 0.0))
        );
    }

    #[test]
    fn map_indices_to_positions() {
        let indices = Triangle::new(0usize, 1, 2);
        let positions = [
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(3.0, 0.0, 0.0),
            WorldPoint::new(0.0, 3.0, 0.0),
        ];
        let t = indices.map(|i| positions[*i]);
        assert!(t[1] == positions[1]);
        assert!(t.iter().copied().collect::<Vec<_>>() == positions);
    }
}
