use assert2::debug_assert;

use super::{FloatType, Transform, WorldPoint, WorldVector};

/// Axis aligned bounding box.
///
/// The default box is empty, with min at positive infinity and max at negative infinity.
/// Growing it by anything yields exactly that thing.
#[derive(Clone, Debug, PartialEq)]
pub struct AABB {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl AABB {
    pub fn new(min: WorldPoint, max: WorldPoint) -> AABB {
        AABB { min, max }
    }

    pub fn empty() -> AABB {
        AABB {
            min: WorldPoint::from(WorldVector::repeat(FloatType::INFINITY)),
            max: WorldPoint::from(WorldVector::repeat(FloatType::NEG_INFINITY)),
        }
    }

    pub fn from_point(point: WorldPoint) -> AABB {
        AABB {
            min: point,
            max: point,
        }
    }

    /// Box spanned by two arbitrary corners.
    pub fn from_corners(a: WorldPoint, b: WorldPoint) -> AABB {
        AABB {
            min: componentwise_min(&a, &b),
            max: componentwise_max(&a, &b),
        }
    }

    /// True until the box was grown by at least one point or box.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> WorldPoint {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn diagonal(&self) -> WorldVector {
        self.max - self.min
    }

    pub fn surface_area(&self) -> FloatType {
        debug_assert!(!self.is_empty(), "surface area of an empty box");
        let d = self.diagonal();
        (d.x * d.y + d.x * d.z + d.y * d.z) * 2.0
    }

    pub fn volume(&self) -> FloatType {
        debug_assert!(!self.is_empty(), "volume of an empty box");
        let d = self.diagonal();
        d.x * d.y * d.z
    }

    /// Index of the axis with the largest extent.
    /// X only wins when strictly larger than both others, Y when strictly larger than Z,
    /// otherwise (including a three way tie) the result is Z.
    pub fn maximum_extent(&self) -> usize {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    pub fn grow(&mut self, other: &AABB) {
        self.min = componentwise_min(&self.min, &other.min);
        self.max = componentwise_max(&self.max, &other.max);
    }

    pub fn grow_point(&mut self, point: &WorldPoint) {
        self.min = componentwise_min(&self.min, point);
        self.max = componentwise_max(&self.max, point);
    }

    pub fn union(a: &AABB, b: &AABB) -> AABB {
        AABB {
            min: componentwise_min(&a.min, &b.min),
            max: componentwise_max(&a.max, &b.max),
        }
    }

    pub fn union_point(a: &AABB, point: &WorldPoint) -> AABB {
        AABB {
            min: componentwise_min(&a.min, point),
            max: componentwise_max(&a.max, point),
        }
    }

    /// Whether `other` lies completely inside this box (boundaries included).
    pub fn contains(&self, other: &AABB) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }

    /// Bounding box of this box after applying an affine transform.
    ///
    /// Each column of the linear part is scaled by the box's min and max along that axis and
    /// the smaller/larger products are summed up, giving a tight bound without transforming
    /// all eight corners.
    pub fn transformed(&self, transform: &Transform) -> AABB {
        let translation: WorldVector = transform.fixed_view::<3, 1>(0, 3).into_owned();
        let mut min = translation;
        let mut max = translation;

        for axis in 0..3 {
            let column: WorldVector = transform.fixed_view::<3, 1>(0, axis).into_owned();
            let a = column * self.min[axis];
            let b = column * self.max[axis];
            min += a.zip_map(&b, FloatType::min);
            max += a.zip_map(&b, FloatType::max);
        }

        AABB {
            min: min.into(),
            max: max.into(),
        }
    }
}

impl Default for AABB {
    fn default() -> Self {
        AABB::empty()
    }
}

impl From<[WorldPoint; 2]> for AABB {
    fn from(value: [WorldPoint; 2]) -> Self {
        let [min, max] = value;
        AABB { min, max }
    }
}

impl From<(WorldPoint, WorldPoint)> for AABB {
    fn from(value: (WorldPoint, WorldPoint)) -> Self {
        let (min, max) = value;
        AABB { min, max }
    }
}

fn componentwise_min(a: &WorldPoint, b: &WorldPoint) -> WorldPoint {
    a.coords.zip_map(&b.coords, FloatType::min).into()
}

fn componentwise_max(a: &WorldPoint, b: &WorldPoint) -> WorldPoint {
    a.coords.zip_map(&b.coords, FloatType::max).into()
}
