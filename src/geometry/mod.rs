pub mod aabb;
mod ray_box_intersection;
mod triangle;

pub use aabb::AABB;
pub use ray_box_intersection::RayBoxIntersection;
pub use triangle::Triangle;

pub type FloatType = f32;
pub type WorldPoint = nalgebra::Point3<FloatType>;
pub type WorldVector = nalgebra::Vector3<FloatType>;

/// Affine object-to-world transform, column major.
pub type Transform = nalgebra::Matrix4<FloatType>;

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,
    pub direction: WorldVector,

    /// Componentwise inverse of the ray direction
    /// Zeros in direction get turned into positive infinity regardless of the sign of the zero
    pub inv_direction: WorldVector,

    /// For each axis, whether the inverse direction is negative.
    /// Selects which box corner is the near one in the slab test.
    pub direction_is_negative: [bool; 3],

    pub t_min: FloatType,
    pub t_max: FloatType,
}

impl Ray {
    /// Creates a ray with normalized direction, valid on [0, infinity).
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        Self::unnormalized(origin, direction.normalize(), 0.0, FloatType::INFINITY)
    }

    /// Creates a ray keeping the direction as is.
    /// Distances along such ray are measured in multiples of the direction length.
    pub fn unnormalized(
        origin: WorldPoint,
        direction: WorldVector,
        t_min: FloatType,
        t_max: FloatType,
    ) -> Ray {
        let inv_direction = direction.map(|x| if x == 0.0 { FloatType::INFINITY } else { 1.0 / x });
        let direction_is_negative = [
            inv_direction.x < 0.0,
            inv_direction.y < 0.0,
            inv_direction.z < 0.0,
        ];

        Ray {
            origin,
            direction,
            inv_direction,
            direction_is_negative,
            t_min,
            t_max,
        }
    }

    pub fn with_interval(self, t_min: FloatType, t_max: FloatType) -> Ray {
        Ray {
            t_min,
            t_max,
            ..self
        }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }

    /// Ray expressed in the space given by `transform`.
    /// Direction is not renormalized, so distances along the returned ray match distances
    /// along this one.
    pub fn transformed(&self, transform: &Transform) -> Ray {
        Ray::unnormalized(
            transform.transform_point(&self.origin),
            transform.transform_vector(&self.direction),
            self.t_min,
            self.t_max,
        )
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use assert2::assert;
    use proptest::prelude::*;

    /// Helper macro that creates a wrapper arnound a type that implemetns Deref and Arbitary
    macro_rules! arbitrary_wrapper {
        ( $wrapper_name:ident ( $type:ty ) -> $block:block ) => {
            #[derive(Clone, Debug)]
            pub struct $wrapper_name(pub $type);

            impl std::ops::Deref for $wrapper_name {
                type Target = $type;
                fn deref(&self) -> &$type {
                    &self.0
                }
            }

            impl Arbitrary for $wrapper_name {
                type Parameters = ();
                type Strategy = proptest::strategy::BoxedStrategy<Self>;
                fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
                    $block.prop_map(|x| $wrapper_name(x)).boxed()
                }
            }
        };
    }

    fn simple_float() -> BoxedStrategy<f32> {
        (-1_000_000i32..1_000_000).prop_map(|n| n as f32 * 1e-3).boxed()
    }

    fn simple_positive_float() -> BoxedStrategy<f32> {
        (0u32..100_000).prop_map(|n| n as f32 * 1e-3).boxed()
    }

    pub fn world_point() -> BoxedStrategy<WorldPoint> {
        (simple_float(), simple_float(), simple_float())
            .prop_map(|coords| WorldPoint::new(coords.0, coords.1, coords.2))
            .boxed()
    }

    pub fn world_box() -> BoxedStrategy<AABB> {
        (
            world_point(),
            simple_positive_float(),
            simple_positive_float(),
            simple_positive_float(),
        )
            .prop_map(|(min, dx, dy, dz)| AABB::new(min, min + WorldVector::new(dx, dy, dz)))
            .boxed()
    }

    arbitrary_wrapper! {
        WorldPointWrapper(WorldPoint) -> {
            world_point()
        }
    }

    arbitrary_wrapper! {
        WorldBoxWrapper(AABB) -> {
            world_box()
        }
    }

    arbitrary_wrapper! {
        WorldBoxesWrapper(Vec<AABB>) -> {
            proptest::collection::vec(world_box(), 1..200)
        }
    }

    #[test]
    fn ray_new_normalizes() {
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(0.0, 3.0, 4.0));
        assert!((ray.direction.norm() - 1.0).abs() < 1e-6);
        assert!(ray.t_min == 0.0);
        assert!(ray.t_max == FloatType::INFINITY);
    }

    #[test]
    fn ray_zero_direction_components_invert_to_positive_infinity() {
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(-0.0, 0.0, -1.0));
        assert!(ray.inv_direction.x == FloatType::INFINITY);
        assert!(ray.inv_direction.y == FloatType::INFINITY);
        assert!(ray.inv_direction.z == -1.0);
        assert!(ray.direction_is_negative == [false, false, true]);
    }

    #[test]
    fn ray_transformed_keeps_distances() {
        let ray = Ray::new(WorldPoint::new(0.0, 0.0, -10.0), WorldVector::new(0.0, 0.0, 1.0));
        let scale = Transform::new_scaling(0.5);
        let local = ray.transformed(&scale);

        let world_hit = ray.point_at(4.0);
        let local_hit = local.point_at(4.0);
        assert!((scale.transform_point(&world_hit) - local_hit).norm() < 1e-6);
    }
}
