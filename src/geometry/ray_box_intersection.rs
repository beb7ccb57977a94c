use super::{AABB, FloatType, Ray};

pub trait RayBoxIntersection {
    /// Calculate first and last ray intersection with the box, clipped to the ray's interval.
    /// Returns None if the ray misses.
    fn intersect(&self, ray: &Ray) -> Option<(FloatType, FloatType)>;

    fn is_hit_by(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }
}

impl RayBoxIntersection for AABB {
    fn intersect(&self, ray: &Ray) -> Option<(FloatType, FloatType)> {
        let mut t_near = FloatType::NEG_INFINITY;
        let mut t_far = FloatType::INFINITY;

        for axis in 0..3 {
            // Sign of the inverse direction decides which corner is entered first
            let (near_corner, far_corner) = if ray.direction_is_negative[axis] {
                (self.max[axis], self.min[axis])
            } else {
                (self.min[axis], self.max[axis])
            };

            // The multiplication is NAN if the ray is starting on the slab bounding plane
            // and is parallel to it. In this case we blend to +-infinity, so that the range
            // becomes infinite
            let near = (near_corner - ray.origin[axis]) * ray.inv_direction[axis];
            let far = (far_corner - ray.origin[axis]) * ray.inv_direction[axis];
            let near = if near.is_nan() { FloatType::NEG_INFINITY } else { near };
            let far = if far.is_nan() { FloatType::INFINITY } else { far };

            t_near = t_near.max(near);
            t_far = t_far.min(far);
        }

        if t_near <= t_far && t_near < ray.t_max && t_far > ray.t_min {
            Some((t_near.max(ray.t_min), t_far.min(ray.t_max)))
        } else {
            None
        }
    }
}
