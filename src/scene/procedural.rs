//! Generated test content, used by the executable and the benchmark.

use rand::Rng;

use crate::geometry::{FloatType, Transform, Triangle, WorldPoint, WorldVector};
use crate::two_level::BvhInstance;

use super::Mesh;

/// Random small triangles scattered through a cube of side `size` centered at the origin.
pub fn triangle_soup(rng: &mut impl Rng, triangle_count: usize, size: FloatType) -> Mesh {
    let half = size / 2.0;
    let triangle_size = size / (triangle_count as FloatType).cbrt().max(1.0);

    let mut random_point = |center: WorldPoint, radius: FloatType| {
        center
            + WorldVector::new(
                rng.random_range(-radius..=radius),
                rng.random_range(-radius..=radius),
                rng.random_range(-radius..=radius),
            )
    };

    Mesh::new(
        (0..triangle_count)
            .map(|_| {
                let center = random_point(WorldPoint::origin(), half);
                Triangle::new(
                    random_point(center, triangle_size),
                    random_point(center, triangle_size),
                    random_point(center, triangle_size),
                )
            })
            .collect(),
    )
}

/// Square grid of `side * side` instances in the xz plane, cycling through meshes and
/// turning each one around the y axis.
pub fn instance_grid(mesh_count: usize, side: usize, spacing: FloatType) -> Vec<BvhInstance> {
    (0..side * side)
        .map(|i| {
            let x = (i % side) as FloatType * spacing;
            let z = (i / side) as FloatType * spacing;
            let angle = i as FloatType * 0.7;
            let transform = Transform::new_translation(&WorldVector::new(x, 0.0, z))
                * Transform::new_rotation(WorldVector::y() * angle);
            BvhInstance::new(i % mesh_count, transform)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::AABB;

    use assert2::assert;
    use rand::{SeedableRng as _, rngs::SmallRng};

    #[test]
    fn soup_stays_near_its_cube() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mesh = triangle_soup(&mut rng, 1000, 10.0);

        assert!(mesh.triangles.len() == 1000);
        let allowed = AABB::new(WorldPoint::new(-7.0, -7.0, -7.0), WorldPoint::new(7.0, 7.0, 7.0));
        for bound in mesh.triangle_bounds() {
            assert!(allowed.contains(&bound));
        }
    }

    #[test]
    fn grid_cycles_meshes() {
        let instances = instance_grid(3, 4, 20.0);

        assert!(instances.len() == 16);
        assert!(instances.iter().map(|i| i.mesh_index).take(4).collect::<Vec<_>>() == [0, 1, 2, 0]);
        let last = instances[15].transform().transform_point(&WorldPoint::origin());
        assert!((last - WorldPoint::new(60.0, 0.0, 60.0)).norm() < 1e-4);
    }
}
