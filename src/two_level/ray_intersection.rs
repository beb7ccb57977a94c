use crate::bvh::{TraversalError, TraversalStack};
use crate::geometry::{FloatType, Ray, RayBoxIntersection as _};

use super::{LeafTag, TwoLevelBvh};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InstanceHit {
    pub t: FloatType,
    pub instance_index: usize,
    /// Global packed primitive slot.
    pub primitive_slot: usize,
}

impl TwoLevelBvh {
    /// Finds the nearest primitive of any instance along the ray.
    ///
    /// `intersect_primitive` receives the instance index, the global packed primitive slot and
    /// the ray in the instance's object space. The object space ray is not renormalized, so the
    /// returned distance is directly comparable between instances.
    pub fn intersect_closest<F>(
        &self,
        ray: &Ray,
        mut intersect_primitive: F,
    ) -> Result<Option<InstanceHit>, TraversalError>
    where
        F: FnMut(usize, usize, &Ray) -> Option<FloatType>,
    {
        let mut ray = *ray;
        let mut best = None;

        self.walk_top(&mut ray, |instance_index, primitive_slot, local_ray| {
            if let Some(t) = intersect_primitive(instance_index, primitive_slot, local_ray)
                && t >= local_ray.t_min
                && t < local_ray.t_max
            {
                local_ray.t_max = t;
                best = Some(InstanceHit {
                    t,
                    instance_index,
                    primitive_slot,
                });
            }
            false
        })?;

        Ok(best)
    }

    /// Returns true as soon as any primitive of any instance reports a hit.
    pub fn intersect_any<F>(&self, ray: &Ray, mut intersect_primitive: F) -> Result<bool, TraversalError>
    where
        F: FnMut(usize, usize, &Ray) -> Option<FloatType>,
    {
        let mut ray = *ray;
        self.walk_top(&mut ray, |instance_index, primitive_slot, local_ray| {
            intersect_primitive(instance_index, primitive_slot, local_ray)
                .is_some_and(|t| t >= local_ray.t_min && t <= local_ray.t_max)
        })
    }

    fn walk_top<F>(&self, ray: &mut Ray, mut visit: F) -> Result<bool, TraversalError>
    where
        F: FnMut(usize, usize, &mut Ray) -> bool,
    {
        let mut stack = TraversalStack::<usize>::new();
        stack.push(self.top_root())?;

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bound().is_hit_by(ray) {
                continue;
            }

            match node.tag() {
                Ok(LeafTag::Internal) => {
                    stack.push(node.right_index as usize)?;
                    stack.push(node.left_index as usize)?;
                }
                Ok(LeafTag::TopLeaf) => {
                    let instance_index = node.right_index as usize;
                    let mut local_ray =
                        ray.transformed(self.instance_inverse_transform(instance_index));
                    let found = self.walk_bottom(
                        node.left_index as usize,
                        &mut local_ray,
                        instance_index,
                        &mut visit,
                    )?;
                    ray.t_max = local_ray.t_max;
                    if found {
                        return Ok(true);
                    }
                }
                tag => unreachable!("unexpected tag {tag:?} in instance tree node {index}"),
            }
        }

        Ok(false)
    }

    fn walk_bottom<F>(
        &self,
        root: usize,
        ray: &mut Ray,
        instance_index: usize,
        visit: &mut F,
    ) -> Result<bool, TraversalError>
    where
        F: FnMut(usize, usize, &mut Ray) -> bool,
    {
        let mut stack = TraversalStack::<usize>::new();
        stack.push(root)?;

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bound().is_hit_by(ray) {
                continue;
            }

            match node.tag() {
                Ok(LeafTag::Internal) => {
                    stack.push(node.right_index as usize)?;
                    stack.push(node.left_index as usize)?;
                }
                Ok(LeafTag::BottomLeaf) => {
                    let first = node.left_index as usize;
                    let count = node.right_index as usize;
                    for primitive_slot in first..first + count {
                        if visit(instance_index, primitive_slot, ray) {
                            return Ok(true);
                        }
                    }
                }
                tag => unreachable!("unexpected tag {tag:?} in mesh tree node {index}"),
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bvh::Bvh;
    use crate::geometry::{AABB, Transform, WorldPoint, WorldVector};
    use crate::two_level::BvhInstance;
    use crate::two_level::translation::test::{flatten, row_of_boxes, translated};

    use assert2::{assert, let_assert};

    fn unit_box() -> AABB {
        AABB::new(WorldPoint::new(0.0, 0.0, 0.0), WorldPoint::new(1.0, 1.0, 1.0))
    }

    /// Intersects object space boxes of a mesh laid out by `flatten`.
    fn box_hit<'a>(
        bottoms: &'a [Bvh],
        meshes: &'a [Vec<AABB>],
        flat: &'a TwoLevelBvh,
        instances: &'a [BvhInstance],
    ) -> impl Fn(usize, usize, &Ray) -> Option<FloatType> + 'a {
        move |instance_index, primitive_slot, ray| {
            let mesh_index = instances[instance_index].mesh_index;
            let local_slot = primitive_slot - flat.primitive_base(mesh_index);
            let primitive = bottoms[mesh_index].packed_indices().raw[local_slot] as usize;
            meshes[mesh_index][primitive].intersect(ray).map(|(t, _)| t)
        }
    }

    #[test]
    fn two_disjoint_instances() {
        let meshes = vec![vec![unit_box()]];
        let instances = vec![translated(0, 10.0, 0.0, 0.0), translated(0, 4.0, 0.0, 0.0)];
        let (bottoms, flat) = flatten(&meshes, &instances);
        let hit = box_hit(&bottoms, &meshes, &flat, &instances);

        let ray = Ray::new(WorldPoint::new(0.0, 0.5, 0.5), WorldVector::new(1.0, 0.0, 0.0));
        let_assert!(Ok(Some(closest)) = flat.intersect_closest(&ray, &hit));
        assert!(closest.instance_index == 1);
        assert!(closest.primitive_slot == 0);
        assert!(closest.t == 4.0);

        assert!(flat.intersect_any(&ray, &hit) == Ok(true));

        let miss = Ray::new(WorldPoint::new(0.0, 2.5, 0.5), WorldVector::new(1.0, 0.0, 0.0));
        assert!(flat.intersect_closest(&miss, &hit) == Ok(None));
        assert!(flat.intersect_any(&miss, &hit) == Ok(false));
    }

    #[test]
    fn scaled_instance_distances_are_in_world_units() {
        let meshes = vec![vec![unit_box()]];
        let instances = vec![
            BvhInstance::new(
                0,
                Transform::new_translation(&WorldVector::new(10.0, 0.0, 0.0))
                    * Transform::new_scaling(2.0),
            ),
            translated(0, 14.0, 0.0, 0.0),
        ];
        let (bottoms, flat) = flatten(&meshes, &instances);
        let hit = box_hit(&bottoms, &meshes, &flat, &instances);

        let ray = Ray::new(WorldPoint::new(0.0, 0.5, 0.5), WorldVector::new(1.0, 0.0, 0.0));
        let_assert!(Ok(Some(closest)) = flat.intersect_closest(&ray, &hit));
        assert!(closest.instance_index == 0);
        assert!((closest.t - 10.0).abs() < 1e-5);
    }

    #[test]
    fn moved_instance_is_hit_at_its_new_place() {
        let meshes = vec![vec![unit_box()]];
        let mut instance = BvhInstance::new(0, Transform::identity());
        instance.set_transform(Transform::new_translation(&WorldVector::new(10.0, 0.0, 0.0)));
        let instances = vec![instance];
        let (bottoms, flat) = flatten(&meshes, &instances);
        let hit = box_hit(&bottoms, &meshes, &flat, &instances);

        let ray = Ray::new(WorldPoint::new(0.0, 0.5, 0.5), WorldVector::new(1.0, 0.0, 0.0));
        let_assert!(Ok(Some(closest)) = flat.intersect_closest(&ray, &hit));
        assert!((closest.t - 10.0).abs() < 1e-5);
    }

    #[test]
    fn closest_hit_among_many_primitives() {
        let meshes = vec![row_of_boxes(6), row_of_boxes(3)];
        let instances = vec![
            translated(0, 0.0, 0.0, 0.0),
            translated(1, 0.0, 5.0, 0.0),
            translated(0, 0.0, 5.0, 3.0),
        ];
        let (bottoms, flat) = flatten(&meshes, &instances);
        let hit = box_hit(&bottoms, &meshes, &flat, &instances);

        // Travels along -x through the third instance; its last box starts at x = 10
        let ray = Ray::new(WorldPoint::new(20.0, 5.5, 3.5), WorldVector::new(-1.0, 0.0, 0.0));
        let_assert!(Ok(Some(closest)) = flat.intersect_closest(&ray, &hit));
        assert!(closest.instance_index == 2);
        assert!((closest.t - 9.0).abs() < 1e-5);

        let mesh_slots = flat.primitive_base(0)..flat.primitive_base(0) + 6;
        assert!(mesh_slots.contains(&closest.primitive_slot));
        let local_slot = closest.primitive_slot - flat.primitive_base(0);
        assert!(bottoms[0].packed_indices().raw[local_slot] == 5);
    }

    #[test]
    fn any_hit_stops_at_first_hit() {
        let meshes = vec![row_of_boxes(8)];
        let instances = vec![translated(0, 0.0, 0.0, 0.0)];
        let (_, flat) = flatten(&meshes, &instances);

        let ray = Ray::new(WorldPoint::new(-1.0, 0.5, 0.5), WorldVector::new(1.0, 0.0, 0.0));
        let mut calls = 0;
        let result = flat.intersect_any(&ray, |_, _, _| {
            calls += 1;
            Some(1.0)
        });

        assert!(result == Ok(true));
        assert!(calls == 1);
    }
}
