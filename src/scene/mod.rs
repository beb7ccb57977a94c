//! Scene level wrapper: triangle meshes, their placements and the merged acceleration
//! structure over all of them.

pub mod procedural;

use bon::bon;
use log::info;
use thiserror::Error;

use crate::bvh::{Bvh, TraversalError};
use crate::geometry::{AABB, FloatType, Ray, Triangle, WorldPoint};
use crate::two_level::{BvhInstance, TwoLevelBvh};

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle<WorldPoint>>,
}

impl Mesh {
    pub fn new(triangles: Vec<Triangle<WorldPoint>>) -> Self {
        Mesh { triangles }
    }

    /// Creates a mesh from a vertex list and triangles indexing into it.
    pub fn from_indexed(positions: &[WorldPoint], triangles: &[Triangle<usize>]) -> Self {
        Mesh {
            triangles: triangles
                .iter()
                .map(|triangle| triangle.map(|i| positions[*i]))
                .collect(),
        }
    }

    pub fn triangle_bounds(&self) -> Vec<AABB> {
        self.triangles.iter().map(|triangle| triangle.bounding_box()).collect()
    }
}

/// Source of the triangle stored at one global packed slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PackedTriangle {
    pub mesh_index: usize,
    pub triangle_index: usize,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SceneHit {
    pub t: FloatType,
    pub instance_index: usize,
    pub mesh_index: usize,
    pub triangle_index: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("Scene has no instances")]
    NoInstances,

    #[error("Mesh {mesh} has no triangles")]
    EmptyMesh { mesh: usize },

    #[error("Instance {instance} references mesh {mesh} which does not exist")]
    UnknownMesh { instance: usize, mesh: usize },
}

#[derive(Clone, Debug)]
pub struct SceneAccelerator {
    meshes: Vec<Mesh>,
    instances: Vec<BvhInstance>,
    bottom_levels: Vec<Bvh>,
    top_level: Bvh,
    flattened: TwoLevelBvh,
    /// Triangle for every global packed slot of `flattened`.
    triangle_order: Vec<PackedTriangle>,
}

#[bon]
impl SceneAccelerator {
    #[builder]
    pub fn new(meshes: Vec<Mesh>, instances: Vec<BvhInstance>) -> Result<Self, SceneError> {
        if instances.is_empty() {
            return Err(SceneError::NoInstances);
        }
        if let Some(mesh) = meshes.iter().position(|mesh| mesh.triangles.is_empty()) {
            return Err(SceneError::EmptyMesh { mesh });
        }
        if let Some((instance, mesh)) = instances
            .iter()
            .enumerate()
            .find(|(_, instance)| instance.mesh_index >= meshes.len())
        {
            return Err(SceneError::UnknownMesh {
                instance,
                mesh: mesh.mesh_index,
            });
        }

        let bottom_levels: Vec<_> = meshes
            .iter()
            .map(|mesh| Bvh::build(&mesh.triangle_bounds()))
            .collect();

        let instance_bounds: Vec<_> = instances
            .iter()
            .map(|instance| instance.world_bound(bottom_levels[instance.mesh_index].bound()))
            .collect();
        let top_level = Bvh::build(&instance_bounds);

        let flattened = TwoLevelBvh::translate(&top_level, &bottom_levels, &instances);

        let triangle_order: Vec<_> = bottom_levels
            .iter()
            .enumerate()
            .flat_map(|(mesh_index, bvh)| {
                bvh.packed_indices()
                    .iter()
                    .map(move |triangle_index| PackedTriangle {
                        mesh_index,
                        triangle_index: *triangle_index as usize,
                    })
            })
            .collect();

        info!(
            "Scene with {} meshes ({} triangles) and {} instances: {} flat nodes, {} bytes",
            meshes.len(),
            triangle_order.len(),
            instances.len(),
            flattened.nodes().len(),
            flattened.as_bytes().len()
        );

        Ok(SceneAccelerator {
            meshes,
            instances,
            bottom_levels,
            top_level,
            flattened,
            triangle_order,
        })
    }
}

impl SceneAccelerator {
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn instances(&self) -> &[BvhInstance] {
        &self.instances
    }

    pub fn bottom_levels(&self) -> &[Bvh] {
        &self.bottom_levels
    }

    pub fn top_level(&self) -> &Bvh {
        &self.top_level
    }

    pub fn flattened(&self) -> &TwoLevelBvh {
        &self.flattened
    }

    /// Order in which triangles must be stored so that global packed slots index them directly.
    pub fn triangle_order(&self) -> &[PackedTriangle] {
        &self.triangle_order
    }

    /// World space bound of the whole scene.
    pub fn bound(&self) -> &AABB {
        self.top_level.bound()
    }

    fn triangle_at(&self, primitive_slot: usize) -> (PackedTriangle, &Triangle<WorldPoint>) {
        let packed = self.triangle_order[primitive_slot];
        (
            packed,
            &self.meshes[packed.mesh_index].triangles[packed.triangle_index],
        )
    }

    /// Finds the nearest triangle along the ray.
    ///
    /// `intersect_triangle` gets the triangle in object space together with the ray transformed
    /// into the same space.
    pub fn intersect_closest<F>(
        &self,
        ray: &Ray,
        mut intersect_triangle: F,
    ) -> Result<Option<SceneHit>, TraversalError>
    where
        F: FnMut(&Triangle<WorldPoint>, &Ray) -> Option<FloatType>,
    {
        let hit = self
            .flattened
            .intersect_closest(ray, |_, primitive_slot, local_ray| {
                intersect_triangle(self.triangle_at(primitive_slot).1, local_ray)
            })?;

        Ok(hit.map(|hit| {
            let (packed, _) = self.triangle_at(hit.primitive_slot);
            SceneHit {
                t: hit.t,
                instance_index: hit.instance_index,
                mesh_index: packed.mesh_index,
                triangle_index: packed.triangle_index,
            }
        }))
    }

    pub fn intersect_any<F>(&self, ray: &Ray, mut intersect_triangle: F) -> Result<bool, TraversalError>
    where
        F: FnMut(&Triangle<WorldPoint>, &Ray) -> Option<FloatType>,
    {
        self.flattened
            .intersect_any(ray, |_, primitive_slot, local_ray| {
                intersect_triangle(self.triangle_at(primitive_slot).1, local_ray)
            })
    }
}
