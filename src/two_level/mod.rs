//! Bottom level trees of all meshes and the top level tree over instances, merged into one
//! flat array of fixed size records that can be uploaded as a single GPU buffer.

mod layout;
mod ray_intersection;
mod translation;
mod validation;

use bytemuck::{Pod, Zeroable};

use crate::geometry::{AABB, Transform, WorldPoint};

pub use layout::MeshLayout;
pub use ray_intersection::InstanceHit;
pub use validation::FlatValidationError;

#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LeafTag {
    Internal = 0,
    /// Leaf of a mesh tree, references a range of packed primitives.
    BottomLeaf = 1,
    /// Leaf of the instance tree, references a mesh tree root and an instance.
    TopLeaf = 2,
}

impl TryFrom<i32> for LeafTag {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LeafTag::Internal),
            1 => Ok(LeafTag::BottomLeaf),
            2 => Ok(LeafTag::TopLeaf),
            other => Err(other),
        }
    }
}

/// One node of the flattened hierarchy.
///
/// Meaning of the two indices depends on `leaf_tag`:
/// - internal: absolute indices of the children,
/// - bottom leaf: first global packed primitive slot and primitive count,
/// - top leaf: index of the instanced mesh's root node and instance index.
///
/// Vector fields start at 16 byte aligned offsets, matching a std430 struct with two vec3s.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FlatNode {
    pub bbox_min: [f32; 3],
    pub leaf_tag: i32,
    pub bbox_max: [f32; 3],
    pub left_index: i32,
    pub right_index: i32,
    pub padding: [u32; 3],
}

const _: () = assert!(std::mem::size_of::<FlatNode>() == 48);

impl FlatNode {
    fn new(bound: &AABB, tag: LeafTag, left_index: usize, right_index: usize) -> FlatNode {
        FlatNode {
            bbox_min: bound.min.coords.into(),
            leaf_tag: tag as i32,
            bbox_max: bound.max.coords.into(),
            left_index: as_flat_index(left_index),
            right_index: as_flat_index(right_index),
            padding: [0; 3],
        }
    }

    pub fn internal(bound: &AABB, left: usize, right: usize) -> FlatNode {
        FlatNode::new(bound, LeafTag::Internal, left, right)
    }

    pub fn bottom_leaf(bound: &AABB, first_primitive: usize, primitive_count: usize) -> FlatNode {
        FlatNode::new(bound, LeafTag::BottomLeaf, first_primitive, primitive_count)
    }

    pub fn top_leaf(bound: &AABB, bottom_root: usize, instance_index: usize) -> FlatNode {
        FlatNode::new(bound, LeafTag::TopLeaf, bottom_root, instance_index)
    }

    /// Returns the tag, or the raw value if it is not a known one.
    pub fn tag(&self) -> Result<LeafTag, i32> {
        LeafTag::try_from(self.leaf_tag)
    }

    pub fn bound(&self) -> AABB {
        AABB::new(
            WorldPoint::from(self.bbox_min),
            WorldPoint::from(self.bbox_max),
        )
    }
}

fn as_flat_index(index: usize) -> i32 {
    i32::try_from(index).expect("index does not fit into a flat node")
}

/// One placement of a mesh in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct BvhInstance {
    pub mesh_index: usize,
    /// Object to world transform.
    transform: Transform,
    inverse_transform: Transform,
}

impl BvhInstance {
    /// Singular transforms get an identity inverse, such instance is flattened to nothing in
    /// world space and rays can't meaningfully hit it anyway.
    pub fn new(mesh_index: usize, transform: Transform) -> BvhInstance {
        BvhInstance {
            mesh_index,
            transform,
            inverse_transform: inverse_or_identity(&transform),
        }
    }

    /// Object to world transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Replaces the transform, keeping the inverse in sync.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.inverse_transform = inverse_or_identity(&transform);
    }

    /// World to object transform.
    pub fn inverse_transform(&self) -> &Transform {
        &self.inverse_transform
    }

    /// World space bound of the instance, given the object space bound of its mesh.
    pub fn world_bound(&self, mesh_bound: &AABB) -> AABB {
        mesh_bound.transformed(&self.transform)
    }
}

fn inverse_or_identity(transform: &Transform) -> Transform {
    transform.try_inverse().unwrap_or_else(Transform::identity)
}

/// All trees of a scene merged into one array.
///
/// Mesh trees occupy consecutive regions at the start of the array, in mesh order, followed
/// by the instance tree and unused headroom. Children always have larger indices than their
/// parents, but the tag decides whether a node is a leaf.
#[derive(Clone, Debug)]
pub struct TwoLevelBvh {
    nodes: Vec<FlatNode>,
    layout: MeshLayout,
    /// Number of slots of the top region actually written.
    top_node_count: usize,
    /// World to object transform of each instance, indexed by top leaf `right_index`.
    instance_inverse_transforms: Vec<Transform>,
}

impl TwoLevelBvh {
    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    /// Raw bytes of the node array, ready to be uploaded as a buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Index of the instance tree root, where traversal starts.
    pub fn top_root(&self) -> usize {
        self.layout.top_offset()
    }

    pub fn top_node_count(&self) -> usize {
        self.top_node_count
    }

    pub fn layout(&self) -> &MeshLayout {
        &self.layout
    }

    pub fn bottom_root(&self, mesh_index: usize) -> usize {
        self.layout.root_offset(mesh_index)
    }

    /// Global packed slot of the first primitive of a mesh.
    pub fn primitive_base(&self, mesh_index: usize) -> usize {
        self.layout.primitive_base(mesh_index)
    }

    pub fn instance_inverse_transform(&self, instance_index: usize) -> &Transform {
        &self.instance_inverse_transforms[instance_index]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::WorldVector;

    use assert2::assert;
    use test_case::test_case;

    #[test]
    fn flat_node_layout() {
        assert!(std::mem::size_of::<FlatNode>() == 48);
        assert!(std::mem::offset_of!(FlatNode, bbox_min) == 0);
        assert!(std::mem::offset_of!(FlatNode, leaf_tag) == 12);
        assert!(std::mem::offset_of!(FlatNode, bbox_max) == 16);
        assert!(std::mem::offset_of!(FlatNode, left_index) == 28);
        assert!(std::mem::offset_of!(FlatNode, right_index) == 32);
    }

    #[test]
    fn flat_node_bytes() {
        let bound = AABB::new(WorldPoint::new(1.0, 2.0, 3.0), WorldPoint::new(4.0, 5.0, 6.0));
        let node = FlatNode::bottom_leaf(&bound, 7, 2);
        let bytes = bytemuck::bytes_of(&node);

        assert!(bytes[0..4] == 1.0f32.to_ne_bytes());
        assert!(bytes[12..16] == 1i32.to_ne_bytes());
        assert!(bytes[16..20] == 4.0f32.to_ne_bytes());
        assert!(bytes[28..32] == 7i32.to_ne_bytes());
        assert!(bytes[32..36] == 2i32.to_ne_bytes());
        assert!(bytes[36..48].iter().all(|b| *b == 0));
        assert!(node.bound() == bound);
    }

    #[test_case(0, Ok(LeafTag::Internal))]
    #[test_case(1, Ok(LeafTag::BottomLeaf))]
    #[test_case(2, Ok(LeafTag::TopLeaf))]
    #[test_case(3, Err(3))]
    #[test_case(-1, Err(-1))]
    fn leaf_tag_from_raw(raw: i32, expected: Result<LeafTag, i32>) {
        assert!(LeafTag::try_from(raw) == expected);
    }

    #[test]
    fn instance_caches_inverse() {
        let transform = Transform::new_translation(&WorldVector::new(1.0, 2.0, 3.0));
        let instance = BvhInstance::new(0, transform);

        let p = WorldPoint::new(5.0, 5.0, 5.0);
        let back = instance
            .inverse_transform()
            .transform_point(&transform.transform_point(&p));
        assert!((back - p).norm() < 1e-6);
    }

    #[test]
    fn replaced_transform_updates_inverse() {
        let mut instance = BvhInstance::new(0, Transform::identity());
        let transform = Transform::new_translation(&WorldVector::new(10.0, 0.0, 0.0));
        instance.set_transform(transform);

        assert!(*instance.transform() == transform);
        let p = WorldPoint::new(10.5, 0.5, 0.5);
        let local = instance.inverse_transform().transform_point(&p);
        assert!((local - WorldPoint::new(0.5, 0.5, 0.5)).norm() < 1e-6);
    }

    #[test]
    fn singular_instance_gets_identity_inverse() {
        let instance = BvhInstance::new(0, Transform::zeros());
        assert!(*instance.inverse_transform() == Transform::identity());
    }

    #[test]
    fn instance_world_bound() {
        let transform = Transform::new_translation(&WorldVector::new(10.0, 0.0, 0.0))
            * Transform::new_scaling(2.0);
        let instance = BvhInstance::new(3, transform);
        let mesh_bound = AABB::new(WorldPoint::new(0.0, 0.0, 0.0), WorldPoint::new(1.0, 1.0, 1.0));

        let world = instance.world_bound(&mesh_bound);
        assert!(world == AABB::new(WorldPoint::new(10.0, 0.0, 0.0), WorldPoint::new(12.0, 2.0, 2.0)));
    }
}
