//! Binary bounding volume hierarchy over a flat array of primitive bounds.
//!
//! Nodes live in a fixed capacity pool and reference each other by index. The root is always
//! the first node and every node is allocated before its children, depth first.

mod building;
mod node_pool;
mod printing;
mod ray_bvh_intersection;
mod validation;

use index_vec::{IndexSlice, IndexVec};

use crate::geometry::AABB;

pub use node_pool::NodePool;
pub use printing::BvhStatistics;
pub use ray_bvh_intersection::{PrimitiveHit, TRAVERSAL_STACK_CAPACITY, TraversalError};
pub use validation::BvhValidationError;

pub(crate) use ray_bvh_intersection::TraversalStack;

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

index_vec::define_index_type! {
    /// Position in the packed primitive index list.
    pub struct PackedIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

#[derive(Clone, Debug, PartialEq)]
pub struct BvhNode {
    pub bound: AABB,
    pub kind: NodeKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Internal { left: NodeIdx, right: NodeIdx },
    /// Owns `count` consecutive entries of the packed index list, starting at `first`.
    Leaf { first: PackedIdx, count: u32 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ChildSlot {
    Left,
    Right,
}

impl BvhNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn children(&self) -> Option<(NodeIdx, NodeIdx)> {
        match self.kind {
            NodeKind::Internal { left, right } => Some((left, right)),
            NodeKind::Leaf { .. } => None,
        }
    }

    fn set_child(&mut self, slot: ChildSlot, child: NodeIdx) {
        let NodeKind::Internal { left, right } = &mut self.kind else {
            panic!("only internal nodes have children");
        };
        match slot {
            ChildSlot::Left => *left = child,
            ChildSlot::Right => *right = child,
        }
    }
}

impl Default for BvhNode {
    /// Placeholder for a freshly allocated slot, an empty leaf.
    fn default() -> Self {
        BvhNode {
            bound: AABB::empty(),
            kind: NodeKind::Leaf {
                first: PackedIdx::from_raw(0),
                count: 0,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct Bvh {
    nodes: NodePool,
    /// Original primitive indices, permuted so that every leaf owns a contiguous slice.
    packed_indices: IndexVec<PackedIdx, u32>,
    bound: AABB,
    height: usize,
}

impl Bvh {
    pub fn root(&self) -> NodeIdx {
        NodeIdx::from_raw(0)
    }

    pub fn node(&self, index: NodeIdx) -> &BvhNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &IndexSlice<NodeIdx, [BvhNode]> {
        self.nodes.as_slice()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Capacity reserved for the nodes, 2N-1 for N primitives.
    pub fn node_capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub fn packed_indices(&self) -> &IndexSlice<PackedIdx, [u32]> {
        self.packed_indices.as_slice()
    }

    pub fn primitive_count(&self) -> usize {
        self.packed_indices.len()
    }

    /// Original primitive indices stored in a leaf.
    pub fn leaf_primitives(&self, first: PackedIdx, count: u32) -> &[u32] {
        &self.packed_indices.raw[first.index()..first.index() + count as usize]
    }

    /// Union of all input bounds.
    pub fn bound(&self) -> &AABB {
        &self.bound
    }

    /// Depth of the deepest node, the root has depth 0.
    pub fn height(&self) -> usize {
        self.height
    }
}
