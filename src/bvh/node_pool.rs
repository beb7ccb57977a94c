use std::ops::{Index, IndexMut};

use assert2::assert;
use index_vec::{IndexSlice, IndexVec};

use super::{BvhNode, NodeIdx};

/// Bump allocator for BVH nodes.
///
/// Room for 2N-1 nodes is reserved up front, which is the size of a binary tree with one
/// primitive per leaf. Leaves holding more than one primitive only make the tree smaller.
/// Nodes are never freed individually.
#[derive(Clone, Debug)]
pub struct NodePool {
    nodes: IndexVec<NodeIdx, BvhNode>,
    capacity: usize,
}

impl NodePool {
    pub fn new(primitive_count: usize) -> NodePool {
        assert!(primitive_count > 0, "node pool needs at least one primitive");
        let capacity = 2 * primitive_count - 1;
        NodePool {
            nodes: IndexVec::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns index of the next unused slot, holding a placeholder node.
    /// Panics when the pool is exhausted, which a binary split never does.
    pub fn allocate(&mut self) -> NodeIdx {
        assert!(
            self.nodes.len() < self.capacity,
            "node pool exhausted after {} nodes",
            self.capacity
        );
        self.nodes.push(BvhNode::default())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn as_slice(&self) -> &IndexSlice<NodeIdx, [BvhNode]> {
        self.nodes.as_slice()
    }
}

impl Index<NodeIdx> for NodePool {
    type Output = BvhNode;

    fn index(&self, index: NodeIdx) -> &Self::Output {
        &self.nodes[index]
    }
}

impl IndexMut<NodeIdx> for NodePool {
    fn index_mut(&mut self, index: NodeIdx) -> &mut Self::Output {
        &mut self.nodes[index]
    }
}
