use thiserror::Error;

use super::{Bvh, NodeIdx, NodeKind, PackedIdx};

/// Structural defects a built hierarchy can have.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BvhValidationError {
    #[error("Packed indices are not a permutation of 0..{primitive_count}")]
    NotAPermutation { primitive_count: usize },
    #[error("Child {child:?} of node {parent:?} is outside of the node pool")]
    ChildOutOfRange { parent: NodeIdx, child: NodeIdx },
    #[error("Child {child:?} of node {parent:?} is not allocated after its parent")]
    ChildBeforeParent { parent: NodeIdx, child: NodeIdx },
    #[error("Child {child:?} of node {parent:?} is reachable more than once")]
    SharedChild { parent: NodeIdx, child: NodeIdx },
    #[error("Bound of child {child:?} is not contained in bound of node {parent:?}")]
    ChildBoundOutsideParent { parent: NodeIdx, child: NodeIdx },
    #[error("Leaf {node:?} has no primitives")]
    EmptyLeaf { node: NodeIdx },
    #[error("Leaf {node:?} refers to packed range {first:?}+{count} out of bounds")]
    LeafOutOfRange {
        node: NodeIdx,
        first: PackedIdx,
        count: u32,
    },
    #[error("Leaf {node:?} packed range does not start where the previous leaf ended")]
    LeafRangeGap { node: NodeIdx },
    #[error("Node {node:?} is not reachable from the root")]
    Unreachable { node: NodeIdx },
}

impl Bvh {
    /// Checks the structural invariants of the tree.
    ///
    /// Every node must be reachable exactly once, children are allocated after their parents
    /// and lie within their bounds, and the leaves, visited depth first, cover the packed index
    /// list in order without gaps.
    pub fn validate(&self) -> Result<(), BvhValidationError> {
        let primitive_count = self.packed_indices.len();
        let node_count = self.nodes.len();

        let mut seen_primitive = vec![false; primitive_count];
        for &primitive in self.packed_indices.iter() {
            let primitive = primitive as usize;
            if primitive >= primitive_count || seen_primitive[primitive] {
                return Err(BvhValidationError::NotAPermutation { primitive_count });
            }
            seen_primitive[primitive] = true;
        }

        let mut seen_node = vec![false; node_count];
        let mut next_packed = 0usize;
        let mut stack = vec![self.root()];
        seen_node[self.root().index()] = true;

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            match node.kind {
                NodeKind::Leaf { first, count } => {
                    if count == 0 {
                        return Err(BvhValidationError::EmptyLeaf { node: index });
                    }
                    if first.index() + count as usize > primitive_count {
                        return Err(BvhValidationError::LeafOutOfRange {
                            node: index,
                            first,
                            count,
                        });
                    }
                    if first.index() != next_packed {
                        return Err(BvhValidationError::LeafRangeGap { node: index });
                    }
                    next_packed += count as usize;
                }
                NodeKind::Internal { left, right } => {
                    for child in [right, left] {
                        if child.index() >= node_count {
                            return Err(BvhValidationError::ChildOutOfRange { parent: index, child });
                        }
                        if child <= index {
                            return Err(BvhValidationError::ChildBeforeParent { parent: index, child });
                        }
                        if seen_node[child.index()] {
                            return Err(BvhValidationError::SharedChild { parent: index, child });
                        }
                        if !node.bound.contains(&self.nodes[child].bound) {
                            return Err(BvhValidationError::ChildBoundOutsideParent {
                                parent: index,
                                child,
                            });
                        }
                        seen_node[child.index()] = true;
                        stack.push(child);
                    }
                }
            }
        }

        if let Some(node) = seen_node.iter().position(|seen| !seen) {
            return Err(BvhValidationError::Unreachable {
                node: NodeIdx::from_usize(node),
            });
        }

        if next_packed != primitive_count {
            return Err(BvhValidationError::NotAPermutation { primitive_count });
        }

        Ok(())
    }
}
