use thiserror::Error;

use super::{LeafTag, TwoLevelBvh};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlatValidationError {
    #[error("Node {node} has unknown leaf tag {tag}")]
    UnknownTag { node: usize, tag: i32 },
    #[error("Child {child} of node {node} does not come after it in the array")]
    ChildBeforeParent { node: usize, child: i64 },
    #[error("Child {child} of node {node} is outside of the array")]
    ChildOutOfRange { node: usize, child: i64 },
    #[error("Node {node} links to a different tree region than its own")]
    ChildOutsideRegion { node: usize },
    #[error("Bound of node {child} is not contained in bound of its parent {node}")]
    ChildBoundOutsideParent { node: usize, child: usize },
    #[error("Leaf {node} references primitives {first}+{count} outside of its mesh")]
    LeafOutOfRange { node: usize, first: i64, count: i64 },
    #[error("Top level leaf {node} found inside a mesh tree")]
    TopLeafInMesh { node: usize },
    #[error("Mesh leaf {node} found inside the instance tree")]
    BottomLeafInTop { node: usize },
    #[error("Top level leaf {node} references instance {instance} out of range")]
    UnknownInstance { node: usize, instance: i64 },
    #[error("Top level leaf {node} references node {root} which is not a mesh root")]
    NotAMeshRoot { node: usize, root: i64 },
}

impl TwoLevelBvh {
    /// Checks every node reachable from the instance tree root and from each mesh root.
    pub fn validate(&self) -> Result<(), FlatValidationError> {
        for mesh_index in 0..self.layout.mesh_count() {
            self.validate_tree(self.bottom_root(mesh_index), Some(mesh_index))?;
        }
        if self.layout.instance_count() > 0 {
            self.validate_tree(self.top_root(), None)?;
        }
        Ok(())
    }

    /// Indices of all leaves (of either level) reachable from `root` without crossing
    /// from the instance tree into mesh trees, in depth first order.
    pub fn reachable_leaves(&self, root: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![root];

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.tag() == Ok(LeafTag::Internal) {
                stack.push(node.right_index as usize);
                stack.push(node.left_index as usize);
            } else {
                leaves.push(index);
            }
        }

        leaves
    }

    /// `mesh_index` is None for the instance tree.
    fn validate_tree(&self, root: usize, mesh_index: Option<usize>) -> Result<(), FlatValidationError> {
        let mut stack = vec![root];

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let tag = node.tag().map_err(|tag| FlatValidationError::UnknownTag { node: index, tag })?;

            match (tag, mesh_index) {
                (LeafTag::Internal, _) => {
                    for child in [node.right_index, node.left_index] {
                        let child_index = self.check_child(index, child, mesh_index)?;
                        if !node.bound().contains(&self.nodes[child_index].bound()) {
                            return Err(FlatValidationError::ChildBoundOutsideParent {
                                node: index,
                                child: child_index,
                            });
                        }
                        stack.push(child_index);
                    }
                }
                (LeafTag::BottomLeaf, Some(mesh_index)) => {
                    let base = self.layout.primitive_base(mesh_index) as i64;
                    let end = base + self.layout.primitive_count(mesh_index) as i64;
                    let first = node.left_index as i64;
                    let count = node.right_index as i64;
                    if count <= 0 || first < base || first + count > end {
                        return Err(FlatValidationError::LeafOutOfRange {
                            node: index,
                            first,
                            count,
                        });
                    }
                }
                (LeafTag::BottomLeaf, None) => {
                    return Err(FlatValidationError::BottomLeafInTop { node: index });
                }
                (LeafTag::TopLeaf, Some(_)) => {
                    return Err(FlatValidationError::TopLeafInMesh { node: index });
                }
                (LeafTag::TopLeaf, None) => {
                    let root = node.left_index as i64;
                    if root < 0 || !self.layout.is_bottom_root(root as usize) {
                        return Err(FlatValidationError::NotAMeshRoot { node: index, root });
                    }
                    let instance = node.right_index as i64;
                    if instance < 0 || instance as usize >= self.layout.instance_count() {
                        return Err(FlatValidationError::UnknownInstance {
                            node: index,
                            instance,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Checks that a child link stays inside the same tree region and points forward.
    fn check_child(
        &self,
        node: usize,
        child: i32,
        mesh_index: Option<usize>,
    ) -> Result<usize, FlatValidationError> {
        let child_wide = child as i64;
        if child < 0 || child as usize >= self.nodes.len() {
            return Err(FlatValidationError::ChildOutOfRange {
                node,
                child: child_wide,
            });
        }

        let child = child as usize;
        if child <= node {
            return Err(FlatValidationError::ChildBeforeParent {
                node,
                child: child_wide,
            });
        }

        let in_region = match mesh_index {
            Some(mesh_index) => self.layout.mesh_of_node(child) == Some(mesh_index),
            None => child < self.top_root() + self.top_node_count,
        };
        if !in_region {
            return Err(FlatValidationError::ChildOutsideRegion { node });
        }

        Ok(child)
    }
}
