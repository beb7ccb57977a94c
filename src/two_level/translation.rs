use assert2::assert;
use bytemuck::Zeroable as _;
use log::debug;

use crate::bvh::{Bvh, ChildSlot, NodeIdx, NodeKind};
use crate::geometry::AABB;

use super::{BvhInstance, FlatNode, MeshLayout, TwoLevelBvh, as_flat_index};

/// Part of the instance tree waiting to be written out.
enum TopItem<'a> {
    Node(NodeIdx),
    /// Instances sharing a single leaf, spread over a balanced subtree with one instance per leaf.
    Instances {
        bound: &'a AABB,
        instances: &'a [u32],
    },
}

struct PendingCopy<'a> {
    item: TopItem<'a>,
    parent: Option<(usize, ChildSlot)>,
}

impl TwoLevelBvh {
    /// Merges mesh trees and the instance tree into one flat array.
    ///
    /// `bottoms[i]` is the tree of mesh `i`, `top` must be built over the world bounds of
    /// `instances`, in order. Instance mesh indices must refer to `bottoms`, otherwise this
    /// panics.
    pub fn translate(top: &Bvh, bottoms: &[Bvh], instances: &[BvhInstance]) -> TwoLevelBvh {
        assert!(
            top.primitive_count() == instances.len(),
            "instance tree must have one primitive per instance"
        );

        let layout = MeshLayout::of(bottoms, instances.len());
        assert!(top.node_count() <= layout.top_capacity());

        let mut nodes = vec![FlatNode::zeroed(); layout.total_len()];

        for (mesh_index, bottom) in bottoms.iter().enumerate() {
            let offset = layout.root_offset(mesh_index);
            copy_bottom(
                &mut nodes[offset..offset + bottom.node_count()],
                bottom,
                offset,
                layout.primitive_base(mesh_index),
            );
        }

        let top_node_count = copy_top(&mut nodes, top, instances, &layout);

        debug!(
            "Flattened {} mesh trees and {} instances into {} nodes ({} used by instance tree)",
            bottoms.len(),
            instances.len(),
            nodes.len(),
            top_node_count
        );

        TwoLevelBvh {
            nodes,
            layout,
            top_node_count,
            instance_inverse_transforms: instances
                .iter()
                .map(|instance| *instance.inverse_transform())
                .collect(),
        }
    }
}

/// Builder allocates nodes in preorder starting at 0, so the copy only shifts indices.
fn copy_bottom(region: &mut [FlatNode], bottom: &Bvh, root_offset: usize, primitive_base: usize) {
    for (index, node) in bottom.nodes().iter_enumerated() {
        region[index.index()] = match node.kind {
            NodeKind::Internal { left, right } => FlatNode::internal(
                &node.bound,
                root_offset + left.index(),
                root_offset + right.index(),
            ),
            NodeKind::Leaf { first, count } => {
                FlatNode::bottom_leaf(&node.bound, primitive_base + first.index(), count as usize)
            }
        };
    }
}

/// Writes the instance tree in preorder after the mesh trees.
/// Returns the number of nodes written.
fn copy_top(
    nodes: &mut [FlatNode],
    top: &Bvh,
    instances: &[BvhInstance],
    layout: &MeshLayout,
) -> usize {
    let top_offset = layout.top_offset();
    let top_end = top_offset + layout.top_capacity();
    let mut next_slot = top_offset;

    let mut pending = vec![PendingCopy {
        item: TopItem::Node(top.root()),
        parent: None,
    }];

    while let Some(PendingCopy { item, parent }) = pending.pop() {
        let slot = next_slot;
        next_slot += 1;
        assert!(slot < top_end, "instance tree does not fit into its region");

        if let Some((parent, child_slot)) = parent {
            match child_slot {
                ChildSlot::Left => nodes[parent].left_index = as_flat_index(slot),
                ChildSlot::Right => nodes[parent].right_index = as_flat_index(slot),
            }
        }

        let (bound, leaf_instances) = match item {
            TopItem::Node(index) => {
                let node = top.node(index);
                match node.kind {
                    NodeKind::Internal { left, right } => {
                        // Children are patched in once they get written
                        nodes[slot] = FlatNode::internal(&node.bound, slot, slot);
                        pending.push(PendingCopy {
                            item: TopItem::Node(right),
                            parent: Some((slot, ChildSlot::Right)),
                        });
                        pending.push(PendingCopy {
                            item: TopItem::Node(left),
                            parent: Some((slot, ChildSlot::Left)),
                        });
                        continue;
                    }
                    NodeKind::Leaf { first, count } => {
                        (&node.bound, top.leaf_primitives(first, count))
                    }
                }
            }
            TopItem::Instances { bound, instances: shared } => (bound, shared),
        };

        assert!(!leaf_instances.is_empty());
        if let [instance_index] = leaf_instances {
            let instance_index = *instance_index as usize;
            let mesh_root = layout.root_offset(instances[instance_index].mesh_index);
            nodes[slot] = FlatNode::top_leaf(bound, mesh_root, instance_index);
        } else {
            let (left, right) = leaf_instances.split_at(leaf_instances.len() / 2);
            nodes[slot] = FlatNode::internal(bound, slot, slot);
            pending.push(PendingCopy {
                item: TopItem::Instances {
                    bound,
                    instances: right,
                },
                parent: Some((slot, ChildSlot::Right)),
            });
            pending.push(PendingCopy {
                item: TopItem::Instances {
                    bound,
                    instances: left,
                },
                parent: Some((slot, ChildSlot::Left)),
            });
        }
    }

    next_slot - top_offset
}
