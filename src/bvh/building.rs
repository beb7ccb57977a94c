use assert2::assert;
use index_vec::IndexVec;
use log::debug;

use crate::geometry::{AABB, WorldPoint};

use super::{Bvh, ChildSlot, NodeIdx, NodeKind, NodePool};

/// Staging record for one input primitive, reordered while partitioning.
#[derive(Clone, Debug)]
struct PrimitiveRef {
    bound: AABB,
    centroid: WorldPoint,
    original_index: u32,
}

/// A range of primitives waiting to become a node.
#[derive(Clone, Debug)]
struct SplitRange {
    start: usize,
    end: usize,
    bound: AABB,
    /// Bound of primitive centers in the range, drives the split choice.
    centroid_bound: AABB,
    depth: usize,
}

struct PendingSplit {
    range: SplitRange,
    parent: Option<(NodeIdx, ChildSlot)>,
}

impl SplitRange {
    /// Scans the primitives in `start..end` for both bounds.
    fn covering(primitives: &[PrimitiveRef], start: usize, end: usize, depth: usize) -> Self {
        let mut bound = AABB::empty();
        let mut centroid_bound = AABB::empty();
        for primitive in &primitives[start..end] {
            bound.grow(&primitive.bound);
            centroid_bound.grow_point(&primitive.centroid);
        }

        SplitRange {
            start,
            end,
            bound,
            centroid_bound,
            depth,
        }
    }

    fn len(&self) -> usize {
        self.end - self.start
    }
}

impl Bvh {
    /// Builds the hierarchy over `bounds`.
    /// Leaves refer to primitives by their position in `bounds`.
    ///
    /// Panics if `bounds` is empty.
    pub fn build(bounds: &[AABB]) -> Bvh {
        assert!(!bounds.is_empty(), "cannot build a BVH without primitives");
        assert!(bounds.len() <= u32::MAX as usize);

        let mut primitives: Vec<PrimitiveRef> = bounds
            .iter()
            .enumerate()
            .map(|(i, bound)| PrimitiveRef {
                bound: bound.clone(),
                centroid: bound.center(),
                original_index: i as u32,
            })
            .collect();

        let root_range = SplitRange::covering(&primitives, 0, primitives.len(), 0);

        let mut bvh = Bvh {
            nodes: NodePool::new(primitives.len()),
            packed_indices: IndexVec::with_capacity(primitives.len()),
            bound: root_range.bound.clone(),
            height: 0,
        };

        // Right half is pushed first, so that the left subtree is completed before the right
        // one starts. This gives the same depth first allocation order as plain recursion.
        let mut pending = vec![PendingSplit {
            range: root_range,
            parent: None,
        }];

        while let Some(PendingSplit { range, parent }) = pending.pop() {
            let node_index = bvh.nodes.allocate();
            if let Some((parent_index, slot)) = parent {
                bvh.nodes[parent_index].set_child(slot, node_index);
            }
            bvh.height = bvh.height.max(range.depth);

            let Some(mid) = split(&mut primitives, &range) else {
                bvh.make_leaf(node_index, &primitives, range);
                continue;
            };

            let node = &mut bvh.nodes[node_index];
            node.bound = range.bound;
            // Children are patched in once they get allocated
            node.kind = NodeKind::Internal {
                left: node_index,
                right: node_index,
            };

            let depth = range.depth + 1;
            pending.push(PendingSplit {
                range: SplitRange::covering(&primitives, mid, range.end, depth),
                parent: Some((node_index, ChildSlot::Right)),
            });
            pending.push(PendingSplit {
                range: SplitRange::covering(&primitives, range.start, mid, depth),
                parent: Some((node_index, ChildSlot::Left)),
            });
        }

        debug!(
            "Built BVH over {} primitives: {} nodes (capacity {}), height {}",
            bvh.primitive_count(),
            bvh.node_count(),
            bvh.node_capacity(),
            bvh.height
        );

        bvh
    }

    fn make_leaf(&mut self, node_index: NodeIdx, primitives: &[PrimitiveRef], range: SplitRange) {
        let first = self.packed_indices.next_idx();
        self.packed_indices.extend(
            primitives[range.start..range.end]
                .iter()
                .map(|primitive| primitive.original_index),
        );

        let node = &mut self.nodes[node_index];
        node.kind = NodeKind::Leaf {
            first,
            count: range.len() as u32,
        };
        node.bound = range.bound;
    }
}

/// Partitions the range around the middle of its centroid bound along the widest axis.
/// Returns the index of the first primitive of the right half, or None if the range should
/// become a leaf.
fn split(primitives: &mut [PrimitiveRef], range: &SplitRange) -> Option<usize> {
    if range.len() < 2 {
        return None;
    }

    let axis = range.centroid_bound.maximum_extent();
    let low = range.centroid_bound.min[axis];
    let high = range.centroid_bound.max[axis];
    if low == high {
        // All centers coincide along the widest axis, no split can separate them
        return None;
    }

    let split_value = (low + high) * 0.5;
    let left_count = itertools::partition(&mut primitives[range.start..range.end], |primitive| {
        primitive.centroid[axis] < split_value
    });

    // With adjacent floats the midpoint can round onto `low` and leave one side empty
    if left_count == 0 || left_count == range.len() {
        return None;
    }

    Some(range.start + left_count)
}
