use assert2::assert;

use crate::bvh::Bvh;

/// Placement of the mesh trees inside the flattened array.
///
/// Mesh `i` occupies node slots `root_offset(i)..root_offset(i + 1)` and global packed
/// primitive slots `primitive_base(i)..primitive_base(i + 1)`. The instance tree follows
/// the last mesh, with room for `2 * instance_count` nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshLayout {
    /// Running sums of node counts, one extra entry at the end.
    root_offsets: Vec<usize>,
    /// Running sums of primitive counts, one extra entry at the end.
    primitive_bases: Vec<usize>,
    instance_count: usize,
}

impl MeshLayout {
    pub fn new(node_counts: &[usize], primitive_counts: &[usize], instance_count: usize) -> Self {
        assert!(node_counts.len() == primitive_counts.len());
        MeshLayout {
            root_offsets: running_sums(node_counts),
            primitive_bases: running_sums(primitive_counts),
            instance_count,
        }
    }

    /// Layout for a set of mesh trees, in order.
    pub fn of(bottoms: &[Bvh], instance_count: usize) -> Self {
        let node_counts: Vec<_> = bottoms.iter().map(Bvh::node_count).collect();
        let primitive_counts: Vec<_> = bottoms.iter().map(Bvh::primitive_count).collect();
        MeshLayout::new(&node_counts, &primitive_counts, instance_count)
    }

    pub fn mesh_count(&self) -> usize {
        self.root_offsets.len() - 1
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    pub fn root_offset(&self, mesh_index: usize) -> usize {
        assert!(mesh_index < self.mesh_count());
        self.root_offsets[mesh_index]
    }

    pub fn node_count(&self, mesh_index: usize) -> usize {
        self.root_offsets[mesh_index + 1] - self.root_offsets[mesh_index]
    }

    pub fn primitive_base(&self, mesh_index: usize) -> usize {
        assert!(mesh_index < self.mesh_count());
        self.primitive_bases[mesh_index]
    }

    pub fn primitive_count(&self, mesh_index: usize) -> usize {
        self.primitive_bases[mesh_index + 1] - self.primitive_bases[mesh_index]
    }

    /// Number of primitives of all meshes together.
    pub fn total_primitive_count(&self) -> usize {
        self.primitive_bases.last().copied().unwrap_or(0)
    }

    /// First slot after all mesh trees.
    pub fn top_offset(&self) -> usize {
        self.root_offsets.last().copied().unwrap_or(0)
    }

    /// Slots reserved for the instance tree. A binary tree with K leaves has 2K-1 nodes.
    pub fn top_capacity(&self) -> usize {
        2 * self.instance_count
    }

    pub fn total_len(&self) -> usize {
        self.top_offset() + self.top_capacity()
    }

    /// Mesh whose node region contains `node`, if any.
    pub fn mesh_of_node(&self, node: usize) -> Option<usize> {
        if node >= self.top_offset() {
            return None;
        }
        Some(self.root_offsets.partition_point(|offset| *offset <= node) - 1)
    }

    /// Returns true if `node` is the root of some mesh tree.
    pub fn is_bottom_root(&self, node: usize) -> bool {
        node < self.top_offset() && self.root_offsets.binary_search(&node).is_ok()
    }
}

fn running_sums(counts: &[usize]) -> Vec<usize> {
    std::iter::once(0)
        .chain(counts.iter().scan(0, |sum, count| {
            *sum += count;
            Some(*sum)
        }))
        .collect()
}
