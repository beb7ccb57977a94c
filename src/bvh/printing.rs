use std::fmt::Display;

use index_vec::IndexVec;

use crate::util::Stats;

use super::{Bvh, NodeIdx, NodeKind};

#[derive(Clone, Debug, PartialEq)]
pub struct BvhStatistics {
    pub node_count: usize,
    pub node_capacity: usize,
    pub height: usize,
    pub leaf_depth: Stats,
    pub leaf_size: Stats,
}

impl Display for BvhStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Nodes: {} of {}", self.node_count, self.node_capacity)?;
        writeln!(f, "Height: {}", self.height)?;
        writeln!(f, "Leaf depth: {}", self.leaf_depth)?;
        write!(f, "Leaf size: {}", self.leaf_size)
    }
}

impl Bvh {
    pub fn statistics(&self) -> BvhStatistics {
        // Parents precede children, so a single forward pass settles every depth
        let mut depths: IndexVec<NodeIdx, usize> = IndexVec::from_vec(vec![0; self.node_count()]);
        let mut leaf_depth = Stats::default();
        let mut leaf_size = Stats::default();

        for (index, node) in self.nodes().iter_enumerated() {
            match node.kind {
                NodeKind::Internal { left, right } => {
                    depths[left] = depths[index] + 1;
                    depths[right] = depths[index] + 1;
                }
                NodeKind::Leaf { count, .. } => {
                    leaf_depth.add_sample(depths[index]);
                    leaf_size.add_sample(count as usize);
                }
            }
        }

        BvhStatistics {
            node_count: self.node_count(),
            node_capacity: self.node_capacity(),
            height: self.height,
            leaf_depth,
            leaf_size,
        }
    }

    pub fn print_tree(&self) {
        self.print_recursive(0, self.root());
    }

    fn print_recursive(&self, indent: usize, index: NodeIdx) {
        let node = self.node(index);
        println!(
            "{}- {}{}: {:?}-{:?}",
            "  ".repeat(indent),
            if node.is_leaf() { "L" } else { "I" },
            index.index(),
            node.bound.min,
            node.bound.max,
        );

        match node.kind {
            NodeKind::Leaf { first, count } => {
                println!(
                    "{}{:?}",
                    "  ".repeat(indent + 1),
                    self.leaf_primitives(first, count)
                );
            }
            NodeKind::Internal { left, right } => {
                self.print_recursive(indent + 1, left);
                self.print_recursive(indent + 1, right);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{AABB, WorldPoint};

    use assert2::assert;

    #[test]
    fn balanced_tree_statistics() {
        let bounds: Vec<_> = (0..8)
            .map(|i| AABB::from_point(WorldPoint::new(i as f32, 0.0, 0.0)))
            .collect();
        let statistics = Bvh::build(&bounds).statistics();

        assert!(statistics.node_count == 15);
        assert!(statistics.node_capacity == 15);
        assert!(statistics.height == 3);
        assert!(statistics.leaf_depth == {
            let mut expected = Stats::default();
            expected.add_samples([3; 8]);
            expected
        });
        assert!(statistics.leaf_size.min == 1);
        assert!(statistics.leaf_size.max == 1);
        assert!(statistics.leaf_size.count == 8);
    }

    #[test]
    fn statistics_display() {
        let bounds = vec![AABB::from_point(WorldPoint::origin()); 3];
        let output = Bvh::build(&bounds).statistics().to_string();

        assert!(output.contains("Nodes: 1 of 5"));
        assert!(output.contains("Height: 0"));
        assert!(output.contains("Leaf size: 3 - 3"));
    }
}
