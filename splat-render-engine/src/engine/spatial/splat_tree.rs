use glam::Vec3;
use splat_buffer::{SplatBounds, SplatBuffer};

/// One octree node. Interior nodes hold no indexes.
#[derive(Debug, Clone)]
pub struct SplatTreeNode {
    pub id: usize,
    pub depth: u32,
    pub bounds: SplatBounds,
    pub center: Vec3,
    pub children: Vec<SplatTreeNode>,
    pub indexes: Vec<u32>,
}

impl SplatTreeNode {
    fn new(id: usize, depth: u32, bounds: SplatBounds) -> Self {
        Self {
            id,
            depth,
            bounds,
            center: bounds.center(),
            children: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// World space extent of the node, `|max - min|`.
    pub fn size(&self) -> f32 {
        self.bounds.dimensions().length()
    }
}

/// Octree of splat indexes built from a buffer and an inclusion predicate.
#[derive(Debug, Clone)]
pub struct SplatTree {
    max_depth: u32,
    max_indexes_per_node: usize,
    root: Option<SplatTreeNode>,
    node_count: usize,
    included_count: usize,
}

impl SplatTree {
    pub fn new(max_depth: u32, max_indexes_per_node: usize) -> Self {
        Self {
            max_depth,
            max_indexes_per_node: max_indexes_per_node.max(1),
            root: None,
            node_count: 0,
            included_count: 0,
        }
    }

    /// Partition every splat accepted by `include` into leaves.
    /// Replaces any previous contents.
    pub fn build(&mut self, buffer: &SplatBuffer, include: impl Fn(usize) -> bool) {
        let mut positions = Vec::new();
        let mut indexes = Vec::new();
        for index in 0..buffer.splat_count() {
            if include(index) {
                indexes.push(index as u32);
                positions.push(buffer.get_position(index));
            }
        }
        self.build_from_positions(&positions, indexes);
    }

    /// Build over explicit positions; `indexes[i]` names `positions[i]`.
    pub fn build_from_positions(&mut self, positions: &[Vec3], indexes: Vec<u32>) {
        assert_eq!(positions.len(), indexes.len(), "one position per index");
        let mut bounds = SplatBounds::new();
        for &position in positions {
            bounds.update(position);
        }

        self.node_count = 0;
        self.included_count = indexes.len();
        if indexes.is_empty() {
            // Degenerate root: no children and nothing to visit.
            self.root = Some(SplatTreeNode::new(0, 0, SplatBounds::from_corners(Vec3::ZERO, Vec3::ZERO)));
            self.node_count = 1;
            tracing::debug!("Built empty splat tree");
            return;
        }

        let slots: Vec<usize> = (0..indexes.len()).collect();
        let root = self.subdivide(positions, &indexes, slots, bounds, 0);
        self.root = Some(root);
        tracing::debug!(
            "Built splat tree: {} splats, {} nodes, {} leaves",
            self.included_count,
            self.node_count,
            self.count_leaves()
        );
    }

    fn next_id(&mut self) -> usize {
        let id = self.node_count;
        self.node_count += 1;
        id
    }

    fn subdivide(
        &mut self,
        positions: &[Vec3],
        indexes: &[u32],
        slots: Vec<usize>,
        bounds: SplatBounds,
        depth: u32,
    ) -> SplatTreeNode {
        let mut node = SplatTreeNode::new(self.next_id(), depth, bounds);
        if slots.len() < self.max_indexes_per_node || depth >= self.max_depth {
            node.indexes = slots.iter().map(|&slot| indexes[slot]).collect();
            return node;
        }

        let octants = octant_bounds(&bounds);
        let mut buckets: [Vec<usize>; 8] = Default::default();
        for slot in slots {
            let position = positions[slot];
            let octant = octants
                .iter()
                .position(|b| b.contains_point(position))
                .unwrap_or(0);
            buckets[octant].push(slot);
        }

        for (octant, bucket) in buckets.into_iter().enumerate() {
            let child = self.subdivide(positions, indexes, bucket, octants[octant], depth + 1);
            node.children.push(child);
        }
        node
    }

    pub fn root(&self) -> Option<&SplatTreeNode> {
        self.root.as_ref()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of indexes the predicate accepted.
    pub fn included_count(&self) -> usize {
        self.included_count
    }

    /// Call `visitor` on every leaf in pre-order. An empty tree visits nothing.
    pub fn visit_leaves<'a>(&'a self, mut visitor: impl FnMut(&'a SplatTreeNode)) {
        let Some(root) = &self.root else {
            return;
        };
        if self.included_count == 0 {
            return;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                visitor(node);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
    }

    pub fn count_leaves(&self) -> usize {
        let mut count = 0;
        self.visit_leaves(|_| count += 1);
        count
    }
}

/// Child bounds split at the midpoint; bit 0 selects high x, bit 1 high y,
/// bit 2 high z.
fn octant_bounds(bounds: &SplatBounds) -> [SplatBounds; 8] {
    let mid = bounds.center();
    std::array::from_fn(|i| {
        let pick = |bit: usize, axis: usize| {
            if i & bit != 0 {
                (mid[axis], bounds.max[axis])
            } else {
                (bounds.min[axis], mid[axis])
            }
        };
        let (x0, x1) = pick(1, 0);
        let (y0, y1) = pick(2, 1);
        let (z0, z1) = pick(4, 2);
        SplatBounds::from_corners(Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_positions(count: usize, seed: u64) -> Vec<Vec3> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                Vec3::new(
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-50.0..50.0),
                )
            })
            .collect()
    }

    fn collect_leaf_indexes(tree: &SplatTree) -> Vec<u32> {
        let mut all = Vec::new();
        tree.visit_leaves(|leaf| all.extend_from_slice(&leaf.indexes));
        all
    }

    #[test]
    fn leaves_partition_the_included_set() {
        let positions = random_positions(5_000, 3);
        let indexes: Vec<u32> = (0..5_000).collect();
        let mut tree = SplatTree::new(10, 100);
        tree.build_from_positions(&positions, indexes);

        let mut all = collect_leaf_indexes(&tree);
        all.sort_unstable();
        assert_eq!(all, (0..5_000).collect::<Vec<u32>>());
        assert!(tree.count_leaves() > 1);
    }

    #[test]
    fn leaves_respect_capacity_until_max_depth() {
        let positions = random_positions(2_000, 9);
        let mut tree = SplatTree::new(10, 64);
        tree.build_from_positions(&positions, (0..2_000).collect());
        tree.visit_leaves(|leaf| {
            assert!(leaf.indexes.len() < 64 || leaf.depth >= 10);
            for &index in &leaf.indexes {
                assert!(leaf.bounds.contains_point(positions[index as usize]));
            }
        });
    }

    #[test]
    fn coincident_points_stop_at_max_depth() {
        let positions = vec![Vec3::splat(1.0); 50];
        let mut tree = SplatTree::new(3, 10);
        tree.build_from_positions(&positions, (0..50).collect());

        let mut leaves_with_points = 0;
        tree.visit_leaves(|leaf| {
            if !leaf.indexes.is_empty() {
                leaves_with_points += 1;
                assert_eq!(leaf.depth, 3);
                assert_eq!(leaf.indexes.len(), 50);
            }
        });
        assert_eq!(leaves_with_points, 1);
    }

    #[test]
    fn empty_inclusion_set_yields_no_leaves() {
        let mut tree = SplatTree::new(10, 500);
        tree.build_from_positions(&[], Vec::new());
        assert_eq!(tree.count_leaves(), 0);
        let root = tree.root().unwrap();
        assert!(root.children.is_empty());
        assert!(root.indexes.is_empty());
    }

    #[test]
    fn octants_follow_bit_order() {
        let bounds = SplatBounds::from_corners(Vec3::ZERO, Vec3::splat(2.0));
        let octants = octant_bounds(&bounds);
        assert_eq!(octants[0].max, Vec3::ONE);
        assert_eq!(octants[1].min, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(octants[6].min, Vec3::new(0.0, 1.0, 1.0));
        assert_eq!(octants[7].max, Vec3::splat(2.0));
    }
}
