use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use splat_buffer::{SplatBuffer, SplatRecord};
use splat_render_engine::engine::spatial::SplatTree;
use std::collections::HashSet;

fn random_buffer(count: usize) -> SplatBuffer {
    let mut rng = StdRng::seed_from_u64(11);
    let mut buffer = SplatBuffer::unbucketed(count);
    for index in 0..count {
        let position = Vec3::new(
            rng.gen_range(-100.0..100.0),
            rng.gen_range(0.0..20.0),
            rng.gen_range(-100.0..100.0),
        );
        let alpha = rng.gen_range(0..=255u8);
        buffer.set_splat(
            index,
            &SplatRecord::new(position, Vec3::splat(0.1), Quat::IDENTITY, [255, 255, 255, alpha]),
        );
    }
    buffer
}

fn leaf_indexes(tree: &SplatTree) -> Vec<u32> {
    let mut all = Vec::new();
    tree.visit_leaves(|leaf| all.extend_from_slice(&leaf.indexes));
    all
}

#[test]
fn leaves_cover_the_included_set_exactly_once() {
    let buffer = random_buffer(8_000);
    let predicates: [(&str, Box<dyn Fn(usize) -> bool + '_>); 3] = [
        ("all", Box::new(|_| true)),
        ("alpha", Box::new(|i| buffer.get_color(i)[3] > 1)),
        ("every third", Box::new(|i| i % 3 == 0)),
    ];

    for (name, include) in predicates {
        let mut tree = SplatTree::new(10, 200);
        tree.build(&buffer, &include);

        let leaves = leaf_indexes(&tree);
        let unique: HashSet<u32> = leaves.iter().copied().collect();
        assert_eq!(unique.len(), leaves.len(), "{}: duplicate leaf entries", name);

        let expected: HashSet<u32> = (0..8_000u32).filter(|&i| include(i as usize)).collect();
        assert_eq!(unique, expected, "{}: leaf union differs", name);
        assert_eq!(tree.included_count(), expected.len());
    }
}

#[test]
fn traversal_is_restartable() {
    let buffer = random_buffer(2_000);
    let mut tree = SplatTree::new(10, 100);
    tree.build(&buffer, |_| true);
    assert_eq!(leaf_indexes(&tree), leaf_indexes(&tree));
    assert_eq!(tree.count_leaves(), tree.count_leaves());
}

#[test]
fn nothing_included_means_no_leaves() {
    let buffer = random_buffer(100);
    let mut tree = SplatTree::new(10, 500);
    tree.build(&buffer, |_| false);
    assert_eq!(tree.count_leaves(), 0);
    assert!(leaf_indexes(&tree).is_empty());
    assert!(tree.root().is_some());
}
