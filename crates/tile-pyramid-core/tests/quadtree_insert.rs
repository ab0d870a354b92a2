use std::collections::HashMap;
use tile_pyramid_core::prelude::*;

fn path(s: &str) -> QuadPath {
    s.parse().expect("path")
}

#[test]
fn empty_tree_has_depth_zero() {
    let tree: QuadTree<u32> = QuadTree::new();
    assert_eq!(tree.depth(), 0);
    assert!(tree.is_empty());
    assert!(tree.values().is_empty());
}

#[test]
fn insert_then_depth() {
    let tree = QuadTree::new();
    assert!(tree.insert(&path("1/2/3"), 7).expect("insert"));
    assert!(tree.depth() >= 3);
    assert_eq!(tree.depth(), 3);
    assert!(tree.insert(&path("4"), 8).expect("insert"));
    // shallower leaf elsewhere does not reduce the maximum
    assert_eq!(tree.depth(), 3);
    assert_eq!(tree.len(), 2);
}

#[test]
fn ancestor_leaf_blocks_descendants() {
    let tree = QuadTree::new();
    assert!(tree.insert(&path("2/1"), "coarse").expect("insert"));
    assert!(!tree.insert(&path("2/1/3"), "fine").expect("insert"));
    assert!(!tree.insert(&path("2/1/3/4"), "finer").expect("insert"));
    assert_eq!(tree.values(), vec![(path("2/1"), "coarse")]);
    assert_eq!(tree.depth(), 2);
}

#[test]
fn second_insert_at_same_path_is_rejected() {
    let tree = QuadTree::new();
    assert!(tree.insert(&path("3/3"), 1).expect("insert"));
    assert!(!tree.insert(&path("3/3"), 2).expect("insert"));
    assert_eq!(tree.values(), vec![(path("3/3"), 1)]);
}

#[test]
fn leaf_replaces_internal_subtree() {
    let tree = QuadTree::new();
    for leaf in ["1/1/1", "1/1/2", "1/2"] {
        assert!(tree.insert(&path(leaf), leaf.to_string()).expect("insert"));
    }
    assert_eq!(tree.depth(), 3);
    assert!(tree.insert(&path("1/1"), "merged".to_string()).expect("insert"));
    assert_eq!(tree.depth(), 2);
    assert_eq!(
        tree.values(),
        vec![
            (path("1/1"), "merged".to_string()),
            (path("1/2"), "1/2".to_string()),
        ]
    );
}

#[test]
fn empty_path_is_an_error() {
    let tree = QuadTree::new();
    assert!(matches!(
        tree.insert(&QuadPath::root(), 1),
        Err(PyramidError::EmptyPath)
    ));
    assert!(tree.is_empty());
}

#[test]
fn for_each_value_yields_every_insert_once_in_order() {
    let tree = QuadTree::new();
    let inserted = ["4/4", "1", "2/3/1", "2/1", "3/2/2/2"];
    for (i, p) in inserted.iter().enumerate() {
        assert!(tree.insert(&path(p), i).expect("insert"));
    }

    let mut seen = Vec::new();
    tree.for_each_value(|p, v| seen.push((p.clone(), *v)));
    assert_eq!(seen.len(), inserted.len());

    let order: Vec<String> = seen.iter().map(|(p, _)| p.to_string()).collect();
    assert_eq!(order, vec!["1", "2/1", "2/3/1", "3/2/2/2", "4/4"]);

    let expected: HashMap<QuadPath, usize> = inserted
        .iter()
        .enumerate()
        .map(|(i, p)| (path(p), i))
        .collect();
    for (p, v) in &seen {
        assert_eq!(expected.get(p), Some(v));
    }

    // restartable
    let mut again = 0;
    tree.for_each_value(|_, _| again += 1);
    assert_eq!(again, inserted.len());
}

#[test]
fn for_each_value_at_depth_filters() {
    let tree = QuadTree::new();
    for p in ["1/1", "1/2/3", "2", "4/4/4", "4/1"] {
        assert!(tree.insert(&path(p), p.to_string()).expect("insert"));
    }
    let at_two: Vec<String> = tree
        .values_at_depth(2)
        .into_iter()
        .map(|(_, v)| v)
        .collect();
    assert_eq!(at_two, vec!["1/1", "4/1"]);

    let at_three: Vec<String> = tree
        .values_at_depth(3)
        .into_iter()
        .map(|(_, v)| v)
        .collect();
    assert_eq!(at_three, vec!["1/2/3", "4/4/4"]);

    assert_eq!(tree.values_at_depth(1).len(), 1);
    assert!(tree.values_at_depth(5).is_empty());
}

#[test]
fn debug_string_shows_structure() {
    let tree = QuadTree::new();
    assert!(tree.insert(&path("2"), 42).expect("insert"));
    let s = tree.debug_string();
    assert!(s.starts_with("node["));
    assert!(s.contains("value[42]"));
    assert_eq!(s.matches("empty").count(), 3);
}

#[test]
fn concurrent_inserts_build_the_same_tree() {
    let tree = QuadTree::new();
    let paths = all_possible_paths(3);
    std::thread::scope(|scope| {
        for chunk in paths.chunks(8) {
            let tree = &tree;
            scope.spawn(move || {
                for p in chunk {
                    assert!(tree.insert(p, p.to_string()).expect("insert"));
                    // readers interleave with writers
                    assert!(tree.depth() <= 3);
                }
            });
        }
    });
    assert_eq!(tree.len(), 64);
    assert_eq!(tree.depth(), 3);
    let got: Vec<QuadPath> = tree.values().into_iter().map(|(p, _)| p).collect();
    assert_eq!(got, paths);
}

#[test]
fn concurrent_conflicting_inserts_keep_the_coarse_leaf() {
    // whichever thread wins, the shallower tile ends up covering the region
    for _ in 0..16 {
        let tree = QuadTree::new();
        std::thread::scope(|scope| {
            let t = &tree;
            scope.spawn(move || {
                for p in all_possible_paths(2) {
                    let full = QuadPath::from_indices(&[1, p.indices()[0], p.indices()[1]])
                        .expect("path");
                    let _ = t.insert(&full, "fine").expect("insert");
                }
            });
            scope.spawn(move || {
                let _ = t.insert(&path("1"), "coarse").expect("insert");
            });
        });
        assert_eq!(tree.values(), vec![(path("1"), "coarse")]);
    }
}
