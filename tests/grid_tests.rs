//! Integration coverage for `NeighborGrid` beyond its own unit tests:
//! `within` idempotence and the `self`-subset superset invariant.

use molcore::grid::NeighborGrid;
use molcore::pbc::{PeriodicBox, ALL_DIMS};

fn open_box() -> PeriodicBox {
    PeriodicBox::new([[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]])
}

#[test]
fn within_is_idempotent_on_repeated_evaluation() {
    let pbc = open_box();
    let coords = vec![[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [5.0, 0.0, 0.0]];
    let grid = NeighborGrid::build(&coords, &pbc, 0.6, ALL_DIMS);
    let candidates = [0, 1, 2];
    let source = [0];

    let first = grid.within(&coords, &source, &candidates, false);
    let second = grid.within(&coords, &source, &candidates, false);
    assert_eq!(first, second);
    assert_eq!(first, vec![1]);
}

#[test]
fn within_self_is_superset_of_source_when_source_is_within_candidates() {
    let pbc = open_box();
    let coords = vec![[0.0, 0.0, 0.0], [0.3, 0.0, 0.0], [10.0, 0.0, 0.0]];
    let grid = NeighborGrid::build(&coords, &pbc, 0.5, ALL_DIMS);
    let source = [0];
    let candidates = [0, 1, 2];

    let result = grid.within(&coords, &source, &candidates, true);
    for &s in &source {
        assert!(result.contains(&s));
    }
}

#[test]
fn connectivity_groups_count_isolated_atoms_as_singletons() {
    let pbc = open_box();
    let coords = vec![[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [20.0, 0.0, 0.0]];
    let grid = NeighborGrid::build(&coords, &pbc, 0.2, ALL_DIMS);
    let mut groups = grid.connectivity_groups(coords.len());
    groups.sort_by_key(|g| g.len());
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0], vec![2]);
    assert_eq!(groups[1], vec![0, 1]);
}

#[test]
fn pairs_are_symmetric_and_deduplicated() {
    let pbc = open_box();
    let coords = vec![[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [0.15, 0.0, 0.0]];
    let grid = NeighborGrid::build(&coords, &pbc, 0.2, ALL_DIMS);
    let pairs = grid.pairs();
    for &(i, j) in &pairs {
        assert!(i < j, "pairs must be reported with i < j exactly once");
    }
}
