//! Integration coverage for the selection language end to end: parse,
//! macro expansion, regex name matching, and within-with-PBC queries.

use molcore::atom::Atom;
use molcore::frame::Frame;
use molcore::geometry::IDENTITY3;
use molcore::system::System;
use molcore::Selection;

fn push_atom(sys: &mut System, name: &str, resname: &str, resid: i32) {
    sys.atoms_mut().push(Atom::new(name, resname, resid, 'A'));
}

#[test]
fn regex_keyword_matches_prefix_names() {
    let mut sys = System::new();
    for name in ["CA", "CB", "C", "N", "OXT"] {
        push_atom(&mut sys, name, "RES", 1);
    }
    sys.atoms_mut().assign_resindex();
    let coords: Vec<_> = (0..5).map(|i| [i as f64, 0.0, 0.0]).collect();
    sys.frame_append(Frame::new(coords, IDENTITY3, 0.0)).unwrap();

    let handle = sys.into_handle();
    let sel = Selection::new(handle, "name \"C.*\"").unwrap();
    assert_eq!(sel.indices().unwrap(), vec![0, 1, 2]);
}

#[test]
fn within_pbc_wraps_across_box_boundary() {
    let mut sys = System::new();
    push_atom(&mut sys, "A1", "RES", 1);
    push_atom(&mut sys, "A2", "RES", 1);
    sys.atoms_mut().assign_resindex();

    let cubic = [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]];
    sys.frame_append(Frame::new(vec![[0.1, 1.0, 1.0], [1.9, 1.0, 1.0]], cubic, 0.0)).unwrap();

    let handle = sys.into_handle();
    let without_self = Selection::new(handle.clone(), "within 0.3 pbc of index 0").unwrap();
    let indices = without_self.indices().unwrap();
    assert!(indices.contains(&1));
    assert!(!indices.contains(&0));

    let with_self = Selection::new(handle, "within 0.3 pbc self of index 0").unwrap();
    let indices = with_self.indices().unwrap();
    assert!(indices.contains(&0));
    assert!(indices.contains(&1));
}

#[test]
fn by_residue_expands_non_contiguous_indices() {
    let mut sys = System::new();
    // R1 = {0,1,2}, R2 = {3,4}, R3 = {5,6,7}
    for (name, resid) in [("N", 1), ("CA", 1), ("C", 1), ("N", 2), ("CA", 2), ("N", 3), ("CA", 3), ("C", 3)] {
        push_atom(&mut sys, name, "RES", resid);
    }
    sys.atoms_mut().assign_resindex();
    let coords: Vec<_> = (0..8).map(|i| [i as f64, 0.0, 0.0]).collect();
    sys.frame_append(Frame::new(coords, IDENTITY3, 0.0)).unwrap();

    let handle = sys.into_handle();
    let sel = Selection::new(handle, "by residue (index 1 4)").unwrap();
    assert_eq!(sel.indices().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn three_point_plane_normal_is_resolved_for_literal_points() {
    let mut sys = System::new();
    for _ in 0..2 {
        push_atom(&mut sys, "X", "RES", 1);
    }
    sys.atoms_mut().assign_resindex();
    // Plane through (0,0,0)/(0,1,0)/(0,0,1) is the y-z plane (x=0).
    // Atom 0 lies in it; atom 1 is 3 units off it.
    sys.frame_append(Frame::new(vec![[0.0, 5.0, 5.0], [3.0, 0.0, 0.0]], IDENTITY3, 0.0)).unwrap();

    let handle = sys.into_handle();
    let sel = Selection::new(handle, "dist from plane point 0 0 0 0 1 0 0 0 1 < 0.1").unwrap();
    assert_eq!(sel.indices().unwrap(), vec![0]);
}

#[test]
fn three_point_plane_normal_is_resolved_per_frame_for_index_points() {
    let mut sys = System::new();
    for _ in 0..5 {
        push_atom(&mut sys, "X", "RES", 1);
    }
    sys.atoms_mut().assign_resindex();
    // Atoms 0/1/2 define the same y-z plane as above, but through
    // `index` rather than float literals, so the normal can only be
    // known by evaluating the three atoms' current coordinates. Atoms
    // 0/1/2 (the plane's own defining points) and atom 3 all lie in
    // the plane; atom 4 is 3 units off it.
    let coords = vec![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 5.0, 5.0], [3.0, 0.0, 0.0]];
    sys.frame_append(Frame::new(coords, IDENTITY3, 0.0)).unwrap();

    let handle = sys.into_handle();
    let sel = Selection::new(handle, "dist from plane point index 0 index 1 index 2 < 0.1").unwrap();
    assert_eq!(sel.indices().unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn set_xyz_is_visible_through_a_second_selection() {
    let mut sys = System::new();
    push_atom(&mut sys, "CA", "ALA", 1);
    sys.atoms_mut().assign_resindex();
    sys.frame_append(Frame::new(vec![[0.0, 0.0, 0.0]], IDENTITY3, 0.0)).unwrap();

    let handle = sys.into_handle();
    let writer = Selection::new(handle.clone(), "all").unwrap();
    writer.set_xyz(0, [1.0, 2.0, 3.0]).unwrap();

    let reader = Selection::new(handle, "all").unwrap();
    assert_eq!(reader.xyz(0).unwrap(), [1.0, 2.0, 3.0]);
}
