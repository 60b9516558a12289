//! Integration coverage for periodic-box invariants as exposed through
//! `System`, not just the standalone `PeriodicBox`: symmetric distance,
//! to_box/to_lab round trip, wrap bounds for a rectangular box.

use molcore::atom::Atom;
use molcore::frame::Frame;
use molcore::pbc::ALL_DIMS;
use molcore::system::System;

fn cubic_system(edge: f64, points: Vec<[f64; 3]>) -> System {
    let mut sys = System::new();
    for i in 0..points.len() {
        sys.atoms_mut().push(Atom::new("X", "RES", i as i32, 'A'));
    }
    sys.atoms_mut().assign_resindex();
    let edges = [[edge, 0.0, 0.0], [0.0, edge, 0.0], [0.0, 0.0, edge]];
    sys.frame_append(Frame::new(points, edges, 0.0)).unwrap();
    sys
}

#[test]
fn distance_through_system_is_symmetric() {
    let sys = cubic_system(2.0, vec![[0.1, 1.0, 1.0], [1.9, 1.0, 1.0]]);
    let a_to_b = sys.distance(0, 1, 0, true, ALL_DIMS).unwrap();
    let b_to_a = sys.distance(1, 0, 0, true, ALL_DIMS).unwrap();
    assert!((a_to_b - b_to_a).abs() < 1e-9);
    assert!((a_to_b - 0.2).abs() < 1e-6);
}

#[test]
fn wrap_to_box_stays_in_extent() {
    let sys = cubic_system(2.0, vec![[-0.5, 5.5, 2.1]]);
    let wrapped = sys.wrap_to_box(0, [-0.5, 5.5, 2.1], ALL_DIMS).unwrap();
    for v in wrapped {
        assert!((-1e-9..2.0 + 1e-9).contains(&v));
    }
}

#[test]
fn closest_image_round_trips_with_box_coordinates() {
    let sys = cubic_system(2.0, vec![[0.0, 0.0, 0.0]]);
    let frame = sys.frame(0).unwrap();
    let pbc = frame.pbc();
    let p = [0.3, 1.7, 1.999];
    let back = pbc.to_lab(pbc.to_box(p));
    assert!(molcore::geometry::distance(back, p) < 1e-5);
}

#[test]
fn missing_frame_index_is_reported() {
    let sys = cubic_system(2.0, vec![[0.0, 0.0, 0.0]]);
    assert!(sys.distance(0, 0, 5, true, ALL_DIMS).is_err());
}
