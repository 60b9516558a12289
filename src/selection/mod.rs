//! The selection language (grammar, AST, interpreter) and the
//! `Selection` API built on top of it.

pub mod ast;
pub mod grammar;
pub mod interpreter;
pub mod macros;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{MolError, Result};
use crate::geometry::{self, Mat3, Vec3, IDENTITY3};
use crate::grid::NeighborGrid;
use crate::pbc::ALL_DIMS;
use crate::quaternion::Quaternion;
use crate::system::{ChangeKind, Subscription, System, SystemHandle};

use ast::{IndexVec, Node};
use interpreter::EvalContext;

/// A rigid-body transform: rotate by `rotation` then translate by
/// `translation`, i.e. `p' = rotation * p + translation`.
pub type Transform = (Mat3, Vec3);

pub const IDENTITY_TRANSFORM: Transform = (IDENTITY3, [0.0, 0.0, 0.0]);

pub fn apply_point(transform: &Transform, p: Vec3) -> Vec3 {
    geometry::add(geometry::mat_vec(&transform.0, p), transform.1)
}

/// A bound, re-evaluatable view over a subset of a `System`'s atoms.
/// Created from selection-language text; holds
/// a scoped `Subscription` so topology edits mark it dirty instead of
/// leaving it pointing at stale indices.
pub struct Selection {
    system: SystemHandle,
    text: String,
    ast: Node,
    indices: RefCell<IndexVec>,
    frame: Rc<Cell<usize>>,
    dirty: Rc<Cell<bool>>,
    /// The subrange this selection's text was parsed over, if built
    /// with [`Selection::new_within`] rather than [`Selection::new`].
    /// `by`/`same ... as` and bare `index` scope against this, not
    /// against the selection's current result.
    starting_subset: Option<IndexVec>,
    _subscription: Subscription,
}

impl Selection {
    pub fn new(system: SystemHandle, text: &str) -> Result<Selection> {
        Selection::new_scoped(system, text, None)
    }

    /// Parse `text` scoped to `parent_indices`: `all` and bare `index`
    /// resolve relative to this subrange (indices are shifted by
    /// `parent_indices[0]`), and `by`/`same ... as` expand against
    /// `parent_indices` rather than the whole system. Used to build a
    /// selection over a previously-selected subset without re-running
    /// the parent's query text.
    pub fn new_within(system: SystemHandle, text: &str, parent_indices: &[usize]) -> Result<Selection> {
        Selection::new_scoped(system, text, Some(sorted_unique(parent_indices.to_vec())))
    }

    fn new_scoped(system: SystemHandle, text: &str, starting_subset: Option<IndexVec>) -> Result<Selection> {
        let expanded = macros::expand(text);
        let parsed = grammar::Parser::parse(&expanded)?;
        let optimized = parsed.optimize();

        let frame = Rc::new(Cell::new(0usize));
        let dirty = Rc::new(Cell::new(true));
        let frame_handle = frame.clone();
        let dirty_handle = dirty.clone();
        let subscription = system.borrow().subscribe(move |kind| match kind {
            ChangeKind::FramesDeleted(_) => frame_handle.set(0),
            ChangeKind::FrameChangeRequested(f) => frame_handle.set(*f),
            ChangeKind::TopologyChanged | ChangeKind::Cleared => dirty_handle.set(true),
            ChangeKind::CoordsChanged(_) => {}
        });

        let ast_for_precompute = {
            let sys = system.borrow();
            let ctx = EvalContext { system: &sys, frame: frame.get(), starting_subset: starting_subset.as_deref() };
            interpreter::precompute(optimized, &ctx)?
        };

        let sel = Selection {
            system,
            text: expanded,
            ast: ast_for_precompute,
            indices: RefCell::new(Vec::new()),
            frame,
            dirty,
            starting_subset,
            _subscription: subscription,
        };
        sel.refresh()?;
        Ok(sel)
    }

    /// Build a selection directly from an explicit, already-sorted
    /// index list (used internally by splitters); it does not
    /// re-resolve a query text on topology change.
    fn from_indices(system: SystemHandle, indices: IndexVec) -> Selection {
        let frame = Rc::new(Cell::new(0usize));
        let dirty = Rc::new(Cell::new(false));
        let subscription = system.borrow().subscribe(|_| {});
        Selection {
            system,
            text: String::new(),
            ast: Node::new(ast::Kind::Precomputed(indices.clone())),
            indices: RefCell::new(indices),
            frame,
            dirty,
            starting_subset: None,
            _subscription: subscription,
        }
    }

    fn refresh(&self) -> Result<()> {
        let sys = self.system.borrow();
        let ctx = EvalContext { system: &sys, frame: self.frame.get(), starting_subset: self.starting_subset.as_deref() };
        let result = interpreter::eval(&self.ast, &ctx, None)?;
        *self.indices.borrow_mut() = result;
        self.dirty.set(false);
        Ok(())
    }

    fn ensure_fresh(&self) -> Result<()> {
        if self.dirty.get() {
            self.refresh()?;
        }
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_frame(&self, frame: usize) {
        self.frame.set(frame);
    }

    pub fn frame(&self) -> usize {
        self.frame.get()
    }

    pub fn indices(&self) -> Result<IndexVec> {
        self.ensure_fresh()?;
        Ok(self.indices.borrow().clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.indices()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn require_same_len(&self, got: usize) -> Result<usize> {
        let n = self.len()?;
        if n != got {
            return Err(MolError::SizeMismatch { expected: n, got });
        }
        Ok(n)
    }

    // -- attribute get/set, sized to selection length --------------------

    pub fn get_name(&self) -> Result<Vec<String>> {
        let sys = self.system.borrow();
        Ok(self.indices()?.iter().map(|&i| sys.atom(i).name.clone()).collect())
    }

    pub fn set_name(&self, values: &[String]) -> Result<()> {
        self.require_same_len(values.len())?;
        let indices = self.indices()?;
        let mut sys = self.system.borrow_mut();
        for (&i, v) in indices.iter().zip(values) {
            sys.atoms_mut().get_mut(i).name = v.clone();
        }
        Ok(())
    }

    pub fn get_resname(&self) -> Result<Vec<String>> {
        let sys = self.system.borrow();
        Ok(self.indices()?.iter().map(|&i| sys.atom(i).resname.clone()).collect())
    }

    pub fn set_resname(&self, values: &[String]) -> Result<()> {
        self.require_same_len(values.len())?;
        let indices = self.indices()?;
        let mut sys = self.system.borrow_mut();
        for (&i, v) in indices.iter().zip(values) {
            sys.atoms_mut().get_mut(i).resname = v.clone();
        }
        Ok(())
    }

    pub fn get_beta(&self) -> Result<Vec<f64>> {
        let sys = self.system.borrow();
        Ok(self.indices()?.iter().map(|&i| sys.atom(i).beta).collect())
    }

    pub fn set_beta(&self, values: &[f64]) -> Result<()> {
        self.require_same_len(values.len())?;
        let indices = self.indices()?;
        let mut sys = self.system.borrow_mut();
        for (&i, &v) in indices.iter().zip(values) {
            sys.atoms_mut().get_mut(i).beta = v;
        }
        Ok(())
    }

    pub fn get_occupancy(&self) -> Result<Vec<f64>> {
        let sys = self.system.borrow();
        Ok(self.indices()?.iter().map(|&i| sys.atom(i).occupancy).collect())
    }

    pub fn set_occupancy(&self, values: &[f64]) -> Result<()> {
        self.require_same_len(values.len())?;
        let indices = self.indices()?;
        let mut sys = self.system.borrow_mut();
        for (&i, &v) in indices.iter().zip(values) {
            sys.atoms_mut().get_mut(i).occupancy = v;
        }
        Ok(())
    }

    // -- coordinate accessors --------------------------------------------

    pub fn x(&self, i: usize) -> Result<f64> {
        Ok(self.xyz(i)?[0])
    }
    pub fn y(&self, i: usize) -> Result<f64> {
        Ok(self.xyz(i)?[1])
    }
    pub fn z(&self, i: usize) -> Result<f64> {
        Ok(self.xyz(i)?[2])
    }

    pub fn xyz(&self, i: usize) -> Result<Vec3> {
        self.xyz_at(i, self.frame.get())
    }

    pub fn xyz_at(&self, i: usize, frame: usize) -> Result<Vec3> {
        let indices = self.indices()?;
        let atom = *indices.get(i).ok_or(MolError::IndexError { got: i as i64, range: 0..indices.len() as i64 })?;
        self.system.borrow().frame(frame)?.xyz(atom)
    }

    pub fn set_xyz(&self, i: usize, value: Vec3) -> Result<()> {
        let indices = self.indices()?;
        let atom = *indices.get(i).ok_or(MolError::IndexError { got: i as i64, range: 0..indices.len() as i64 })?;
        self.system.borrow_mut().frame_mut(self.frame.get())?.set_xyz(atom, value)
    }

    // -- structural operations --------------------------------------------

    pub fn center(&self, mass_weighted: bool, pbc: bool) -> Result<Vec3> {
        let sys = self.system.borrow();
        let ctx = EvalContext { system: &sys, frame: self.frame.get(), starting_subset: self.starting_subset.as_deref() };
        let indices = self.indices()?;
        interpreter::center_of(&ctx, &indices, mass_weighted, ast::PbcSpec { enabled: pbc, dims: ALL_DIMS })
    }

    pub fn minmax(&self) -> Result<(Vec3, Vec3)> {
        let indices = self.indices()?;
        if indices.is_empty() {
            return Ok(([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]));
        }
        let sys = self.system.borrow();
        let frame = sys.frame(self.frame.get())?;
        let mut lo = frame.xyz(indices[0])?;
        let mut hi = lo;
        for &i in &indices[1..] {
            let p = frame.xyz(i)?;
            for axis in 0..3 {
                lo[axis] = lo[axis].min(p[axis]);
                hi[axis] = hi[axis].max(p[axis]);
            }
        }
        Ok((lo, hi))
    }

    pub fn apply_transform(&self, transform: &Transform) -> Result<()> {
        let indices = self.indices()?;
        let frame_index = self.frame.get();
        let mut sys = self.system.borrow_mut();
        let frame = sys.frame_mut(frame_index)?;
        for &i in &indices {
            let p = frame.xyz(i)?;
            frame.set_xyz(i, apply_point(transform, p))?;
        }
        Ok(())
    }

    pub fn translate(&self, shift: Vec3) -> Result<()> {
        self.apply_transform(&(IDENTITY3, shift))
    }

    pub fn rotate(&self, axis: Vec3, angle: f64, pivot: Vec3) -> Result<()> {
        if geometry::norm(axis) == 0.0 {
            return Err(MolError::EvaluationError { node: "rotate".to_string(), message: "rotation axis must be non-zero".to_string() });
        }
        let r = Quaternion::from_axis_angle(axis, angle).to_matrix();
        let translation = geometry::sub(pivot, geometry::mat_vec(&r, pivot));
        self.apply_transform(&(r, translation))
    }

    pub fn rotate_matrix(&self, matrix: Mat3, pivot: Vec3) -> Result<()> {
        let translation = geometry::sub(pivot, geometry::mat_vec(&matrix, pivot));
        self.apply_transform(&(matrix, translation))
    }

    /// The Kabsch-equivalent rigid transform aligning `self` onto
    /// `target`, via Horn's quaternion method: build the 4x4 symmetric
    /// matrix from the mass-weighted cross-covariance of the centered
    /// coordinate sets, and take its dominant eigenvector (by power
    /// iteration) as the optimal rotation quaternion.
    pub fn fit_transform(&self, target: &Selection) -> Result<Transform> {
        let self_idx = self.indices()?;
        let target_idx = target.indices()?;
        if self_idx.len() != target_idx.len() {
            return Err(MolError::SizeMismatch { expected: self_idx.len(), got: target_idx.len() });
        }
        let cm_self = self.center(true, false)?;
        let cm_target = target.center(true, false)?;

        let sys_self = self.system.borrow();
        let sys_target = target.system.borrow();
        let frame_self = sys_self.frame(self.frame.get())?;
        let frame_target = sys_target.frame(target.frame.get())?;

        let mut h = [[0.0f64; 3]; 3];
        for (&a, &b) in self_idx.iter().zip(target_idx.iter()) {
            let mass = sys_self.atom(a).mass.max(0.0);
            let w = if mass > 0.0 { mass } else { 1.0 };
            let p = geometry::sub(frame_self.xyz(a)?, cm_self);
            let q = geometry::sub(frame_target.xyz(b)?, cm_target);
            for r in 0..3 {
                for c in 0..3 {
                    h[r][c] += w * p[r] * q[c];
                }
            }
        }

        let quat = dominant_quaternion(h);
        let rotation = quat.to_matrix();
        let translation = geometry::sub(cm_target, geometry::mat_vec(&rotation, cm_self));
        Ok((rotation, translation))
    }

    pub fn fit(&self, target: &Selection) -> Result<()> {
        let transform = self.fit_transform(target)?;
        self.apply_transform(&transform)
    }

    pub fn rmsd_to(&self, other: &Selection) -> Result<f64> {
        let self_idx = self.indices()?;
        let other_idx = other.indices()?;
        self.require_same_len(other_idx.len())?;
        let sys_self = self.system.borrow();
        let sys_other = other.system.borrow();
        let frame_self = sys_self.frame(self.frame.get())?;
        let frame_other = sys_other.frame(other.frame.get())?;
        let mut sum = 0.0;
        for (&a, &b) in self_idx.iter().zip(other_idx.iter()) {
            sum += geometry::distance(frame_self.xyz(a)?, frame_other.xyz(b)?).powi(2);
        }
        Ok((sum / self_idx.len().max(1) as f64).sqrt())
    }

    pub fn rmsd_frames(&self, fr1: usize, fr2: usize) -> Result<f64> {
        let indices = self.indices()?;
        let sys = self.system.borrow();
        let frame1 = sys.frame(fr1)?;
        let frame2 = sys.frame(fr2)?;
        let mut sum = 0.0;
        for &i in &indices {
            sum += geometry::distance(frame1.xyz(i)?, frame2.xyz(i)?).powi(2);
        }
        Ok((sum / indices.len().max(1) as f64).sqrt())
    }

    /// Fit each frame in `[b, e)` onto `reference` (evaluated at its
    /// own current frame), mutating this selection's coordinates in
    /// every fitted frame in place.
    pub fn fit_trajectory(&self, reference: &Selection, b: usize, e: usize) -> Result<()> {
        let saved_frame = self.frame.get();
        for f in b..e {
            self.set_frame(f);
            self.fit(reference)?;
        }
        self.set_frame(saved_frame);
        Ok(())
    }

    pub fn split_by_connectivity(&self, cutoff: f64) -> Result<Vec<Selection>> {
        let indices = self.indices()?;
        let sys = self.system.borrow();
        let frame = sys.frame(self.frame.get())?;
        let coords: Vec<Vec3> = indices.iter().map(|&i| frame.coords[i]).collect();
        let pbc = frame.pbc();
        let grid = NeighborGrid::build(&coords, &pbc, cutoff, ALL_DIMS);
        let groups = grid.connectivity_groups(coords.len());
        Ok(groups
            .into_iter()
            .map(|local| {
                let global: IndexVec = local.into_iter().map(|l| indices[l]).collect();
                Selection::from_indices(self.system.clone(), global)
            })
            .collect())
    }

    pub fn each_residue(&self) -> Result<Vec<Selection>> {
        let indices = self.indices()?;
        let mut groups: std::collections::BTreeMap<usize, Vec<usize>> = std::collections::BTreeMap::new();
        {
            let sys = self.system.borrow();
            for &i in &indices {
                groups.entry(sys.atom(i).resindex).or_default().push(i);
            }
        }
        Ok(groups.into_values().map(|g| Selection::from_indices(self.system.clone(), g)).collect())
    }

    pub fn atoms_dup(&self) -> Result<Vec<usize>> {
        let indices = self.indices()?;
        Ok(self.system.borrow_mut().atoms_dup(&indices))
    }

    pub fn atoms_delete(&self) -> Result<()> {
        let indices = self.indices()?;
        self.system.borrow_mut().atoms_delete(&indices);
        *self.indices.borrow_mut() = Vec::new();
        Ok(())
    }

    /// Create `n - 1` additional shifted copies of this selection's
    /// atoms, the k-th copy translated by `k * shift`.
    pub fn distribute(&self, n: usize, shift: Vec3) -> Result<()> {
        for k in 1..n {
            let new_indices = self.atoms_dup()?;
            let copy = Selection::from_indices(self.system.clone(), sorted_unique(new_indices));
            copy.set_frame(self.frame.get());
            copy.translate(geometry::scale(shift, k as f64))?;
        }
        Ok(())
    }

    /// Write frames `[b, e)` to `path` through a registered
    /// [`crate::io::FileWriter`] adapter resolved by extension. This
    /// crate ships no concrete codec, so this always fails with
    /// `IoError` unless the caller uses [`Selection::write_with`]
    /// with an adapter of their own.
    pub fn write(&self, path: &str, _b: usize, _e: usize) -> Result<()> {
        Err(MolError::IoError { path: path.to_string(), detail: "no writer adapter registered for this extension".to_string() })
    }

    pub fn write_with(&self, writer: &mut dyn crate::io::FileWriter, b: usize, e: usize) -> Result<()> {
        crate::io::write_frames(writer, self, b, e)
    }
}

fn sorted_unique(v: Vec<usize>) -> IndexVec {
    ast::sorted_unique(v)
}

/// Build the Horn (1987) 4x4 matrix from the 3x3 cross-covariance `h`
/// and return its dominant eigenvector (as a rotation quaternion) via
/// power iteration; converges quickly since the spectral gap for a
/// well-posed fit is generically nonzero.
fn dominant_quaternion(h: [[f64; 3]; 3]) -> Quaternion {
    let n = [
        [
            h[0][0] + h[1][1] + h[2][2],
            h[1][2] - h[2][1],
            h[2][0] - h[0][2],
            h[0][1] - h[1][0],
        ],
        [
            h[1][2] - h[2][1],
            h[0][0] - h[1][1] - h[2][2],
            h[0][1] + h[1][0],
            h[2][0] + h[0][2],
        ],
        [
            h[2][0] - h[0][2],
            h[0][1] + h[1][0],
            -h[0][0] + h[1][1] - h[2][2],
            h[1][2] + h[2][1],
        ],
        [
            h[0][1] - h[1][0],
            h[2][0] + h[0][2],
            h[1][2] + h[2][1],
            -h[0][0] - h[1][1] + h[2][2],
        ],
    ];

    let mut v = [1.0, 0.0, 0.0, 0.0];
    for _ in 0..200 {
        let mut next = [0.0; 4];
        for r in 0..4 {
            for c in 0..4 {
                next[r] += n[r][c] * v[c];
            }
        }
        let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm < 1e-15 {
            break;
        }
        for x in next.iter_mut() {
            *x /= norm;
        }
        v = next;
    }
    Quaternion::new(v[0], v[1], v[2], v[3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::geometry::IDENTITY3;
    use crate::frame::Frame;

    fn sample_system() -> SystemHandle {
        let mut sys = System::new();
        let mut atoms = vec![
            Atom::new("CA", "ALA", 1, 'A'),
            Atom::new("CB", "ALA", 1, 'A'),
            Atom::new("N", "GLY", 2, 'A'),
            Atom::new("C", "GLY", 2, 'A'),
        ];
        atoms[0].beta = 0.0;
        atoms[1].beta = 10.0;
        atoms[2].beta = 25.0;
        atoms[3].beta = 100.0;
        for a in atoms {
            sys.atoms_mut().push(a);
        }
        sys.atoms_mut().assign_resindex();
        sys.frame_append(Frame::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0]],
            IDENTITY3,
            0.0,
        ))
        .unwrap();
        sys.into_handle()
    }

    #[test]
    fn all_selects_every_atom() {
        let sys = sample_system();
        let sel = Selection::new(sys, "all").unwrap();
        assert_eq!(sel.indices().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn chained_comparison_matches_scenario() {
        let sys = sample_system();
        let sel = Selection::new(sys, "0 < beta < 30").unwrap();
        assert_eq!(sel.indices().unwrap(), vec![1, 2]);
    }

    #[test]
    fn by_residue_expands_to_full_residues() {
        let sys = sample_system();
        let sel = Selection::new(sys, "by residue (index 1)").unwrap();
        assert_eq!(sel.indices().unwrap(), vec![0, 1]);
    }

    #[test]
    fn macro_expansion_selects_acidic_names() {
        let sys = System::new().into_handle();
        {
            let mut s = sys.borrow_mut();
            s.atoms_mut().push(Atom::new("CA", "ASP", 1, 'A'));
            s.atoms_mut().push(Atom::new("CA", "LYS", 2, 'A'));
            s.frame_append(Frame::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], IDENTITY3, 0.0)).unwrap();
        }
        let sel = Selection::new(sys, "acidic").unwrap();
        assert_eq!(sel.indices().unwrap(), vec![0]);
    }

    #[test]
    fn fit_transform_identity_for_self() {
        let sys = sample_system();
        let a = Selection::new(sys.clone(), "index 0 1 2 3").unwrap();
        let b = Selection::new(sys, "index 0 1 2 3").unwrap();
        let (rotation, translation) = a.fit_transform(&b).unwrap();
        for r in 0..3 {
            assert!((translation[r]).abs() < 1e-6);
            for c in 0..3 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((rotation[r][c] - expected).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn fit_reduces_or_preserves_rmsd() {
        let sys_a = sample_system();
        let sys_b = sample_system();
        {
            let mut s = sys_b.borrow_mut();
            s.frame_mut(0).unwrap().set_xyz(0, [0.1, 0.2, -0.1]).unwrap();
            s.frame_mut(0).unwrap().set_xyz(1, [1.2, -0.1, 0.2]).unwrap();
        }
        let a = Selection::new(sys_a, "all").unwrap();
        let b = Selection::new(sys_b, "all").unwrap();
        let before = a.rmsd_to(&b).unwrap();
        a.fit(&b).unwrap();
        let after = a.rmsd_to(&b).unwrap();
        assert!(after <= before + 1e-9);
    }

    #[test]
    fn new_within_shifts_bare_index_by_the_subrange_start() {
        let sys = sample_system();
        let sel = Selection::new_within(sys, "index 0 1", &[2, 3]).unwrap();
        assert_eq!(sel.indices().unwrap(), vec![2, 3]);
    }

    #[test]
    fn new_within_scopes_by_residue_to_the_starting_subset() {
        let mut sys = System::new();
        for (name, resid) in [("N", 1), ("CA", 1), ("C", 1), ("N", 2), ("CA", 2)] {
            sys.atoms_mut().push(Atom::new(name, "RES", resid, 'A'));
        }
        sys.atoms_mut().assign_resindex();
        let coords: Vec<_> = (0..5).map(|i| [i as f64, 0.0, 0.0]).collect();
        sys.frame_append(Frame::new(coords, IDENTITY3, 0.0)).unwrap();
        let handle = sys.into_handle();

        // The parent subset excludes atom 2 (residue 1's "C"); `by
        // residue` over this subrange must not pull it back in even
        // though it shares a residue with atom 0/1.
        let sel = Selection::new_within(handle, "by residue (index 0)", &[0, 1, 3, 4]).unwrap();
        assert_eq!(sel.indices().unwrap(), vec![0, 1]);
    }

    #[test]
    fn split_by_connectivity_sizes() {
        let mut sys = System::new();
        for i in 0..10 {
            sys.atoms_mut().push(Atom::new("X", "RES", i, 'A'));
        }
        sys.atoms_mut().assign_resindex();
        let coords = vec![
            [0.0, 0.0, 0.0],
            [0.1, 0.0, 0.0],
            [0.0, 0.1, 0.0],
            [5.0, 0.0, 0.0],
            [5.1, 0.0, 0.0],
            [5.0, 0.1, 0.0],
            [10.0, 0.0, 0.0],
            [10.15, 0.0, 0.0],
            [10.30, 0.0, 0.0],
            [10.45, 0.0, 0.0],
        ];
        sys.frame_append(Frame::new(coords, IDENTITY3, 0.0)).unwrap();
        let handle = sys.into_handle();
        let sel = Selection::new(handle, "all").unwrap();
        let mut groups = sel.split_by_connectivity(0.2).unwrap();
        groups.sort_by_key(|g| g.len().unwrap());
        let sizes: Vec<usize> = groups.iter().map(|g| g.len().unwrap()).collect();
        assert_eq!(sizes, vec![3, 3, 4]);
    }
}
