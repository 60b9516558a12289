use std::cell::RefCell;
use std::ops::Range;
use std::rc::{Rc, Weak};

use crate::atom::{Atom, AtomTable};
use crate::error::{MolError, Result};
use crate::frame::Frame;
use crate::geometry::Vec3;
use crate::pbc::{Dims, PeriodicBox};

/// Tagged change notification broadcast by a `System` to its subscribed
/// selections. Re-architected from the original C++ library's
/// signal/slot callback (see DESIGN.md) as a subscriber list of
/// type-erased closures.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    TopologyChanged,
    Cleared,
    FramesDeleted(Range<usize>),
    CoordsChanged(Range<usize>),
    FrameChangeRequested(usize),
}

type Listener = Box<dyn FnMut(&ChangeKind)>;

/// A scoped subscription: dropping it unregisters the listener from the
/// owning `System`, per the Design Notes ("subscription is a scoped
/// resource released on selection destruction").
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Broadcaster>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[derive(Default)]
struct Broadcaster {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

impl Broadcaster {
    fn subscribe(self_rc: &Rc<RefCell<Broadcaster>>, listener: Listener) -> Subscription {
        let mut b = self_rc.borrow_mut();
        let id = b.next_id;
        b.next_id += 1;
        b.listeners.push((id, listener));
        drop(b);
        Subscription { id, registry: Rc::downgrade(self_rc) }
    }

    fn broadcast(&mut self, kind: &ChangeKind) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(kind);
        }
    }
}

/// The molecular system: an atom table plus an ordered sequence of
/// frames, with change broadcast to subscribed selections.
pub struct System {
    atoms: AtomTable,
    frames: Vec<Frame>,
    broadcaster: Rc<RefCell<Broadcaster>>,
}

pub type SystemHandle = Rc<RefCell<System>>;

impl Default for System {
    fn default() -> Self {
        System::new()
    }
}

impl System {
    pub fn new() -> System {
        System {
            atoms: AtomTable::new(),
            frames: Vec::new(),
            broadcaster: Rc::new(RefCell::new(Broadcaster::default())),
        }
    }

    pub fn into_handle(self) -> SystemHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn natoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn nframes(&self) -> usize {
        self.frames.len()
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> &Atom {
        self.atoms.get(index)
    }

    pub fn atoms_mut(&mut self) -> &mut AtomTable {
        &mut self.atoms
    }

    pub fn frame(&self, index: usize) -> Result<&Frame> {
        self.frames.get(index).ok_or(MolError::IndexError {
            got: index as i64,
            range: 0..self.frames.len() as i64,
        })
    }

    pub fn frame_mut(&mut self, index: usize) -> Result<&mut Frame> {
        let n = self.frames.len();
        self.frames.get_mut(index).ok_or(MolError::IndexError {
            got: index as i64,
            range: 0..n as i64,
        })
    }

    /// Subscribe to change notifications. The returned `Subscription`
    /// must be kept alive for as long as `on_change` should fire.
    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(&ChangeKind) + 'static,
    {
        Broadcaster::subscribe(&self.broadcaster, Box::new(on_change))
    }

    fn broadcast(&self, kind: ChangeKind) {
        self.broadcaster.borrow_mut().broadcast(&kind);
    }

    /// Append a new frame; its coordinate count must equal `natoms()`.
    pub fn frame_append(&mut self, frame: Frame) -> Result<()> {
        if frame.natoms() != self.natoms() {
            return Err(MolError::SizeMismatch { expected: self.natoms(), got: frame.natoms() });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn frame_dup(&mut self, index: usize) -> Result<()> {
        let frame = self.frame(index)?.clone();
        self.frames.push(frame);
        Ok(())
    }

    pub fn frame_copy(&mut self, src: usize, dst: usize) -> Result<()> {
        let coords = self.frame(src)?.coords.clone();
        let frame = self.frame_mut(dst)?;
        frame.coords = coords;
        self.broadcast(ChangeKind::CoordsChanged(dst..dst + 1));
        Ok(())
    }

    /// Delete frames `[b, e)`; `e == usize::MAX` means "to the end".
    /// Selections pointing at a deleted frame are reset to frame 0 by
    /// their own `FramesDeleted` handler.
    pub fn frame_delete(&mut self, b: usize, e: usize) -> Result<()> {
        let end = e.min(self.frames.len());
        if b > end {
            return Err(MolError::IndexError { got: b as i64, range: 0..self.frames.len() as i64 });
        }
        self.frames.drain(b..end);
        self.broadcast(ChangeKind::FramesDeleted(b..end));
        Ok(())
    }

    pub fn set_frame(&self, frame: usize) {
        self.broadcast(ChangeKind::FrameChangeRequested(frame));
    }

    pub fn clear(&mut self) {
        self.atoms = AtomTable::new();
        self.frames.clear();
        self.broadcast(ChangeKind::Cleared);
    }

    pub fn atoms_add(&mut self, atoms: Vec<Atom>, coords: Vec<Vec3>) -> Result<()> {
        if atoms.len() != coords.len() {
            return Err(MolError::SizeMismatch { expected: atoms.len(), got: coords.len() });
        }
        for atom in atoms {
            self.atoms.push(atom);
        }
        for frame in self.frames.iter_mut() {
            frame.coords.extend(coords.iter().copied());
        }
        self.atoms.assign_resindex();
        self.broadcast(ChangeKind::TopologyChanged);
        Ok(())
    }

    pub fn atoms_dup(&mut self, indices: &[usize]) -> Vec<usize> {
        let new_indices = self.atoms.duplicate(indices);
        for frame in self.frames.iter_mut() {
            let dup_coords: Vec<Vec3> = indices.iter().map(|&i| frame.coords[i]).collect();
            frame.coords.extend(dup_coords);
        }
        self.broadcast(ChangeKind::TopologyChanged);
        new_indices
    }

    pub fn atoms_delete(&mut self, indices: &[usize]) {
        let to_delete: std::collections::HashSet<usize> = indices.iter().copied().collect();
        self.atoms.delete(indices);
        for frame in self.frames.iter_mut() {
            let kept: Vec<Vec3> = frame
                .coords
                .iter()
                .enumerate()
                .filter(|(i, _)| !to_delete.contains(i))
                .map(|(_, c)| *c)
                .collect();
            frame.coords = kept;
        }
        self.broadcast(ChangeKind::TopologyChanged);
    }

    pub fn append(&mut self, other: &System) -> Result<()> {
        if self.frames.len() != other.frames.len() && !self.frames.is_empty() && !other.frames.is_empty() {
            return Err(MolError::SizeMismatch { expected: self.frames.len(), got: other.frames.len() });
        }
        self.atoms.append(&other.atoms);
        for (mine, theirs) in self.frames.iter_mut().zip(other.frames.iter()) {
            mine.coords.extend(theirs.coords.iter().copied());
        }
        self.broadcast(ChangeKind::TopologyChanged);
        Ok(())
    }

    pub fn distance(&self, i: usize, j: usize, frame: usize, periodic: bool, dims: Dims) -> Result<f64> {
        let f = self.frame(frame)?;
        let a = f.xyz(i)?;
        let b = f.xyz(j)?;
        Ok(self.point_distance(a, b, frame, periodic, dims)?)
    }

    pub fn point_distance(&self, p1: Vec3, p2: Vec3, frame: usize, periodic: bool, dims: Dims) -> Result<f64> {
        let pbc = self.frame(frame)?.pbc();
        Ok(pbc.distance(p1, p2, periodic, dims))
    }

    pub fn wrap_to_box(&self, frame: usize, point: Vec3, dims: Dims) -> Result<Vec3> {
        let pbc: PeriodicBox = self.frame(frame)?.pbc();
        Ok(pbc.wrap(point, dims))
    }

    pub fn closest_image(&self, frame: usize, point: Vec3, target: Vec3, dims: Dims) -> Result<Vec3> {
        let pbc = self.frame(frame)?.pbc();
        Ok(pbc.closest_image(point, target, dims))
    }
}
