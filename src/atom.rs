/// A single attribute record (coordinate-free).
///
/// Grounded in Pteros' `atom.h` attribute set, carried over with Rust
/// naming: `type_name`/`type_number` split the force-field atom type
/// from its numeric code, `resindex` is the dense, per-residue-run index
/// assigned by `AtomTable::assign_resindex`.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub name: String,
    pub type_name: String,
    pub type_number: i32,
    pub resname: String,
    pub resid: i32,
    pub resindex: usize,
    pub chain: char,
    pub tag: String,
    pub mass: f64,
    pub charge: f64,
    pub beta: f64,
    pub occupancy: f64,
    pub atomic_number: i32,
}

impl Atom {
    pub fn new(name: &str, resname: &str, resid: i32, chain: char) -> Atom {
        Atom {
            name: name.to_string(),
            type_name: String::new(),
            type_number: 0,
            resname: resname.to_string(),
            resid,
            resindex: 0,
            chain,
            tag: String::new(),
            mass: 0.0,
            charge: 0.0,
            beta: 0.0,
            occupancy: 0.0,
            atomic_number: 0,
        }
    }
}

/// Owns the atom attribute table for a `System`. Coordinates live in
/// `Frame`, not here: an atom is an attribute record, coordinate-free.
#[derive(Debug, Clone, Default)]
pub struct AtomTable {
    atoms: Vec<Atom>,
}

impl AtomTable {
    pub fn new() -> AtomTable {
        AtomTable { atoms: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn push(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    pub fn get(&self, index: usize) -> &Atom {
        &self.atoms[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Atom {
        &mut self.atoms[index]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    pub fn delete(&mut self, indices: &[usize]) {
        let to_delete: std::collections::HashSet<usize> = indices.iter().copied().collect();
        let mut kept = Vec::with_capacity(self.atoms.len().saturating_sub(to_delete.len()));
        for (i, atom) in self.atoms.drain(..).enumerate() {
            if !to_delete.contains(&i) {
                kept.push(atom);
            }
        }
        self.atoms = kept;
        self.assign_resindex();
    }

    pub fn duplicate(&mut self, indices: &[usize]) -> Vec<usize> {
        let mut new_indices = Vec::with_capacity(indices.len());
        for &i in indices {
            let atom = self.atoms[i].clone();
            new_indices.push(self.push(atom));
        }
        self.assign_resindex();
        new_indices
    }

    pub fn append(&mut self, other: &AtomTable) {
        self.atoms.extend(other.atoms.iter().cloned());
        self.assign_resindex();
    }

    /// Recompute dense, contiguous `resindex` values for connected runs
    /// sharing `(chain, resid)`. A "run" breaks
    /// whenever `(chain, resid)` changes between consecutive atoms, so a
    /// chain revisiting the same `resid` later (e.g. after a ligand
    /// insertion) gets a fresh resindex rather than merging back in.
    pub fn assign_resindex(&mut self) {
        if self.atoms.is_empty() {
            return;
        }
        let mut current_index = 0usize;
        let mut prev_key: Option<(char, i32)> = None;
        for atom in self.atoms.iter_mut() {
            let key = (atom.chain, atom.resid);
            if let Some(prev) = prev_key {
                if prev != key {
                    current_index += 1;
                }
            }
            atom.resindex = current_index;
            prev_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(chain: char, resid: i32) -> Atom {
        Atom::new("CA", "ALA", resid, chain)
    }

    #[test]
    fn resindex_dense_and_contiguous() {
        let mut table = AtomTable::new();
        table.push(atom('A', 1));
        table.push(atom('A', 1));
        table.push(atom('A', 2));
        table.push(atom('B', 1));
        table.assign_resindex();
        let indices: Vec<usize> = table.iter().map(|a| a.resindex).collect();
        assert_eq!(indices, vec![0, 0, 1, 2]);
    }

    #[test]
    fn delete_reindexes() {
        let mut table = AtomTable::new();
        table.push(atom('A', 1));
        table.push(atom('A', 2));
        table.push(atom('A', 3));
        table.delete(&[1]);
        assert_eq!(table.len(), 2);
        let indices: Vec<usize> = table.iter().map(|a| a.resindex).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn duplicate_appends() {
        let mut table = AtomTable::new();
        table.push(atom('A', 1));
        let new_idx = table.duplicate(&[0]);
        assert_eq!(new_idx, vec![1]);
        assert_eq!(table.len(), 2);
    }
}
