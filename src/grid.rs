use std::collections::HashSet;

use crate::geometry::Vec3;
use crate::pbc::{Dims, PeriodicBox};

/// A 3D uniform grid over fractional coordinates used to accelerate
/// neighbor search. Grounded on Pteros' `Grid`
/// (`grid.h`): cells hold `(atom index, bucketing coordinate)` pairs;
/// periodic axes get their coordinates wrapped once into a side arena
/// so real atom coordinates stay untouched (the "populate_periodic"
/// convention of the original).
///
/// Bucketing happens in fractional space (via the owning `PeriodicBox`)
/// so triclinic boxes are handled uniformly; the grid narrows candidate
/// pairs, but the actual accept/reject distance test always goes through
/// `PeriodicBox::distance`, which is exact for triclinic cells too.
pub struct NeighborGrid<'a> {
    pbc: &'a PeriodicBox,
    periodic: Dims,
    cutoff: f64,
    cells_per_axis: [usize; 3],
    cells: Vec<Vec<(usize, Vec3)>>,
}

fn cell_count(extent: f64, cutoff: f64, axis_periodic: bool) -> usize {
    if cutoff <= 0.0 || extent <= 0.0 {
        return 1;
    }
    // Fallback: cutoff spanning more than half a periodic edge can't be
    // subdivided safely (an atom could neighbor both wrapped images of
    // the same cell), so collapse to a single cell for that axis.
    if axis_periodic && cutoff > extent / 2.0 {
        return 1;
    }
    ((extent / cutoff).floor() as usize).max(1)
}

impl<'a> NeighborGrid<'a> {
    /// Build a grid over `coords` (indexed 0..coords.len()) using `pbc`
    /// for fractional bucketing. `periodic` selects which axes wrap;
    /// non-periodic axes drop atoms whose fractional coordinate falls
    /// outside `[0, 1)`.
    pub fn build(coords: &[Vec3], pbc: &'a PeriodicBox, cutoff: f64, periodic: Dims) -> NeighborGrid<'a> {
        let extents = pbc.extents();
        let mut cells_per_axis = [1usize; 3];
        for axis in 0..3 {
            cells_per_axis[axis] = cell_count(extents[axis], cutoff, periodic[axis] && pbc.is_periodic(axis));
        }
        let total = cells_per_axis[0] * cells_per_axis[1] * cells_per_axis[2];
        let mut cells: Vec<Vec<(usize, Vec3)>> = (0..total).map(|_| Vec::new()).collect();

        for (atom_index, &point) in coords.iter().enumerate() {
            let mut frac = pbc.to_box(point);
            let mut in_range = true;
            for axis in 0..3 {
                if periodic[axis] && pbc.is_periodic(axis) {
                    frac[axis] -= frac[axis].floor();
                } else if !(0.0..1.0).contains(&frac[axis]) {
                    in_range = false;
                }
            }
            if !in_range {
                continue;
            }
            let idx = Self::cell_index(&cells_per_axis, frac);
            let flat = Self::flatten(&cells_per_axis, idx);
            cells[flat].push((atom_index, point));
        }

        NeighborGrid { pbc, periodic, cutoff, cells_per_axis, cells }
    }

    fn cell_index(cells_per_axis: &[usize; 3], frac: Vec3) -> [usize; 3] {
        let mut idx = [0usize; 3];
        for axis in 0..3 {
            let n = cells_per_axis[axis] as f64;
            let raw = (frac[axis] * n).floor() as isize;
            idx[axis] = raw.clamp(0, cells_per_axis[axis] as isize - 1) as usize;
        }
        idx
    }

    fn flatten(cells_per_axis: &[usize; 3], idx: [usize; 3]) -> usize {
        (idx[0] * cells_per_axis[1] + idx[1]) * cells_per_axis[2] + idx[2]
    }

    /// Enumerate the (deduplicated) set of cell coordinates within ±1 of
    /// `idx` along each grid direction, wrapping on periodic axes and
    /// clamping (dropping out-of-range) on non-periodic ones.
    fn neighbor_cells(&self, idx: [usize; 3]) -> Vec<[usize; 3]> {
        let mut seen: HashSet<[usize; 3]> = HashSet::new();
        let mut out = Vec::new();
        for dx in -1..=1i64 {
            for dy in -1..=1i64 {
                for dz in -1..=1i64 {
                    let deltas = [dx, dy, dz];
                    let mut candidate = [0usize; 3];
                    let mut valid = true;
                    for axis in 0..3 {
                        let n = self.cells_per_axis[axis] as i64;
                        let raw = idx[axis] as i64 + deltas[axis];
                        if self.periodic[axis] && self.pbc.is_periodic(axis) {
                            candidate[axis] = raw.rem_euclid(n) as usize;
                        } else if raw < 0 || raw >= n {
                            valid = false;
                        } else {
                            candidate[axis] = raw as usize;
                        }
                    }
                    if valid && seen.insert(candidate) {
                        out.push(candidate);
                    }
                }
            }
        }
        out
    }

    fn cell_for_point(&self, point: Vec3) -> Option<[usize; 3]> {
        let mut frac = self.pbc.to_box(point);
        for axis in 0..3 {
            if self.periodic[axis] && self.pbc.is_periodic(axis) {
                frac[axis] -= frac[axis].floor();
            } else if !(0.0..1.0).contains(&frac[axis]) {
                return None;
            }
        }
        Some(Self::cell_index(&self.cells_per_axis, frac))
    }

    /// For each atom in `query_points` (arbitrary points, not necessarily
    /// grid members), collect the indices of grid atoms within `cutoff`.
    /// When `include_self` is false, a grid atom at distance 0 from a
    /// matching original atom index is still reported unless the caller
    /// explicitly excludes it via `exclude`.
    fn candidates_near(&self, point: Vec3) -> Vec<(usize, Vec3)> {
        let mut out = Vec::new();
        if let Some(idx) = self.cell_for_point(point) {
            for cell_idx in self.neighbor_cells(idx) {
                let flat = Self::flatten(&self.cells_per_axis, cell_idx);
                out.extend(self.cells[flat].iter().copied());
            }
        }
        out
    }

    /// `within(coords, source, candidates, include_self)`: report every
    /// candidate atom index whose distance to at least one atom in
    /// `source` is `<= cutoff`. All indices refer to
    /// positions in the `coords` slice the grid was built from. When
    /// `include_self` is false, a candidate atom's distance to *itself*
    /// (when it is also a source atom) is never counted, but it can
    /// still appear in the result via a distinct source atom.
    pub fn within(&self, coords: &[Vec3], source: &[usize], candidates: &[usize], include_self: bool) -> Vec<usize> {
        let source_set: HashSet<usize> = source.iter().copied().collect();
        let wrap = self.periodic.iter().any(|&p| p);
        let mut result = HashSet::new();
        for &cand in candidates {
            let cand_point = coords[cand];
            let near = self.candidates_near(cand_point);
            for &(src_idx, src_point) in &near {
                if !source_set.contains(&src_idx) {
                    continue;
                }
                if src_idx == cand && !include_self {
                    continue;
                }
                if self.pbc.distance(cand_point, src_point, wrap, self.periodic) <= self.cutoff {
                    result.insert(cand);
                    break;
                }
            }
        }
        let mut out: Vec<usize> = result.into_iter().collect();
        out.sort_unstable();
        out
    }

    /// Undirected, distinct pairs `(i, j)` with `i < j` among the grid's
    /// own atoms whose distance is `<= cutoff`.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for cell in &self.cells {
            for &(i, pi) in cell.iter() {
                let neighbor_idx = self.cell_for_point(pi);
                if let Some(idx) = neighbor_idx {
                    for cell_idx in self.neighbor_cells(idx) {
                        let flat = Self::flatten(&self.cells_per_axis, cell_idx);
                        for &(j, pj) in self.cells[flat].iter() {
                            if i == j {
                                continue;
                            }
                            let (a, b) = if i < j { (i, j) } else { (j, i) };
                            if seen.contains(&(a, b)) {
                                continue;
                            }
                            let wrap = self.periodic.iter().any(|&p| p);
                            if self.pbc.distance(pi, pj, wrap, self.periodic) <= self.cutoff {
                                seen.insert((a, b));
                            }
                        }
                    }
                }
            }
        }
        let mut out: Vec<(usize, usize)> = seen.into_iter().collect();
        out.sort_unstable();
        out
    }

    /// Union-find connectivity groups over `pairs()`: returns disjoint,
    /// sorted index lists, one per connected component, including
    /// isolated (unpaired) atoms as singleton groups.
    pub fn connectivity_groups(&self, natoms: usize) -> Vec<Vec<usize>> {
        let mut parent: Vec<usize> = (0..natoms).collect();

        fn find(parent: &mut [usize], x: usize) -> usize {
            if parent[x] != x {
                parent[x] = find(parent, parent[x]);
            }
            parent[x]
        }

        fn union(parent: &mut [usize], a: usize, b: usize) {
            let ra = find(parent, a);
            let rb = find(parent, b);
            if ra != rb {
                parent[ra] = rb;
            }
        }

        for (i, j) in self.pairs() {
            union(&mut parent, i, j);
        }

        let mut groups: std::collections::BTreeMap<usize, Vec<usize>> = std::collections::BTreeMap::new();
        for atom in 0..natoms {
            let root = find(&mut parent, atom);
            groups.entry(root).or_default().push(atom);
        }
        let mut out: Vec<Vec<usize>> = groups.into_values().collect();
        out.sort_by_key(|g| g[0]);
        out
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbc::ALL_DIMS;

    #[test]
    fn within_finds_close_atom_across_pbc() {
        let pbc = PeriodicBox::new([[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]);
        let coords = vec![[0.1, 1.0, 1.0], [1.9, 1.0, 1.0]];
        let grid = NeighborGrid::build(&coords, &pbc, 0.3, ALL_DIMS);
        let result = grid.within(&coords, &[0], &[0, 1], true);
        assert!(result.contains(&1));
    }

    #[test]
    fn within_noself_excludes_source() {
        let pbc = PeriodicBox::new([[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]);
        let coords = vec![[0.1, 1.0, 1.0], [1.9, 1.0, 1.0]];
        let grid = NeighborGrid::build(&coords, &pbc, 0.3, ALL_DIMS);
        let result = grid.within(&coords, &[0], &[0, 1], false);
        assert_eq!(result, vec![1]);
    }

    #[test]
    fn connectivity_groups_sizes() {
        // Two isolated "waters" (3 atoms each) plus a 4-atom chain, all
        // separated by > 1nm.
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
        let pbc = PeriodicBox::default();
        let grid = NeighborGrid::build(&coords, &pbc, 0.2, [false, false, false]);
        let mut groups = grid.connectivity_groups(coords.len());
        groups.sort_by_key(|g| g.len());
        let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        assert_eq!(sizes, vec![3, 3, 4]);
    }

    #[test]
    fn pairs_ties_broken_by_ascending_index() {
        let pbc = PeriodicBox::default();
        let coords = vec![[0.0, 0.0, 0.0], [0.05, 0.0, 0.0], [0.1, 0.0, 0.0]];
        let grid = NeighborGrid::build(&coords, &pbc, 0.2, [false, false, false]);
        let pairs = grid.pairs();
        // pairs() already returns sorted (i<j) ascending pairs.
        let mut sorted = pairs.clone();
        sorted.sort_unstable();
        assert_eq!(pairs, sorted);
    }
}
