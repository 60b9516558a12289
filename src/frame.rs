use crate::error::{MolError, Result};
use crate::geometry::{Mat3, Vec3};
use crate::pbc::PeriodicBox;

/// One trajectory snapshot: coordinates, box, and timestamp, per
/// `coords.len()` is enforced equal to the owning system's
/// atom-table length at append time (see `System::frame_append`).
#[derive(Debug, Clone)]
pub struct Frame {
    pub coords: Vec<Vec3>,
    pub box_matrix: Mat3,
    pub time: f64,
}

impl Frame {
    pub fn new(coords: Vec<Vec3>, box_matrix: Mat3, time: f64) -> Frame {
        Frame { coords, box_matrix, time }
    }

    pub fn natoms(&self) -> usize {
        self.coords.len()
    }

    pub fn pbc(&self) -> PeriodicBox {
        PeriodicBox::new(self.box_matrix)
    }

    pub fn xyz(&self, index: usize) -> Result<Vec3> {
        self.coords.get(index).copied().ok_or(MolError::IndexError {
            got: index as i64,
            range: 0..self.coords.len() as i64,
        })
    }

    pub fn set_xyz(&mut self, index: usize, value: Vec3) -> Result<()> {
        let n = self.coords.len();
        let slot = self.coords.get_mut(index).ok_or(MolError::IndexError {
            got: index as i64,
            range: 0..n as i64,
        })?;
        *slot = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::IDENTITY3;

    #[test]
    fn xyz_bounds_checked() {
        let frame = Frame::new(vec![[0.0, 0.0, 0.0]], IDENTITY3, 0.0);
        assert!(frame.xyz(0).is_ok());
        assert!(frame.xyz(1).is_err());
    }
}
