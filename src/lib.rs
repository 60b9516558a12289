//! `molcore`: a data-driven molecular-modeling core. A System/Frame
//! data model, a selection language (grammar, AST, interpreter) with
//! coordinate-dependence analysis, a triclinic periodic-box neighbor
//! search, and a trajectory pipeline built on a bounded blocking
//! channel.

pub mod atom;
pub mod channel;
pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod grid;
pub mod io;
pub mod options;
pub mod pbc;
pub mod pipeline;
pub mod quaternion;
pub mod selection;
pub mod system;

pub use error::{MolError, Result};
pub use selection::Selection;
pub use system::{System, SystemHandle};
