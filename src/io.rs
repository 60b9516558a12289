//! The abstract `FileReader`/`FileWriter` boundary. No
//! concrete file-format codec ships with this crate; adapters register
//! themselves against [`WriterRegistry`]/[`ReaderRegistry`] by
//! extension. `Selection::write` and `TrajectoryPipeline`'s reader
//! thread consume only this trait boundary, never a concrete format.

use crate::error::{MolError, Result};
use crate::selection::Selection;
use crate::system::System;

/// What an adapter advertises it can do; used by callers to pick a
/// compatible adapter before attempting `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Atoms,
    Coord,
    Traj,
    Topology,
    RandomAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadWhat {
    Atoms,
    Coords,
    Topology,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteWhat {
    Atoms,
    Coords,
    Topology,
}

pub trait FileReader {
    fn capabilities(&self) -> &[Capability];
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<()>;
    fn read(&mut self, system: &mut System, frame: Option<usize>, what: ReadWhat) -> Result<()>;

    fn seek_frame(&mut self, _index: usize) -> Result<()> {
        Err(unsupported("seek_frame"))
    }
    fn seek_time(&mut self, _time: f64) -> Result<()> {
        Err(unsupported("seek_time"))
    }
    fn tell_current(&self) -> Result<(usize, f64)> {
        Err(unsupported("tell_current"))
    }
    fn tell_last(&self) -> Result<(usize, f64)> {
        Err(unsupported("tell_last"))
    }
}

pub trait FileWriter {
    fn capabilities(&self) -> &[Capability];
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<()>;
    fn write(&mut self, selection: &Selection, what: WriteWhat) -> Result<()>;
}

fn unsupported(op: &str) -> MolError {
    MolError::IoError { path: String::new(), detail: format!("adapter does not support {op}") }
}

/// Factory slot for a `FileWriter` adapter, keyed by lowercase
/// extension (without the leading dot).
type WriterFactory = fn() -> Box<dyn FileWriter>;
type ReaderFactory = fn() -> Box<dyn FileReader>;

/// Extension-keyed adapter lookup consulted by `Selection::write` and
/// the pipeline's reader thread. Empty by default: this crate ships no
/// concrete codec, so resolution fails with
/// `IoError` unless a caller registers one via [`register_writer`].
#[derive(Default)]
pub struct WriterRegistry {
    entries: Vec<(String, WriterFactory)>,
}

impl WriterRegistry {
    pub fn new() -> WriterRegistry {
        WriterRegistry::default()
    }

    pub fn register(&mut self, extension: &str, factory: WriterFactory) {
        self.entries.push((extension.to_ascii_lowercase(), factory));
    }

    pub fn resolve(&self, path: &str) -> Option<Box<dyn FileWriter>> {
        let ext = extension_of(path)?;
        self.entries.iter().find(|(e, _)| *e == ext).map(|(_, f)| f())
    }
}

#[derive(Default)]
pub struct ReaderRegistry {
    entries: Vec<(String, ReaderFactory)>,
}

impl ReaderRegistry {
    pub fn new() -> ReaderRegistry {
        ReaderRegistry::default()
    }

    pub fn register(&mut self, extension: &str, factory: ReaderFactory) {
        self.entries.push((extension.to_ascii_lowercase(), factory));
    }

    pub fn resolve(&self, path: &str) -> Option<Box<dyn FileReader>> {
        let ext = extension_of(path)?;
        self.entries.iter().find(|(e, _)| *e == ext).map(|(_, f)| f())
    }
}

fn extension_of(path: &str) -> Option<String> {
    path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Write `selection`'s coordinates for frames `[b, e)` through
/// `writer`, which must already be open for `OpenMode::Write`.
pub fn write_frames(writer: &mut dyn FileWriter, selection: &Selection, b: usize, e: usize) -> Result<()> {
    let saved = selection.frame();
    for f in b..e {
        selection.set_frame(f);
        writer.write(selection, WriteWhat::Coords)?;
    }
    selection.set_frame(saved);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingWriter {
        opened: Option<String>,
        frames_written: usize,
    }

    impl FileWriter for RecordingWriter {
        fn capabilities(&self) -> &[Capability] {
            &[Capability::Coord, Capability::Traj]
        }
        fn open(&mut self, path: &str, _mode: OpenMode) -> Result<()> {
            self.opened = Some(path.to_string());
            Ok(())
        }
        fn write(&mut self, _selection: &Selection, _what: WriteWhat) -> Result<()> {
            self.frames_written += 1;
            Ok(())
        }
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = WriterRegistry::new();
        assert!(registry.resolve("out.xtc").is_none());
    }

    #[test]
    fn registered_writer_resolves_by_extension() {
        fn make() -> Box<dyn FileWriter> {
            Box::new(RecordingWriter { opened: None, frames_written: 0 })
        }
        let mut registry = WriterRegistry::new();
        registry.register("xtc", make);
        let resolved = registry.resolve("traj.xtc");
        assert!(resolved.is_some());
        assert!(registry.resolve("traj.pdb").is_none());
    }

    #[test]
    fn write_frames_counts_each_frame() {
        use crate::atom::Atom;
        use crate::frame::Frame;
        use crate::geometry::IDENTITY3;

        let mut sys = System::new();
        sys.atoms_mut().push(Atom::new("CA", "ALA", 1, 'A'));
        sys.frame_append(Frame::new(vec![[0.0, 0.0, 0.0]], IDENTITY3, 0.0)).unwrap();
        sys.frame_append(Frame::new(vec![[1.0, 0.0, 0.0]], IDENTITY3, 1.0)).unwrap();
        sys.frame_append(Frame::new(vec![[2.0, 0.0, 0.0]], IDENTITY3, 2.0)).unwrap();
        let handle = sys.into_handle();
        let sel = Selection::new(handle, "all").unwrap();

        let recorded = RefCell::new(RecordingWriter { opened: None, frames_written: 0 });
        let mut writer = recorded.borrow_mut();
        write_frames(&mut *writer, &sel, 0, 3).unwrap();
        assert_eq!(writer.frames_written, 3);
    }
}
