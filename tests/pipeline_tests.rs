//! Integration coverage for `TrajectoryPipeline::run_with_reader`:
//! a simulated reader failure partway through a trajectory still
//! drives every task's `post_process` over the admitted frames, and
//! the I/O failure is reported with the pipeline's I/O exit code.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use molcore::atom::Atom;
use molcore::error::{MolError, Result};
use molcore::frame::Frame;
use molcore::geometry::IDENTITY3;
use molcore::io::{Capability, FileReader, OpenMode, ReadWhat};
use molcore::options::Options;
use molcore::pipeline::{FrameMessage, Task, TrajectoryPipeline};
use molcore::system::System;

const FAIL_AT: usize = 37;

/// A scripted reader that yields `FAIL_AT` coordinate frames and then
/// fails with a non-`IndexError` `IoError`, standing in for a codec
/// that hits a corrupt frame mid-trajectory.
struct ScriptedReader {
    next: usize,
}

impl FileReader for ScriptedReader {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::Traj, Capability::Coord]
    }

    fn open(&mut self, _path: &str, _mode: OpenMode) -> Result<()> {
        Ok(())
    }

    fn read(&mut self, system: &mut System, _frame: Option<usize>, what: ReadWhat) -> Result<()> {
        match what {
            ReadWhat::Topology | ReadWhat::Atoms => Ok(()),
            ReadWhat::Coords => {
                if self.next >= FAIL_AT {
                    return Err(MolError::IoError {
                        path: "synthetic.traj".to_string(),
                        detail: "simulated corrupt frame".to_string(),
                    });
                }
                let t = self.next as f64;
                system.frame_append(Frame::new(vec![[t, 0.0, 0.0]], IDENTITY3, t))?;
                self.next += 1;
                Ok(())
            }
        }
    }
}

struct RecordingTask {
    seen: Arc<AtomicUsize>,
    post_process_frames: Arc<AtomicUsize>,
}

impl Task for RecordingTask {
    fn process_frame(&mut self, _frame: &FrameMessage) -> Result<()> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn post_process(&mut self, frames_processed: usize) -> Result<()> {
        self.post_process_frames.store(frames_processed, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn reader_failure_still_runs_post_process_over_admitted_frames() {
    let mut options = Options::default();
    options.buffer_size = 10;
    options.parallel = true;
    let pipeline = TrajectoryPipeline::new(options);

    let mut system = System::new();
    system.atoms_mut().push(Atom::new("X", "RES", 1, 'A'));

    let seen_a = Arc::new(AtomicUsize::new(0));
    let post_a = Arc::new(AtomicUsize::new(0));
    let seen_b = Arc::new(AtomicUsize::new(0));
    let post_b = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<Box<dyn Task>> = vec![
        Box::new(RecordingTask { seen: seen_a.clone(), post_process_frames: post_a.clone() }),
        Box::new(RecordingTask { seen: seen_b.clone(), post_process_frames: post_b.clone() }),
    ];

    let mut reader = ScriptedReader { next: 0 };
    let result = pipeline.run_with_reader(&mut reader, &mut system, tasks);

    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), MolError::IoError { .. }));
    assert_eq!(seen_a.load(Ordering::SeqCst), FAIL_AT);
    assert_eq!(post_a.load(Ordering::SeqCst), FAIL_AT);
    assert_eq!(seen_b.load(Ordering::SeqCst), FAIL_AT);
    assert_eq!(post_b.load(Ordering::SeqCst), FAIL_AT);
}

fn exit_code_is_io(error: &MolError) -> bool {
    matches!(error, MolError::IoError { .. })
}

#[test]
fn io_error_maps_to_io_exit_code() {
    let mut options = Options::default();
    options.parallel = true;
    let pipeline = TrajectoryPipeline::new(options);
    let mut system = System::new();
    system.atoms_mut().push(Atom::new("X", "RES", 1, 'A'));

    let mut reader = ScriptedReader { next: FAIL_AT };
    let result = pipeline.run_with_reader(&mut reader, &mut system, Vec::new());
    let err = result.unwrap_err();
    assert!(exit_code_is_io(&err));
}
