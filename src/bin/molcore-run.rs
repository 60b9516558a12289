//! CLI entry point exercising the trajectory pipeline end-to-end.
//! Exit codes: 0 success, 2 parse error, 3 I/O error, 4
//! task failure.

use std::process::ExitCode;

use log::info;

use molcore::config::init_logging;
use molcore::error::MolError;
use molcore::options::Options;
use molcore::pipeline::{FrameMessage, Task, TrajectoryPipeline};

/// Reports how many frames it saw; stands in for a real analysis task
/// until a concrete `FileReader` adapter is registered (this crate
/// ships no concrete file-format codec).
struct FrameCounter {
    count: usize,
}

impl Task for FrameCounter {
    fn process_frame(&mut self, frame: &FrameMessage) -> molcore::Result<()> {
        self.count += 1;
        info!("frame {} (t={:.3})", frame.absolute_frame, frame.absolute_time);
        Ok(())
    }

    fn post_process(&mut self, frames_processed: usize) -> molcore::Result<()> {
        info!("processed {frames_processed} frames total");
        Ok(())
    }
}

fn exit_code_for(error: &MolError) -> ExitCode {
    match error {
        MolError::ParseError { .. } => ExitCode::from(2),
        MolError::IoError { .. } => ExitCode::from(3),
        _ => ExitCode::from(4),
    }
}

fn main() -> ExitCode {
    let options = Options::from_args();
    init_logging(&options.log_level);

    if options.trajectory.is_empty() {
        eprintln!("no trajectory files given");
        return ExitCode::from(2);
    }

    info!("starting pipeline over {} input file(s)", options.trajectory.len());
    let pipeline = TrajectoryPipeline::new(options);
    let tasks: Vec<Box<dyn Task>> = vec![Box::new(FrameCounter { count: 0 })];

    match pipeline.run(&[], tasks) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pipeline failed: {e}");
            exit_code_for(&e)
        }
    }
}
