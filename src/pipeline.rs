//! `TrajectoryPipeline`: discovers frames, stamps them, and delivers
//! them to a bank of `Task`s either serially or over one
//! `FrameChannel` per task. Frames are handed to tasks
//! as an owned [`FrameMessage`] snapshot rather than a live `Selection`
//! bound to the shared `System`, since `System`/`Selection` are
//! deliberately `!Send` (`Rc<RefCell<_>>`, per the single-threaded
//! selection design). See DESIGN.md for the tradeoff.

use std::sync::Arc;
use std::thread;

use log::{error, info, warn};

use crate::channel::FrameChannel;
use crate::error::{MolError, Result};
use crate::frame::Frame;
use crate::geometry::Mat3;
use crate::io::FileReader;
use crate::options::Options;
use crate::system::System;

/// One dispatched trajectory frame, stamped with its run-relative index and elapsed time.
#[derive(Debug, Clone)]
pub struct FrameMessage {
    pub absolute_frame: usize,
    pub valid_frame_in_run: usize,
    pub absolute_time: f64,
    pub t_elapsed: f64,
    pub coords: Vec<[f64; 3]>,
    pub box_matrix: Mat3,
}

/// A unit of work run against every dispatched frame. Implementors own
/// whatever state they need (e.g. a precomputed index list) since they
/// never see a live `Selection`.
pub trait Task: Send {
    fn pre_process(&mut self) -> Result<()> {
        Ok(())
    }
    fn process_frame(&mut self, frame: &FrameMessage) -> Result<()>;
    fn post_process(&mut self, frames_processed: usize) -> Result<()> {
        Ok(())
    }
}

pub struct TrajectoryPipeline {
    options: Options,
}

impl TrajectoryPipeline {
    pub fn new(options: Options) -> TrajectoryPipeline {
        TrajectoryPipeline { options }
    }

    /// Run over already-loaded `frames` (the common case once a
    /// `FileReader` adapter has populated a `System`).
    pub fn run(&self, frames: &[Frame], tasks: Vec<Box<dyn Task>>) -> Result<()> {
        let messages = self.stamp(frames);
        if self.options.parallel {
            self.run_parallel(messages, tasks)
        } else {
            self.run_serial(messages, tasks)
        }
    }

    /// Run by reading frames incrementally from `reader`: discover
    /// topology, then enumerate frames one at a time, logging progress
    /// every `log_interval` frames. A read error stops enumeration
    /// early but every task still runs to completion (including
    /// `post_process`) over the frames admitted before the failure,
    /// matching the pipeline's failure-isolation guarantee; the read
    /// error is then surfaced to the caller so the process exits with
    /// an I/O-specific code.
    pub fn run_with_reader(&self, reader: &mut dyn FileReader, system: &mut System, tasks: Vec<Box<dyn Task>>) -> Result<()> {
        use crate::io::ReadWhat;
        reader.read(system, None, ReadWhat::Topology)?;
        let mut frames = Vec::new();
        let mut read_error = None;
        loop {
            // Adapters signal end-of-stream with `IndexError`; any other
            // error is a genuine codec failure.
            match reader.read(system, Some(frames.len()), ReadWhat::Coords) {
                Ok(()) => {
                    let frame = system.frame(system.nframes().saturating_sub(1))?.clone();
                    frames.push(frame);
                    let interval = self.options.log_interval;
                    if interval > 0 && frames.len() % interval == 0 {
                        info!("frame {} / t={:.3}", frames.len(), frames.last().expect("just pushed").time);
                    }
                }
                Err(MolError::IndexError { .. }) => break,
                Err(e) => {
                    error!("trajectory read failed: {e}");
                    read_error = Some(e);
                    break;
                }
            }
        }
        self.run(&frames, tasks)?;
        match read_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn stamp(&self, frames: &[Frame]) -> Vec<FrameMessage> {
        let (first, last) = self.options.resolved_range(frames.len());
        let stride = self.options.stride.max(1);
        let mut out = Vec::new();
        let mut anchor_time = None;
        let mut valid = 0usize;
        for absolute_frame in (first..last).step_by(stride) {
            let frame = &frames[absolute_frame];
            if let Some(t0) = self.options.first_time {
                if frame.time < t0 {
                    continue;
                }
            }
            if let Some(t1) = self.options.last_time {
                if frame.time > t1 {
                    break;
                }
            }
            let anchor = *anchor_time.get_or_insert(frame.time);
            out.push(FrameMessage {
                absolute_frame,
                valid_frame_in_run: valid,
                absolute_time: frame.time,
                t_elapsed: frame.time - anchor,
                coords: frame.coords.clone(),
                box_matrix: frame.box_matrix,
            });
            valid += 1;
        }
        out
    }

    fn run_serial(&self, messages: Vec<FrameMessage>, mut tasks: Vec<Box<dyn Task>>) -> Result<()> {
        for task in tasks.iter_mut() {
            task.pre_process()?;
        }
        let mut count = 0usize;
        for message in &messages {
            for task in tasks.iter_mut() {
                task.process_frame(message)?;
            }
            count += 1;
        }
        for task in tasks.iter_mut() {
            task.post_process(count)?;
        }
        Ok(())
    }

    fn run_parallel(&self, messages: Vec<FrameMessage>, tasks: Vec<Box<dyn Task>>) -> Result<()> {
        let channels: Vec<Arc<FrameChannel<FrameMessage>>> =
            (0..tasks.len()).map(|_| Arc::new(FrameChannel::with_capacity(self.options.buffer_size))).collect();

        let handles: Vec<_> = tasks
            .into_iter()
            .zip(channels.iter().cloned())
            .map(|(task, channel)| thread::spawn(move || run_task_thread(task, channel)))
            .collect();

        info!("dispatching {} frames to {} task threads", messages.len(), handles.len());
        for message in messages {
            for channel in &channels {
                if !channel.send(message.clone()) {
                    warn!("frame {} dropped: a task channel already stopped", message.absolute_frame);
                }
            }
        }
        for channel in &channels {
            channel.send_stop();
        }

        let mut first_error = None;
        for handle in handles {
            match handle.join().expect("task thread panicked") {
                Ok(()) => {}
                Err(e) => {
                    error!("task failed: {e}");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn run_task_thread(mut task: Box<dyn Task>, channel: Arc<FrameChannel<FrameMessage>>) -> Result<()> {
    task.pre_process()?;
    let mut processed = 0usize;
    let mut failure = None;
    while let Some(message) = channel.recv() {
        if failure.is_some() {
            continue;
        }
        if let Err(e) = task.process_frame(&message) {
            channel.send_stop();
            failure = Some(e);
            continue;
        }
        processed += 1;
    }
    task.post_process(processed)?;
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
