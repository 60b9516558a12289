use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::constants::DEFAULT_BUFFER_SIZE;

/// A bounded, blocking, FIFO queue with an irreversible stop bit, used
/// to hand trajectory frames from a reader thread to worker threads.
/// Grounded on Pteros' `Message_channel` (a `boost::condition_variable`
/// guarding a `std::queue`), reimplemented on `std::sync::{Mutex, Condvar}`.
///
/// Once stopped, `send` drops its payload and returns `false`; `recv`
/// drains whatever remains and then returns `None` forever. Stop is
/// permanent: there is no way to un-stop a channel.
pub struct FrameChannel<T> {
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

struct State<T> {
    queue: VecDeque<T>,
    capacity: usize,
    stopped: bool,
}

impl<T> FrameChannel<T> {
    pub fn new() -> FrameChannel<T> {
        FrameChannel::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> FrameChannel<T> {
        FrameChannel {
            state: Mutex::new(State { queue: VecDeque::new(), capacity, stopped: false }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    pub fn set_capacity(&self, capacity: usize) {
        let mut state = self.state.lock().unwrap();
        state.capacity = capacity;
        self.not_full.notify_all();
    }

    /// Request stop. Idempotent; wakes every blocked `send`/`recv`.
    pub fn send_stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.stopped = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().stopped
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    /// Push `value` onto the queue, blocking while it is full. Returns
    /// `false` (dropping `value`) if stop was or became requested before
    /// room opened up.
    pub fn send(&self, value: T) -> bool {
        let mut state = self.state.lock().unwrap();
        while state.queue.len() >= state.capacity && !state.stopped {
            state = self.not_full.wait(state).unwrap();
        }
        if state.stopped {
            return false;
        }
        state.queue.push_back(value);
        self.not_empty.notify_one();
        true
    }

    /// Pop the oldest value, blocking while the queue is empty. Returns
    /// `None` once the queue is both stopped and drained.
    pub fn recv(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        while state.queue.is_empty() && !state.stopped {
            state = self.not_empty.wait(state).unwrap();
        }
        let value = state.queue.pop_front();
        if value.is_some() {
            self.not_full.notify_one();
        }
        value
    }

    /// Drain and invoke `callback` on every currently queued value,
    /// without blocking for more.
    pub fn recv_each<F: FnMut(T)>(&self, mut callback: F) {
        let mut state = self.state.lock().unwrap();
        while let Some(value) = state.queue.pop_front() {
            self.not_full.notify_one();
            drop(state);
            callback(value);
            state = self.state.lock().unwrap();
        }
    }
}

impl<T> Default for FrameChannel<T> {
    fn default() -> Self {
        FrameChannel::new()
    }
}
