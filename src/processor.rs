//! Bounded delivery queue and background dispatch loop.
//!
//! Producers hand fully formatted lines to [`LogProcessor::enqueue`]; a
//! single dedicated thread pops them in FIFO order, decodes the embedded
//! ANSI codes, and delivers the styled segments to every registered view.
//! The queue is the only structure shared between producers and the
//! dispatcher and is guarded by a mutex with two condition variables.

use crate::ansi;
use crate::view::TextViewRegistry;
use serde::{Deserialize, Deserializer};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Behavior of [`LogProcessor::enqueue`] when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueFullMode {
    /// Block the producer until the dispatcher frees space.
    Wait,
    /// Discard the incoming line; queued lines are untouched.
    DropWrite,
}

impl FromStr for QueueFullMode {
    type Err = crate::options::OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wait" => Ok(QueueFullMode::Wait),
            "dropwrite" | "drop_write" => Ok(QueueFullMode::DropWrite),
            _ => Err(crate::options::OptionsError::UnsupportedQueueFullMode(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for QueueFullMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    ShuttingDown,
    Stopped,
}

struct QueueState {
    queue: VecDeque<String>,
    capacity: usize,
    full_mode: QueueFullMode,
    phase: Phase,
}

struct Shared {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Owner of the bounded line queue and its dispatch thread.
///
/// Created once per provider; dropping it shuts the pipeline down after
/// draining whatever is still queued.
pub struct LogProcessor {
    shared: Arc<Shared>,
    views: Arc<TextViewRegistry>,
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Lines accepted into the queue.
    pub enqueued_lines: AtomicU64,
    /// Lines discarded, either by `DropWrite` or by shutdown releasing a
    /// blocked producer.
    pub dropped_lines: AtomicU64,
}

impl LogProcessor {
    /// Start the dispatch thread. `capacity` must be validated (> 0) by
    /// the caller; see [`TextViewOptions::validate`].
    ///
    /// [`TextViewOptions::validate`]: crate::options::TextViewOptions::validate
    pub fn new(views: Arc<TextViewRegistry>, capacity: usize, full_mode: QueueFullMode) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                capacity,
                full_mode,
                phase: Phase::Running,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker_views = Arc::clone(&views);
        let handle = thread::Builder::new()
            .name("textview-log-dispatch".into())
            .spawn(move || dispatch_loop(&worker_shared, &worker_views))
            .expect("spawn log dispatch thread");

        LogProcessor {
            shared,
            views,
            worker: Mutex::new(Some(handle)),
            enqueued_lines: AtomicU64::new(0),
            dropped_lines: AtomicU64::new(0),
        }
    }

    /// The registry this processor delivers to.
    pub fn views(&self) -> &Arc<TextViewRegistry> {
        &self.views
    }

    /// Hand one formatted line to the pipeline.
    ///
    /// Safe to call from any number of threads. Under `Wait` the caller
    /// blocks while the queue is full; under `DropWrite` a full queue
    /// discards `line` immediately. Either way the call never returns an
    /// error: backpressure is policy, not failure.
    pub fn enqueue(&self, line: String) {
        let mut state = self.shared.lock();

        while state.phase == Phase::Running
            && state.full_mode == QueueFullMode::Wait
            && state.queue.len() >= state.capacity
        {
            state = self
                .shared
                .not_full
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }

        // Shutdown converts a parked producer to a drop; a full queue here
        // means DropWrite (or a mode change while parked) discards the
        // newest line.
        if state.phase != Phase::Running || state.queue.len() >= state.capacity {
            drop(state);
            self.dropped_lines.fetch_add(1, Ordering::Relaxed);
            return;
        }

        state.queue.push_back(line);
        drop(state);
        self.enqueued_lines.fetch_add(1, Ordering::Relaxed);
        self.shared.not_empty.notify_one();
    }

    /// Apply a new capacity to subsequent enqueues. Lines already queued
    /// beyond a smaller bound are delivered, not evicted.
    pub fn set_max_queue_length(&self, capacity: usize) {
        let mut state = self.shared.lock();
        state.capacity = capacity;
        drop(state);
        self.shared.not_full.notify_all();
    }

    /// Apply a new full-queue policy to subsequent enqueues.
    pub fn set_full_mode(&self, full_mode: QueueFullMode) {
        let mut state = self.shared.lock();
        state.full_mode = full_mode;
        drop(state);
        self.shared.not_full.notify_all();
    }

    /// Stop the pipeline: release any parked producers, let the dispatch
    /// thread drain what is queued, then join it. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if state.phase == Phase::Running {
                state.phase = Phase::ShuttingDown;
            }
        }
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();

        let handle = {
            let mut worker = self
                .worker
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            worker.take()
        };
        if let Some(handle) = handle {
            if let Err(panic) = handle.join() {
                eprintln!("log dispatch thread panicked: {panic:?}");
            }
        }

        self.shared.lock().phase = Phase::Stopped;
    }
}

impl Drop for LogProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch_loop(shared: &Shared, views: &TextViewRegistry) {
    loop {
        let line = {
            let mut state = shared.lock();
            loop {
                if let Some(line) = state.queue.pop_front() {
                    break line;
                }
                // Empty queue: park while running, exit once shutdown has
                // begun and the drain is complete.
                if state.phase != Phase::Running {
                    return;
                }
                state = shared
                    .not_empty
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        };
        shared.not_full.notify_one();
        deliver(&line, views);
    }
}

/// Decode one line and hand the segments to every registered view. A view
/// that panics is contained and skipped; the loop and remaining views
/// continue.
fn deliver(line: &str, views: &TextViewRegistry) {
    let mut segments = Vec::new();
    ansi::parse(line, |segment| segments.push(segment));

    for view in views.snapshot() {
        if catch_unwind(AssertUnwindSafe(|| view.render(&segments))).is_err() {
            eprintln!("text view render failed; continuing with remaining views");
        }
    }
}
