//! Deferred task scheduling.
//!
//! Deferred dispatch hands one task per emission to a [`Scheduler`]. Any
//! scheduler is acceptable as long as it runs tasks after the current
//! synchronous unit of work, one at a time, in the order they were scheduled.
//!
//! Two implementations ship with the crate:
//!
//! - [`Microtasks`]: a thread-local FIFO queue, drained explicitly with
//!   [`run_microtasks`]. This is the default for every bus.
//! - [`TokioScheduler`]: a dedicated tokio task fed by an unbounded channel.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Destination for deferred dispatch batches.
pub trait Scheduler: Send + Sync + 'static {
    /// Queues `task` to run after the current synchronous unit of work.
    fn schedule(&self, task: Task);
}

thread_local! {
    static MICROTASKS: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
}

/// Scheduler backed by the current thread's microtask queue.
///
/// Tasks are queued on the thread that schedules them and run when that
/// thread calls [`run_microtasks`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Microtasks;

impl Scheduler for Microtasks {
    fn schedule(&self, task: Task) {
        queue_microtask(task);
    }
}

/// Appends a task to this thread's microtask queue.
pub fn queue_microtask(task: Task) {
    MICROTASKS.with(|queue| queue.borrow_mut().push_back(task));
}

/// Number of tasks waiting in this thread's microtask queue.
pub fn pending_microtasks() -> usize {
    MICROTASKS.with(|queue| queue.borrow().len())
}

/// Runs queued microtasks on this thread until the queue is empty.
///
/// Tasks queued while draining run in the same call, after the ones already
/// waiting. Returns the number of tasks run.
///
/// A panicking task propagates out of this call. It has already been removed
/// from the queue, so the tasks behind it stay queued and run on the next
/// call.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    loop {
        // The borrow ends before the task runs so tasks can queue more work.
        let next = MICROTASKS.with(|queue| queue.borrow_mut().pop_front());
        let Some(task) = next else { break };
        task();
        ran += 1;
    }
    if ran > 0 {
        trace!("Ran {} microtasks", ran);
    }
    ran
}

/// Scheduler that runs tasks on a dedicated tokio task.
///
/// The unbounded channel preserves send order. A panicking task is caught and
/// logged; later tasks still run.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    sender: mpsc::UnboundedSender<Task>,
}

impl TokioScheduler {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn spawn() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
        tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                if catch_unwind(AssertUnwindSafe(task)).is_err() {
                    error!("❌ Deferred task panicked; continuing with the next batch");
                }
            }
            debug!("Tokio scheduler worker stopped");
        });
        Self { sender }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, task: Task) {
        if self.sender.send(task).is_err() {
            error!("❌ Tokio scheduler worker is gone; deferred task dropped");
        }
    }
}
