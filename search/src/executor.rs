//! Completion-order task execution on a process-wide worker pool.
//!
//! The pool holds `max(1, ⌊1.5 × cores⌋)` detached worker threads and is
//! created on first use, exactly once per process. Workers never keep the
//! process alive. An [`IterableExecutor`] submits tasks to the pool and
//! yields their results in the order they finish, blocking until the next
//! one is available.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;

use once_cell::sync::Lazy;
use tracing::{trace, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct WorkerPool {
    sender: Mutex<Sender<Job>>,
    size: usize,
}

static POOL: Lazy<WorkerPool> = Lazy::new(|| WorkerPool::start(pool_size()));

/// Number of pool threads for this machine.
#[must_use]
pub fn pool_size() -> usize {
    (num_cpus::get() * 3 / 2).max(1)
}

impl WorkerPool {
    fn start(size: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut started = 0;
        for i in 0..size {
            let receiver = Arc::clone(&receiver);
            let spawned = thread::Builder::new()
                .name(format!("triage-search-{i}"))
                .spawn(move || worker_loop(&receiver));
            match spawned {
                Ok(_) => started += 1,
                Err(e) => warn!(error = %e, worker = i, "failed to spawn search worker"),
            }
        }
        trace!(size = started, "search worker pool started");
        Self {
            sender: Mutex::new(sender),
            size: started,
        }
    }

    /// Queues a job; runs it on the calling thread if no worker exists.
    fn execute(&self, job: Job) {
        if self.size == 0 {
            job();
            return;
        }
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(mpsc::SendError(job)) = sender.send(job) {
            drop(sender);
            job();
        }
    }
}

fn worker_loop(receiver: &Mutex<Receiver<Job>>) {
    loop {
        let job = {
            let guard = receiver.lock().unwrap_or_else(PoisonError::into_inner);
            guard.recv()
        };
        match job {
            Ok(job) => job(),
            Err(_) => return,
        }
    }
}

/// Number of threads the shared pool actually started.
#[must_use]
pub fn active_pool_size() -> usize {
    POOL.size
}

/// A task that panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub message: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked: {}", self.message)
    }
}

impl std::error::Error for TaskFailure {}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// One finished task.
#[derive(Debug)]
pub struct Completed<T> {
    /// Position of the task in submission order.
    pub submission_index: usize,
    /// Position of the task in completion order.
    pub completion_index: usize,
    pub outcome: Result<T, TaskFailure>,
}

struct Finished<T> {
    queue: VecDeque<Completed<T>>,
    completed: usize,
}

struct Shared<T> {
    finished: Mutex<Finished<T>>,
    ready: Condvar,
}

/// Submits tasks to the shared pool and iterates their results in
/// completion order. Yields exactly as many items as tasks were submitted.
pub struct IterableExecutor<T> {
    shared: Arc<Shared<T>>,
    submitted: usize,
    yielded: usize,
}

impl<T: Send + 'static> IterableExecutor<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                finished: Mutex::new(Finished {
                    queue: VecDeque::new(),
                    completed: 0,
                }),
                ready: Condvar::new(),
            }),
            submitted: 0,
            yielded: 0,
        }
    }

    /// Queues `task`; returns its submission index.
    ///
    /// A panic inside the task is captured as a [`TaskFailure`].
    pub fn submit<F>(&mut self, task: F) -> usize
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let submission_index = self.submitted;
        self.submitted += 1;
        let shared = Arc::clone(&self.shared);
        POOL.execute(Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(task)).map_err(|payload| TaskFailure {
                message: panic_message(payload.as_ref()),
            });
            let mut finished = shared
                .finished
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let completion_index = finished.completed;
            finished.completed += 1;
            finished.queue.push_back(Completed {
                submission_index,
                completion_index,
                outcome,
            });
            drop(finished);
            shared.ready.notify_all();
        }));
        submission_index
    }

    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Results not yet yielded.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.submitted - self.yielded
    }
}

impl<T: Send + 'static> Default for IterableExecutor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Iterator for IterableExecutor<T> {
    type Item = Completed<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.yielded == self.submitted {
            return None;
        }
        let mut finished = self
            .shared
            .finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(done) = finished.queue.pop_front() {
                self.yielded += 1;
                return Some(done);
            }
            finished = self
                .shared
                .ready
                .wait(finished)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
