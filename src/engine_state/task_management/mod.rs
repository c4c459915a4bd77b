//! # Task Management System
//!
//! A fixed pool of worker threads consuming a shared queue of [`Task`]s.
//!
//! ## Architecture Overview
//!
//! - `WorkerPool`: owns the worker threads and the queue they share
//! - `Task`: a unit of fire-and-forget work
//! - `ClosureTask`: adapts a closure into a task
//!
//! The queue and a termination flag sit behind one mutex paired with a
//! condition variable. Workers sleep on the condition variable and wake when
//! work arrives or the pool stops. On waking they check termination first,
//! otherwise pop exactly one task, run it outside the lock, and loop.
//!
//! ## Ordering
//! Tasks are queued FIFO, but any idle worker may take the next task, so
//! completion order is unspecified.
//!
//! ## Failure Containment
//! Each task runs under `catch_unwind`. A task that returns `Err` or panics is
//! logged and the worker carries on with the next task.
//!
//! ## Shutdown
//! [`WorkerPool::stop`] sets the termination flag, wakes every worker and joins
//! them. Tasks already running finish; tasks still queued are dropped.
//!
//! ## Example Usage
//! ```ignore
//! let mut pool = WorkerPool::start(4)?;
//! pool.submit_fn("say hello", || {
//!     log::info!("hello from a worker");
//!     Ok(())
//! })?;
//! pool.stop();
//! ```

pub mod task;

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use anyhow::{bail, ensure, Context};
use log::{error, info};

pub use task::{ClosureTask, Task};

/// State guarded by the pool mutex.
struct PoolQueue {
    tasks: VecDeque<Box<dyn Task>>,
    terminate: bool,
}

/// Everything the workers share.
struct PoolShared {
    queue: Mutex<PoolQueue>,
    signal: Condvar,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A fixed set of worker threads running submitted tasks.
///
/// # Implementation Notes
/// - Thread-safe submission through `&self`
/// - Drop-safe: dropping the pool stops and joins the workers
/// - Panic-safe: a panicking task does not kill its worker
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts a pool with `thread_count` workers.
    ///
    /// # Arguments
    /// * `thread_count` - Number of worker threads, at least 1
    ///
    /// # Returns
    /// The running pool, or an error if the count is zero or a thread could
    /// not be spawned.
    pub fn start(thread_count: usize) -> anyhow::Result<Self> {
        ensure!(thread_count > 0, "worker pool needs at least one thread");

        let shared = Arc::new(PoolShared {
            queue: Mutex::new(PoolQueue {
                tasks: VecDeque::new(),
                terminate: false,
            }),
            signal: Condvar::new(),
        });

        let mut pool = WorkerPool {
            shared,
            workers: Vec::with_capacity(thread_count),
        };

        for worker_index in 0..thread_count {
            let shared = pool.shared.clone();
            let worker = thread::Builder::new()
                .name(format!("chunk-worker-{worker_index}"))
                .spawn(move || worker_loop(&shared))
                .with_context(|| format!("spawning worker thread {worker_index}"))?;
            pool.workers.push(worker);
        }

        info!("Worker pool started with {thread_count} threads");
        Ok(pool)
    }

    /// Picks the worker count: a non-zero override wins, otherwise the
    /// available hardware parallelism, otherwise 1.
    pub fn resolve_thread_count(requested: Option<usize>) -> usize {
        match requested {
            Some(count) if count > 0 => count,
            _ => thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }

    /// Queues a task and wakes one worker.
    ///
    /// # Returns
    /// An error if the pool has been stopped; the task is dropped.
    pub fn submit(&self, task: Box<dyn Task>) -> anyhow::Result<()> {
        {
            let mut queue = self.shared.lock();
            if queue.terminate {
                bail!("worker pool is stopped, dropping task {}", task.name());
            }
            queue.tasks.push_back(task);
        }
        self.shared.signal.notify_one();
        Ok(())
    }

    /// Queues a closure as a task.
    pub fn submit_fn<F>(&self, name: impl Into<String>, work: F) -> anyhow::Result<()>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.submit(Box::new(ClosureTask::new(name, work)))
    }

    /// Stops the pool: no further task is dispatched, running tasks finish,
    /// and every worker is joined. Calling it again does nothing.
    pub fn stop(&mut self) {
        let dropped = {
            let mut queue = self.shared.lock();
            queue.terminate = true;
            let dropped = queue.tasks.len();
            queue.tasks.clear();
            dropped
        };
        self.shared.signal.notify_all();

        if self.workers.is_empty() {
            return;
        }

        let joined = self.workers.len();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("A worker thread panicked outside of a task");
            }
        }
        info!("Worker pool stopped: joined {joined} threads, dropped {dropped} queued tasks");
    }

    /// Number of live worker threads.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Tasks waiting for a worker.
    pub fn queued_len(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    /// `true` once [`WorkerPool::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.shared.lock().terminate
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        let task = {
            let queue = shared.lock();
            let mut queue = shared
                .signal
                .wait_while(queue, |queue| queue.tasks.is_empty() && !queue.terminate)
                .unwrap_or_else(PoisonError::into_inner);

            if queue.terminate {
                return;
            }
            match queue.tasks.pop_front() {
                Some(task) => task,
                None => continue,
            }
        };

        let name = task.name();
        match panic::catch_unwind(AssertUnwindSafe(move || task.process())) {
            Ok(Ok(())) => {}
            Ok(Err(error)) => error!("Task '{name}' failed: {error:#}"),
            Err(payload) => error!("Task '{name}' panicked: {}", panic_message(payload.as_ref())),
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        assert!(WorkerPool::start(0).is_err());
    }

    #[test]
    fn override_wins_over_hardware_count() {
        assert_eq!(WorkerPool::resolve_thread_count(Some(3)), 3);
        assert!(WorkerPool::resolve_thread_count(None) >= 1);
        assert!(WorkerPool::resolve_thread_count(Some(0)) >= 1);
    }

    #[test]
    fn every_submitted_task_runs_once() {
        let pool = WorkerPool::start(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = mpsc::channel();

        for _ in 0..100 {
            let counter = counter.clone();
            let done_tx = done_tx.clone();
            pool.submit_fn("count", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                done_tx.send(())?;
                Ok(())
            })
            .unwrap();
        }

        for _ in 0..100 {
            done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 100);
        assert_eq!(pool.thread_count(), 4);
    }

    #[test]
    fn failing_and_panicking_tasks_do_not_kill_the_worker() {
        let pool = WorkerPool::start(1).unwrap();
        let (done_tx, done_rx) = mpsc::channel();

        pool.submit_fn("fails", || anyhow::bail!("expected failure")).unwrap();
        pool.submit_fn("panics", || panic!("expected panic")).unwrap();
        pool.submit_fn("survivor", move || {
            done_tx.send(())?;
            Ok(())
        })
        .unwrap();

        done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    }

    #[test]
    fn stop_joins_workers_and_rejects_new_work() {
        let mut pool = WorkerPool::start(2).unwrap();
        pool.stop();

        assert!(pool.is_stopped());
        assert_eq!(pool.thread_count(), 0);
        assert!(pool.submit_fn("late", || Ok(())).is_err());

        // A second stop is harmless.
        pool.stop();
    }

    #[test]
    fn stop_lets_running_tasks_finish() {
        let mut pool = WorkerPool::start(1).unwrap();
        let finished = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = mpsc::channel();

        let flag = finished.clone();
        pool.submit_fn("slow", move || {
            started_tx.send(())?;
            thread::sleep(Duration::from_millis(50));
            flag.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        started_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        pool.stop();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
