//! # Task System Core Trait
//!
//! A [`Task`] is one unit of fire-and-forget work run on a pool worker. Tasks
//! own everything they need and publish their results through shared
//! structures such as the chunk registry; nothing is returned to the caller.
//!
//! ## Task Lifecycle
//! 1. A task is boxed and handed to `WorkerPool::submit`
//! 2. Any idle worker takes it off the shared queue
//! 3. `process` runs once on that worker, consuming the task
//! 4. An `Err` or a panic is logged by the worker, which then moves on

/// A unit of work that can be executed on a worker thread.
///
/// # Implementation Guidelines
/// - Must be `Send` to be moved to the worker
/// - Should own its data or hold `Arc`s to shared, synchronized state
/// - Should not block on other tasks, which could starve the pool
pub trait Task: Send {
    /// Short description used in log messages.
    fn name(&self) -> String;

    /// Runs the task, consuming it.
    ///
    /// # Returns
    /// `Ok(())` on success. Errors are logged by the worker and otherwise
    /// ignored, so tasks that need failure handling do it before returning.
    fn process(self: Box<Self>) -> anyhow::Result<()>;
}

/// Adapts a closure into a [`Task`].
pub struct ClosureTask<F> {
    name: String,
    work: F,
}

impl<F> ClosureTask<F>
where
    F: FnOnce() -> anyhow::Result<()> + Send,
{
    /// Wraps `work` under the given log name.
    pub fn new(name: impl Into<String>, work: F) -> Self {
        ClosureTask {
            name: name.into(),
            work,
        }
    }
}

impl<F> Task for ClosureTask<F>
where
    F: FnOnce() -> anyhow::Result<()> + Send,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn process(self: Box<Self>) -> anyhow::Result<()> {
        (self.work)()
    }
}
