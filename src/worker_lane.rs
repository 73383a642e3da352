//! # Worker Lane Module
//!
//! The single background thread on which all blocking network work runs.
//!
//! ## Features
//!
//! - **One thread**: exactly one OS thread per lane, so tasks never overlap
//! - **FIFO**: tasks run in submission order through a `may` MPSC channel
//! - **Panic isolation**: a panicking task is logged and the lane keeps going
//! - **Graceful shutdown**: closing the lane lets queued work drain, then the
//!   thread exits
//! - **Metrics**: dispatched/completed/panicked counts and queue depth
//!
//! ## Configuration
//!
//! - `AUTHLANE_WORKER_STACK_SIZE`: thread stack size (see [`crate::runtime_config`])

use crate::dispatcher::{Executor, ExecutorService, Task};
use crate::error::{Error, Result};
use crate::runtime_config::RuntimeConfig;
use may::sync::mpsc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, info, warn};

/// Default name of the worker thread
pub const DEFAULT_THREAD_NAME: &str = "authlane-worker";

/// Configuration for a worker lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLaneConfig {
    /// Name given to the OS thread (shows up in logs and debuggers)
    pub thread_name: String,
    /// Stack size of the OS thread in bytes
    pub stack_size: usize,
}

impl WorkerLaneConfig {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_runtime(&RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: runtime.stack_size,
        }
    }

    /// Create a custom configuration
    pub fn new(thread_name: impl Into<String>, stack_size: usize) -> Self {
        Self {
            thread_name: thread_name.into(),
            stack_size,
        }
    }
}

impl Default for WorkerLaneConfig {
    fn default() -> Self {
        Self::from_runtime(&RuntimeConfig::default())
    }
}

/// Metrics for a worker lane
#[derive(Debug, Default)]
pub struct LaneMetrics {
    /// Total tasks accepted
    pub dispatched_count: AtomicU64,
    /// Total tasks finished (including panicked ones)
    pub completed_count: AtomicU64,
    /// Tasks that panicked
    pub panicked_count: AtomicU64,
    /// Tasks accepted but not yet finished (approximate)
    pub queue_depth: AtomicUsize,
}

impl LaneMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatch(&self) {
        self.dispatched_count.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.panicked_count.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get_dispatched_count(&self) -> u64 {
        self.dispatched_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_panicked_count(&self) -> u64 {
        self.panicked_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }
}

/// A single-threaded FIFO execution lane
pub struct WorkerLane {
    config: WorkerLaneConfig,
    /// `None` once the lane is shut down
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    metrics: Arc<LaneMetrics>,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerLane {
    /// Spawn the lane thread
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the OS refuses to create the thread.
    pub fn spawn(config: WorkerLaneConfig) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Task>();
        let metrics = Arc::new(LaneMetrics::new());
        let worker_metrics = Arc::clone(&metrics);
        let lane_name = config.thread_name.clone();

        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .stack_size(config.stack_size)
            .spawn(move || {
                debug!(lane = %lane_name, "Worker lane started");

                // Exits once every sender is dropped and the queue is drained
                for task in rx.iter() {
                    let kind = task.kind();
                    if let Err(panic) =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| task.run()))
                    {
                        worker_metrics.record_panic();
                        error!(
                            lane = %lane_name,
                            kind = %kind,
                            panic_message = ?panic,
                            "Worker lane task panicked"
                        );
                    }
                    worker_metrics.record_completion();
                }

                debug!(lane = %lane_name, "Worker lane exiting");
            })?;

        info!(
            lane = %config.thread_name,
            stack_size = config.stack_size,
            "Created worker lane"
        );

        Ok(Self {
            thread_id: handle.thread().id(),
            config,
            sender: Mutex::new(Some(tx)),
            metrics,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Enqueue a task; it runs after every previously enqueued task
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] once the lane is shut down.
    pub fn execute(&self, task: Task) -> Result<()> {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            warn!(lane = %self.config.thread_name, "Task submitted to shut down worker lane");
            return Err(Error::Rejected("worker lane is shut down"));
        };

        self.metrics.record_dispatch();
        if sender.send(task).is_err() {
            // Receiver gone: the thread died outside a task
            self.metrics.record_completion();
            error!(lane = %self.config.thread_name, "Worker lane channel disconnected");
            return Err(Error::Rejected("worker lane is not running"));
        }
        Ok(())
    }

    /// Stop accepting work; already queued tasks still run
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_some() {
            info!(
                lane = %self.config.thread_name,
                pending = self.metrics.get_queue_depth(),
                "Worker lane shutting down"
            );
        }
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Wait for the lane thread to exit
    ///
    /// Blocks forever unless [`shutdown`](Self::shutdown) has been called.
    /// Returns `false` if the thread was already joined or died abnormally.
    pub fn join(&self) -> bool {
        let handle = self.handle.lock().take();
        match handle {
            Some(h) => h.join().is_ok(),
            None => false,
        }
    }

    /// Identity of the lane thread
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<LaneMetrics> {
        &self.metrics
    }

    #[must_use]
    pub fn config(&self) -> &WorkerLaneConfig {
        &self.config
    }
}

impl Executor for WorkerLane {
    fn execute(&self, task: Task) -> Result<()> {
        WorkerLane::execute(self, task)
    }
}

impl ExecutorService for WorkerLane {
    fn shutdown(&self) {
        WorkerLane::shutdown(self)
    }

    fn is_shutdown(&self) -> bool {
        WorkerLane::is_shutdown(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    fn test_lane() -> WorkerLane {
        WorkerLane::spawn(WorkerLaneConfig::new("lane-test", 0x20000)).unwrap()
    }

    #[test]
    fn test_lane_config_default() {
        let config = WorkerLaneConfig::default();
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
        assert_eq!(config.stack_size, RuntimeConfig::default().stack_size);
    }

    #[test]
    fn test_lane_metrics() {
        let metrics = LaneMetrics::new();
        assert_eq!(metrics.get_dispatched_count(), 0);
        assert_eq!(metrics.get_queue_depth(), 0);

        metrics.record_dispatch();
        assert_eq!(metrics.get_dispatched_count(), 1);
        assert_eq!(metrics.get_queue_depth(), 1);

        metrics.record_panic();
        metrics.record_completion();
        assert_eq!(metrics.get_completed_count(), 1);
        assert_eq!(metrics.get_panicked_count(), 1);
        assert_eq!(metrics.get_queue_depth(), 0);
    }

    #[test]
    fn test_tasks_run_on_lane_thread() {
        let lane = test_lane();
        let (tx, rx) = std_mpsc::channel();
        lane.execute(Task::request(move || {
            tx.send(thread::current().id()).unwrap();
        }))
        .unwrap();

        let ran_on = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ran_on, lane.thread_id());
        assert_ne!(ran_on, thread::current().id());
    }

    #[test]
    fn test_shutdown_drains_then_rejects() {
        let lane = test_lane();
        let (tx, rx) = std_mpsc::channel();
        for i in 0..5 {
            let tx = tx.clone();
            lane.execute(Task::request(move || {
                thread::sleep(Duration::from_millis(2));
                tx.send(i).unwrap();
            }))
            .unwrap();
        }
        lane.shutdown();
        assert!(lane.is_shutdown());
        assert!(matches!(
            lane.execute(Task::request(|| {})),
            Err(Error::Rejected(_))
        ));

        assert!(lane.join());
        let seen: Vec<i32> = rx.try_iter().collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(lane.metrics().get_completed_count(), 5);
    }

    #[test]
    fn test_panicking_task_does_not_stop_lane() {
        let lane = test_lane();
        lane.execute(Task::request(|| panic!("boom"))).unwrap();

        let (tx, rx) = std_mpsc::channel();
        lane.execute(Task::request(move || tx.send(()).unwrap()))
            .unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        lane.shutdown();
        assert!(lane.join());
        assert_eq!(lane.metrics().get_panicked_count(), 1);
        assert_eq!(lane.metrics().get_completed_count(), 2);
    }

    #[test]
    fn test_double_shutdown_and_join() {
        let lane = test_lane();
        lane.shutdown();
        lane.shutdown();
        assert!(lane.join());
        assert!(!lane.join());
    }
}
