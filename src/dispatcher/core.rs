//! Dispatcher core - routes tagged tasks to the worker lane or the callback lane.

use super::task::{Task, TaskKind};
use crate::error::{Error, Result};
use crate::looper::MainHandle;
use crate::worker_lane::{LaneMetrics, WorkerLane, WorkerLaneConfig};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// An execution context that accepts tasks for asynchronous execution
pub trait Executor: Send + Sync {
    /// Run `task` at some point, on a thread of the executor's choosing
    ///
    /// # Errors
    ///
    /// Implementations return [`Error::Rejected`] when they no longer accept work.
    fn execute(&self, task: Task) -> Result<()>;
}

/// An [`Executor`] that can also be shut down gracefully
///
/// When a dispatcher's callback context is an `ExecutorService`, shutting down
/// the dispatcher shuts the service down too.
pub trait ExecutorService: Executor {
    /// Stop accepting tasks; work already accepted may still run
    fn shutdown(&self);

    /// `true` once [`shutdown`](Self::shutdown) has been called
    fn is_shutdown(&self) -> bool;
}

/// Runs every task immediately on the submitting thread
///
/// Useful as a callback context for headless hosts and tests that have no
/// designated main thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        task.run();
        Ok(())
    }
}

/// Where callback-kind tasks run
#[derive(Clone)]
pub enum CallbackContext {
    /// The default main-thread looper; the dispatcher owns this handle
    Main(MainHandle),
    /// A caller-supplied executor; the caller keeps ownership
    Executor(Arc<dyn Executor>),
    /// A caller-supplied executor that is shut down with the dispatcher
    Service(Arc<dyn ExecutorService>),
}

impl fmt::Debug for CallbackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackContext::Main(handle) => f.debug_tuple("Main").field(handle).finish(),
            CallbackContext::Executor(_) => f.write_str("Executor(..)"),
            CallbackContext::Service(_) => f.write_str("Service(..)"),
        }
    }
}

enum LaneSlot {
    Idle,
    Running(WorkerLane),
    ShutDown,
}

struct Inner {
    worker: Mutex<LaneSlot>,
    callback: CallbackContext,
    shutdown: AtomicBool,
    config: WorkerLaneConfig,
}

/// Dual-lane task dispatcher
///
/// Every submitted [`Task`] is routed by its [`TaskKind`]:
///
/// - [`TaskKind::Request`] tasks run on a single background worker thread,
///   one at a time, in submission order. The thread is created on the first
///   request submission.
/// - [`TaskKind::Callback`] tasks run on the callback lane: the caller-supplied
///   executor if there is one, otherwise the main looper. With the main looper
///   a callback submitted from the main thread itself runs inline before
///   `submit` returns.
///
/// `Dispatcher` is cheap to clone; clones share both lanes. Create one per
/// client and pass it explicitly to every request.
///
/// ```rust
/// use authlane::dispatcher::{Dispatcher, InlineExecutor, Task};
/// use std::sync::Arc;
///
/// let dispatcher = Dispatcher::with_executor(Arc::new(InlineExecutor));
/// let callbacks = dispatcher.clone();
/// dispatcher
///     .submit(Task::request(move || {
///         // blocking network work here
///         let _ = callbacks.submit(Task::callback(|| println!("done")));
///     }))
///     .unwrap();
/// dispatcher.shutdown();
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Create a dispatcher with the given callback context and a worker lane
    /// configured from the environment
    #[must_use]
    pub fn new(callback: CallbackContext) -> Self {
        Self::with_config(callback, WorkerLaneConfig::from_env())
    }

    #[must_use]
    pub fn with_config(callback: CallbackContext, config: WorkerLaneConfig) -> Self {
        debug!(callback = ?callback, lane = %config.thread_name, "Dispatcher created");
        Dispatcher {
            inner: Arc::new(Inner {
                worker: Mutex::new(LaneSlot::Idle),
                callback,
                shutdown: AtomicBool::new(false),
                config,
            }),
        }
    }

    /// Deliver callbacks on the main looper behind `handle`
    #[must_use]
    pub fn on_main(handle: MainHandle) -> Self {
        Self::new(CallbackContext::Main(handle))
    }

    /// Deliver callbacks on a caller-owned executor
    #[must_use]
    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self::new(CallbackContext::Executor(executor))
    }

    /// Deliver callbacks on a caller-supplied service that shuts down with the dispatcher
    #[must_use]
    pub fn with_service(service: Arc<dyn ExecutorService>) -> Self {
        Self::new(CallbackContext::Service(service))
    }

    /// Route `task` to the lane matching its kind
    ///
    /// # Errors
    ///
    /// - [`Error::Rejected`] for request tasks after [`shutdown`](Self::shutdown),
    ///   or when the callback context no longer accepts work
    /// - [`Error::Transport`] if the worker thread could not be spawned
    ///
    /// Callback tasks are not gated by the shutdown flag: requests queued
    /// before shutdown still drain, and their results still need a lane.
    /// A [`CallbackContext::Service`] refuses them itself once shut down.
    pub fn submit(&self, task: Task) -> Result<()> {
        match task.kind() {
            TaskKind::Callback => self.dispatch_callback(task),
            TaskKind::Request => self.dispatch_request(task),
        }
    }

    /// Submit `f` as a request-kind task
    pub fn execute_request<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Task::request(f))
    }

    /// Submit `f` as a callback-kind task
    pub fn execute_callback<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Task::callback(f))
    }

    fn dispatch_callback(&self, task: Task) -> Result<()> {
        match &self.inner.callback {
            CallbackContext::Executor(executor) => executor.execute(task),
            CallbackContext::Service(service) => service.execute(task),
            CallbackContext::Main(handle) => {
                if handle.is_current_thread() {
                    trace!("Callback submitted on main thread, running inline");
                    task.run();
                    Ok(())
                } else if handle.post(task) {
                    trace!("Callback posted to main looper");
                    Ok(())
                } else {
                    warn!("Main looper has quit, callback dropped");
                    Err(Error::Rejected("main looper has quit"))
                }
            }
        }
    }

    fn dispatch_request(&self, task: Task) -> Result<()> {
        if self.is_shutdown() {
            warn!("Request submitted to shut down dispatcher");
            return Err(Error::Rejected("dispatcher is shut down"));
        }
        let mut slot = self.inner.worker.lock();
        if let LaneSlot::Idle = *slot {
            let lane = WorkerLane::spawn(self.inner.config.clone())?;
            *slot = LaneSlot::Running(lane);
        }
        match &*slot {
            LaneSlot::Running(lane) => lane.execute(task),
            _ => Err(Error::Rejected("worker lane is shut down")),
        }
    }

    /// Shut both lanes down gracefully
    ///
    /// Pending main-looper posts are dropped without running. A
    /// [`CallbackContext::Service`] is shut down. Work already queued on the
    /// worker lane still runs; new request tasks are rejected. Calling this
    /// more than once is harmless.
    pub fn shutdown(&self) {
        match &self.inner.callback {
            CallbackContext::Main(handle) => {
                let dropped = handle.remove_all();
                if dropped > 0 {
                    debug!(dropped, "Dropped pending main looper callbacks");
                }
            }
            CallbackContext::Service(service) => service.shutdown(),
            CallbackContext::Executor(_) => {}
        }

        let previous = std::mem::replace(&mut *self.inner.worker.lock(), LaneSlot::ShutDown);
        if let LaneSlot::Running(lane) = previous {
            lane.shutdown();
        }

        if !self.inner.shutdown.swap(true, Ordering::SeqCst) {
            info!("Dispatcher shut down");
        }
    }

    /// Forced termination is not supported; always fails
    ///
    /// # Errors
    ///
    /// Always [`Error::UnsupportedOperation`]. Use [`shutdown`](Self::shutdown).
    pub fn shutdown_now(&self) -> Result<Vec<Task>> {
        Err(Error::UnsupportedOperation("shutdown_now"))
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    /// Termination is not tracked; always `false`
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        false
    }

    /// Termination is not tracked; returns `false` immediately without waiting
    #[must_use]
    pub fn await_termination(&self, _timeout: Duration) -> bool {
        false
    }

    #[must_use]
    pub fn callback_context(&self) -> &CallbackContext {
        &self.inner.callback
    }

    /// Identity of the worker thread, if the lane has been created and not shut down
    #[must_use]
    pub fn worker_thread_id(&self) -> Option<ThreadId> {
        match &*self.inner.worker.lock() {
            LaneSlot::Running(lane) => Some(lane.thread_id()),
            _ => None,
        }
    }

    /// Worker lane metrics, if the lane has been created and not shut down
    #[must_use]
    pub fn worker_metrics(&self) -> Option<Arc<LaneMetrics>> {
        match &*self.inner.worker.lock() {
            LaneSlot::Running(lane) => Some(Arc::clone(lane.metrics())),
            _ => None,
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("callback", &self.inner.callback)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline_dispatcher() -> Dispatcher {
        Dispatcher::with_config(
            CallbackContext::Executor(Arc::new(InlineExecutor)),
            WorkerLaneConfig::new("dispatcher-unit", 0x20000),
        )
    }

    #[test]
    fn test_worker_lane_is_lazy() {
        let dispatcher = inline_dispatcher();
        assert!(dispatcher.worker_thread_id().is_none());

        dispatcher.execute_callback(|| {}).unwrap();
        assert!(dispatcher.worker_thread_id().is_none());

        dispatcher.execute_request(|| {}).unwrap();
        let first = dispatcher.worker_thread_id().unwrap();
        dispatcher.execute_request(|| {}).unwrap();
        assert_eq!(dispatcher.worker_thread_id(), Some(first));
        dispatcher.shutdown();
    }

    #[test]
    fn test_shutdown_state() {
        let dispatcher = inline_dispatcher();
        assert!(!dispatcher.is_shutdown());
        dispatcher.shutdown();
        assert!(dispatcher.is_shutdown());
        dispatcher.shutdown();
        assert!(dispatcher.is_shutdown());
        assert!(!dispatcher.is_terminated());
        assert!(!dispatcher.await_termination(Duration::from_millis(1)));
    }

    #[test]
    fn test_lane_never_recreated_after_shutdown() {
        let dispatcher = inline_dispatcher();
        dispatcher.shutdown();
        assert!(matches!(
            dispatcher.execute_request(|| {}),
            Err(Error::Rejected(_))
        ));
        assert!(dispatcher.worker_thread_id().is_none());
    }

    #[test]
    fn test_callbacks_still_routed_after_shutdown() {
        let dispatcher = inline_dispatcher();
        dispatcher.shutdown();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        dispatcher
            .execute_callback(move || flag.store(true, Ordering::SeqCst))
            .unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_shutdown_now_unsupported() {
        let dispatcher = inline_dispatcher();
        assert!(matches!(
            dispatcher.shutdown_now(),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(!dispatcher.is_shutdown());
    }
}
