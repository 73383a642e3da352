//! # Dispatcher Module
//!
//! Routes units of work between two execution lanes.
//!
//! ## Overview
//!
//! The dispatcher is a single submission facade over:
//!
//! - **Worker lane**: one background thread, FIFO, the only place blocking
//!   network I/O is allowed to happen
//! - **Callback lane**: where completion notifications run, either a
//!   caller-supplied [`Executor`] or the [`MainLooper`](crate::looper::MainLooper)
//!   bound to the application's main thread
//!
//! Work is tagged at construction with [`Task::request`] or
//! [`Task::callback`]; the dispatcher never inspects what a task does, only
//! its [`TaskKind`].
//!
//! ## Request Flow
//!
//! 1. Caller submits a request-kind task carrying the network call
//! 2. Dispatcher lazily spawns the worker lane and enqueues the task
//! 3. The task runs, producing a result or an error
//! 4. The task submits a callback-kind task carrying that result
//! 5. Dispatcher hands the callback to the callback lane
//!
//! [`HttpRequest::dispatch`](crate::http::HttpRequest::dispatch) wires steps
//! 1-5 together.
//!
//! ## Shutdown
//!
//! [`Dispatcher::shutdown`] is graceful: queued worker tasks drain, pending
//! main-looper posts are dropped, later request tasks are rejected. Callback
//! tasks keep routing to the callback context so drained requests can still
//! report their results.
//! [`Dispatcher::shutdown_now`] is deliberately unsupported, and termination
//! is not tracked: [`Dispatcher::is_terminated`] and
//! [`Dispatcher::await_termination`] always report `false`.

mod core;
mod task;

pub use self::core::{CallbackContext, Dispatcher, Executor, ExecutorService, InlineExecutor};
pub use self::task::{Job, Task, TaskKind};
