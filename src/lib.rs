//! # authlane
//!
//! **authlane** is the concurrency and networking core of an OAuth/OIDC client: a dual-lane
//! task dispatcher that keeps blocking network work off the application's main thread, and a
//! cancellable HTTPS request whose connection is released exactly once on every exit path.
//!
//! ## Architecture
//!
//! - **[`dispatcher`]** - Routes [`Task`](dispatcher::Task)s by kind: request tasks to the
//!   single worker lane, callback tasks to the callback lane
//! - **[`worker_lane`]** - One background thread executing tasks strictly in submission order
//! - **[`looper`]** - Default callback lane bound to the application's main thread
//! - **[`http`]** - [`HttpRequest`](http::HttpRequest) lifecycle, response classification and
//!   the pluggable [`Connector`](http::Connector) transport
//! - **[`error`]** - One error taxonomy for both halves
//! - **[`runtime_config`]** / **[`logging`]** - Environment-driven configuration and
//!   structured logging setup
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Dispatcher
//!     participant Worker as Worker Lane
//!     participant Request as HttpRequest
//!     participant Callback as Callback Lane
//!
//!     Caller->>Dispatcher: request.dispatch(&dispatcher, parse, callback)
//!     Dispatcher->>Worker: Task::request (lazy lane spawn, FIFO)
//!     Worker->>Request: open_connection()
//!     Request->>Request: https check, connect, cancel re-check, status
//!     alt 1xx / 204 / 304
//!         Request->>Request: disconnect immediately
//!     else body
//!         Request-->>Worker: HttpResponse (connection held)
//!         Worker->>Worker: parse(response)
//!         Worker->>Request: close()
//!     end
//!     Worker->>Dispatcher: Task::callback(result)
//!     Dispatcher->>Callback: executor / main looper
//!     Callback-->>Caller: callback(Result<T, Error>)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use authlane::dispatcher::{Dispatcher, InlineExecutor};
//! use authlane::http::{HttpRequest, ReqwestConnector, RequestType};
//! use authlane::runtime_config::RuntimeConfig;
//! use std::io::Read;
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::with_executor(Arc::new(InlineExecutor));
//! let connector = Arc::new(ReqwestConnector::new(&RuntimeConfig::from_env())?);
//! let request = HttpRequest::parse(
//!     RequestType::Configuration,
//!     "https://example.okta.com/.well-known/openid-configuration",
//!     connector,
//! )?;
//!
//! request.dispatch(
//!     &dispatcher,
//!     |mut response| Ok(response.text()?),
//!     |result| match result {
//!         Ok(body) => println!("discovery: {}", body),
//!         Err(e) if e.is_canceled() => println!("canceled"),
//!         Err(e) => eprintln!("failed: {}", e),
//!     },
//! )?;
//! # Ok::<(), authlane::Error>(())
//! ```
//!
//! ## Threading Rules
//!
//! - Only the worker lane blocks on the network
//! - Worker tasks run one at a time, in submission order
//! - A callback submitted on the main thread (default looper) runs inline
//! - Cancellation is best-effort: it releases the connection without
//!   waiting on a read in progress, but bytes already in flight may land
//! - After shutdown the worker lane takes no new requests, while callbacks
//!   keep flowing to the callback context so queued requests still report

pub mod dispatcher;
pub mod error;
pub mod http;
pub mod ids;
pub mod logging;
pub mod looper;
pub mod runtime_config;
pub mod worker_lane;

pub use dispatcher::{CallbackContext, Dispatcher, Executor, ExecutorService, Task, TaskKind};
pub use error::{Error, Result};
pub use crate::http::{HttpRequest, HttpResponse, RequestType};
pub use looper::{MainHandle, MainLooper};
