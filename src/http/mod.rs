//! # HTTP Request Module
//!
//! Cancellable HTTPS requests whose connection is released exactly once.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──open_connection──▶ Connecting ──▶ NoBody  (released immediately)
//!                               │      └──▶ HasBody ──close / drop──▶ Closed
//!                               │              │
//!                               └── cancel ────┴──────▶ Canceled  (released)
//! ```
//!
//! - [`HttpRequest::open_connection`] refuses anything but `https` before any
//!   I/O, opens a connection through the request's [`Connector`], and
//!   classifies the status. 1xx, 204 and 304 are bodyless.
//! - [`HttpRequest::cancel`] may be called from any thread at any time and
//!   never waits for a body read in progress.
//! - [`HttpRequest::close`] and [`HttpResponse::disconnect`] are idempotent.
//!
//! ## Transport
//!
//! The core only knows the [`Connector`]/[`Connection`] traits.
//! [`ReqwestConnector`] is the default implementation on top of
//! `reqwest::blocking`; tests and embedders can supply their own.

mod connection;
mod reqwest_connector;
mod request;
mod response;

pub use connection::{AbortHandle, Connection, Connector};
pub use reqwest_connector::ReqwestConnector;
pub use request::{has_response_body, HttpRequest, RequestType};
pub use response::HttpResponse;
