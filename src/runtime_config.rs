//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for the worker lane and the
//! default connection opener.
//!
//! ## Environment Variables
//!
//! ### `AUTHLANE_WORKER_STACK_SIZE`
//!
//! Stack size of the worker lane thread. Accepts values in:
//! - Decimal: `262144` (256 KB)
//! - Hexadecimal: `0x40000` (256 KB)
//!
//! Default: `0x40000` (256 KB). TLS handshakes and response parsing run on
//! this thread, so it is sized well above a coroutine stack.
//!
//! ### `AUTHLANE_CONNECT_TIMEOUT_MS` / `AUTHLANE_READ_TIMEOUT_MS`
//!
//! Timeouts applied by [`ReqwestConnector`](crate::http::ReqwestConnector).
//! Defaults: 15000 ms / 10000 ms. A value of `0` disables the timeout.
//!
//! ### `AUTHLANE_USER_AGENT`
//!
//! User agent sent by the default connection opener.
//!
//! ## Usage
//!
//! ```rust
//! use authlane::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Worker stack: {} bytes", config.stack_size);
//! ```

use serde::Deserialize;
use std::env;
use std::time::Duration;

const DEFAULT_STACK_SIZE: usize = 0x40000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;

/// Default user agent for outbound requests
pub const DEFAULT_USER_AGENT: &str = concat!("authlane/", env!("CARGO_PKG_VERSION"));

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`]. The struct also
/// deserializes from a host application's own configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Stack size for the worker lane thread in bytes
    pub stack_size: usize,
    /// Connection establishment timeout in milliseconds (0 = none)
    pub connect_timeout_ms: u64,
    /// Response read timeout in milliseconds (0 = none)
    pub read_timeout_ms: u64,
    /// User agent for outbound requests
    pub user_agent: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("AUTHLANE_WORKER_STACK_SIZE")
            .ok()
            .and_then(|s| parse_size(&s))
            .unwrap_or(DEFAULT_STACK_SIZE);

        let connect_timeout_ms = env::var("AUTHLANE_CONNECT_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS);

        let read_timeout_ms = env::var("AUTHLANE_READ_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_READ_TIMEOUT_MS);

        let user_agent =
            env::var("AUTHLANE_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        RuntimeConfig {
            stack_size,
            connect_timeout_ms,
            read_timeout_ms,
            user_agent,
        }
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.read_timeout_ms)
    }
}

/// Parse a byte size given in decimal or `0x`-prefixed hexadecimal
pub(crate) fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
