use std::fmt;
use std::io;

/// Errors raised by the dispatcher and by HTTP requests
///
/// A single taxonomy is shared by both halves of the crate so callers can
/// branch on one type: cancellation versus protocol versus transport failures
/// decide whether a request is worth retrying.
#[derive(Debug)]
pub enum Error {
    /// A request targeted a non-secure scheme, or an argument was malformed.
    ///
    /// Raised before any network I/O happens.
    InvalidArgument(String),
    /// The connection succeeded but no valid response status could be discerned.
    Protocol(String),
    /// The request was canceled before or during the call.
    Canceled,
    /// Any other I/O failure while connecting or reading.
    Transport(io::Error),
    /// The caller asked for an operation the dispatcher does not support.
    UnsupportedOperation(&'static str),
    /// Work was submitted after the target lane was shut down.
    Rejected(&'static str),
}

impl Error {
    /// `true` when the failure was caused by cancellation
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }

    /// `true` for the I/O class of failures (protocol, cancellation, transport)
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_) | Error::Canceled | Error::Transport(_)
        )
    }

    /// `true` when repeating the same request might succeed
    ///
    /// Only transport failures qualify. Nothing in this crate retries on its
    /// own; the policy belongs to the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Error::Canceled => write!(f, "request canceled"),
            Error::Transport(err) => write!(f, "transport error: {}", err),
            Error::UnsupportedOperation(op) => write!(f, "unsupported operation: {}", op),
            Error::Rejected(reason) => write!(f, "task rejected: {}", reason),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transport(err)
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::Canceled.is_canceled());
        assert!(Error::Canceled.is_io());
        assert!(!Error::Canceled.is_retryable());

        let protocol = Error::Protocol("no status".into());
        assert!(protocol.is_io());
        assert!(!protocol.is_retryable());

        let transport = Error::from(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(transport.is_io());
        assert!(transport.is_retryable());

        assert!(!Error::InvalidArgument("http".into()).is_io());
        assert!(!Error::UnsupportedOperation("shutdown_now").is_io());
        assert!(!Error::Rejected("lane shut down").is_io());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::InvalidArgument("only https connections are permitted".into()).to_string(),
            "invalid argument: only https connections are permitted"
        );
        assert_eq!(Error::Canceled.to_string(), "request canceled");
        assert_eq!(
            Error::UnsupportedOperation("shutdown_now").to_string(),
            "unsupported operation: shutdown_now"
        );
    }

    #[test]
    fn test_transport_source_is_exposed() {
        use std::error::Error as _;
        let err = Error::from(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert!(err.source().is_some());
        assert!(Error::Canceled.source().is_none());
    }
}
