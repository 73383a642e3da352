use super::connection::{ConnectionGuard, ConnectionSlot, Connector};
use super::response::HttpResponse;
use crate::dispatcher::{Dispatcher, Task};
use crate::error::{Error, Result};
use crate::ids::RequestId;
use http::StatusCode;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

const HTTPS_SCHEME: &str = "https";

/// What an HTTP request is for; used in diagnostics only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    /// Discovery document fetch
    Configuration,
    /// Authorization code for tokens
    TokenExchange,
    /// Refresh token grant
    RefreshToken,
    RevokeToken,
    Introspect,
    /// Userinfo endpoint
    Profile,
    /// Arbitrary call authorized with an access token
    Authorized,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestType::Configuration => "CONFIGURATION",
            RequestType::TokenExchange => "TOKEN_EXCHANGE",
            RequestType::RefreshToken => "REFRESH_TOKEN",
            RequestType::RevokeToken => "REVOKE_TOKEN",
            RequestType::Introspect => "INTROSPECT",
            RequestType::Profile => "PROFILE",
            RequestType::Authorized => "AUTHORIZED",
        };
        f.write_str(name)
    }
}

/// `false` for informational statuses, 204 No Content and 304 Not Modified
#[must_use]
pub fn has_response_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

struct Inner {
    id: RequestId,
    kind: RequestType,
    uri: Url,
    connector: Arc<dyn Connector>,
    canceled: AtomicBool,
    /// Connection kept open for a response body; `None` once released
    response: Mutex<Option<Arc<ConnectionSlot>>>,
}

/// A cancellable HTTPS request
///
/// Clones share state, so one clone can run [`open_connection`](Self::open_connection)
/// on the worker lane while another calls [`cancel`](Self::cancel) from any
/// thread.
///
/// Cancellation is best-effort. It returns without waiting for a body read in
/// progress on the worker, and every later read fails. A transport with an
/// [`AbortHandle`](super::AbortHandle) has that read interrupted; otherwise
/// the read's current chunk still lands before the connection closes. Bytes
/// already handed to the caller stay handed.
#[derive(Clone)]
pub struct HttpRequest {
    inner: Arc<Inner>,
}

impl HttpRequest {
    pub fn new(kind: RequestType, uri: Url, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: RequestId::new(),
                kind,
                uri,
                connector,
                canceled: AtomicBool::new(false),
                response: Mutex::new(None),
            }),
        }
    }

    /// Parse `uri` and build a request
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `uri` is not a valid absolute URL. The
    /// scheme is checked later, by [`open_connection`](Self::open_connection).
    pub fn parse(kind: RequestType, uri: &str, connector: Arc<dyn Connector>) -> Result<Self> {
        let uri = Url::parse(uri)
            .map_err(|e| Error::InvalidArgument(format!("invalid uri '{}': {}", uri, e)))?;
        Ok(Self::new(kind, uri, connector))
    }

    #[must_use]
    pub fn id(&self) -> RequestId {
        self.inner.id
    }

    #[must_use]
    pub fn kind(&self) -> RequestType {
        self.inner.kind
    }

    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.inner.uri
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::SeqCst)
    }

    /// Open the connection and read the response status
    ///
    /// Blocks for the whole connect + status round trip, so it must run on
    /// the worker lane.
    ///
    /// Bodyless responses come back with their connection already released.
    /// Responses with a body keep the connection open until the response is
    /// dropped or [`close`](Self::close)/[`cancel`](Self::cancel) is called.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a non-`https` URI, before any I/O
    /// - [`Error::Canceled`] if the request was canceled before or during the handshake
    /// - [`Error::Protocol`] if no valid status code can be discerned
    /// - [`Error::Transport`] for any other I/O failure
    ///
    /// The connection is released before any error is returned.
    pub fn open_connection(&self) -> Result<HttpResponse> {
        let inner = &self.inner;
        if inner.uri.scheme() != HTTPS_SCHEME {
            warn!(request_id = %inner.id, uri = %inner.uri, "Rejected non-https request");
            return Err(Error::InvalidArgument(
                "only https connections are permitted".to_string(),
            ));
        }
        if self.is_canceled() {
            return Err(Error::Canceled);
        }

        debug!(request_id = %inner.id, kind = %inner.kind, uri = %inner.uri, "Opening connection");
        let mut guard = ConnectionGuard::new(inner.connector.open(&inner.uri)?);
        guard.get()?.connect()?;

        if self.is_canceled() {
            debug!(request_id = %inner.id, "Request canceled during connect");
            guard.release();
            return Err(Error::Canceled);
        }

        let status = match guard.get()?.response_code()? {
            Some(code) => StatusCode::from_u16(code).map_err(|_| {
                Error::Protocol(format!("invalid response code {}", code))
            })?,
            None => {
                return Err(Error::Protocol(
                    "invalid response code -1 no code can be discerned".to_string(),
                ))
            }
        };
        let headers = guard.get()?.headers();

        if !has_response_body(status) {
            guard.release();
            debug!(request_id = %inner.id, status = status.as_u16(), "Bodyless response");
            return Ok(HttpResponse::bodyless(status, headers));
        }

        let content_length = guard.get()?.content_length();
        let Some(conn) = guard.into_inner() else {
            return Err(Error::Transport(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "connection released",
            )));
        };
        let slot = Arc::new(ConnectionSlot::new(conn));
        if let Some(previous) = inner.response.lock().replace(Arc::clone(&slot)) {
            previous.release();
        }

        // A cancel that ran before the slot was published found nothing to release
        if self.is_canceled() {
            self.close();
            return Err(Error::Canceled);
        }

        debug!(
            request_id = %inner.id,
            status = status.as_u16(),
            content_length = ?content_length,
            "Response body pending"
        );
        Ok(HttpResponse::streaming(
            status,
            headers,
            content_length,
            slot,
        ))
    }

    /// Cancel from any thread
    ///
    /// Sets the cancellation flag and releases the held connection, if any,
    /// without waiting on a read in progress. A later
    /// [`open_connection`](Self::open_connection) on this request fails with
    /// [`Error::Canceled`].
    pub fn cancel(&self) {
        if !self.inner.canceled.swap(true, Ordering::SeqCst) {
            info!(request_id = %self.inner.id, kind = %self.inner.kind, "Request canceled");
        }
        self.close();
    }

    /// Release the held connection; repeated calls are no-ops
    pub fn close(&self) {
        let slot = self.inner.response.lock().take();
        if let Some(slot) = slot {
            if slot.release() {
                let age_ms = self.inner.id.created_at().elapsed().ok().map(|d| d.as_millis());
                debug!(request_id = %self.inner.id, age_ms = ?age_ms, "Connection released");
            }
        }
    }

    /// Run the request synchronously: open, hand the response to `parse`, close
    ///
    /// `parse` must finish with the response body before returning; the
    /// connection is released right after it.
    ///
    /// # Errors
    ///
    /// Anything [`open_connection`](Self::open_connection) or `parse` returns.
    pub fn execute<T, P>(&self, parse: P) -> Result<T>
    where
        P: FnOnce(HttpResponse) -> Result<T>,
    {
        let result = self.open_connection().and_then(parse);
        self.close();
        result
    }

    /// Run the request on the dispatcher's worker lane and deliver the
    /// outcome to `callback` on its callback lane
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if the dispatcher no longer accepts work. Failures
    /// of the request itself go to `callback`. If the callback lane refuses
    /// the result, `callback` runs on the worker with that rejection instead,
    /// so it is always called exactly once.
    pub fn dispatch<T, P, C>(&self, dispatcher: &Dispatcher, parse: P, callback: C) -> Result<()>
    where
        T: Send + 'static,
        P: FnOnce(HttpResponse) -> Result<T> + Send + 'static,
        C: FnOnce(Result<T>) + Send + 'static,
    {
        let request = self.clone();
        let callbacks = dispatcher.clone();
        dispatcher.submit(Task::request(move || {
            let result = request.execute(parse);
            if let Err(err) = &result {
                debug!(request_id = %request.id(), error = %err, "Request failed");
            }

            let delivery = Arc::new(Mutex::new(Some((callback, result))));
            let pending = Arc::clone(&delivery);
            let task = Task::callback(move || {
                let ready = pending.lock().take();
                if let Some((callback, result)) = ready {
                    callback(result);
                }
            });
            if let Err(err) = callbacks.submit(task) {
                // The callback lane refused it; report the refusal here instead
                warn!(
                    request_id = %request.id(),
                    error = %err,
                    "Callback lane rejected result, delivering on worker"
                );
                let undelivered = delivery.lock().take();
                if let Some((callback, _)) = undelivered {
                    callback(Err(err));
                }
            }
        }))
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RequestType={} URI={}",
            self.inner.kind, self.inner.uri
        )
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("uri", &self.inner.uri.as_str())
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_response_body() {
        assert!(!has_response_body(StatusCode::CONTINUE));
        assert!(!has_response_body(StatusCode::SWITCHING_PROTOCOLS));
        assert!(!has_response_body(StatusCode::from_u16(199).unwrap()));
        assert!(!has_response_body(StatusCode::NO_CONTENT));
        assert!(!has_response_body(StatusCode::NOT_MODIFIED));

        assert!(has_response_body(StatusCode::OK));
        assert!(has_response_body(StatusCode::CREATED));
        assert!(has_response_body(StatusCode::RESET_CONTENT));
        assert!(has_response_body(StatusCode::BAD_REQUEST));
        assert!(has_response_body(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_request_type_display() {
        assert_eq!(RequestType::TokenExchange.to_string(), "TOKEN_EXCHANGE");
        assert_eq!(RequestType::Configuration.to_string(), "CONFIGURATION");
    }
}
