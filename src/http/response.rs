use super::connection::ConnectionSlot;
use http::{HeaderMap, StatusCode};
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

/// Response produced by [`HttpRequest::open_connection`](super::HttpRequest::open_connection)
///
/// Bodyless responses (1xx, 204, 304) carry only status and headers; their
/// connection is already released. Responses with a body keep the connection
/// open and stream it through [`Read`]. Dropping the response releases the
/// connection, as do [`disconnect`](Self::disconnect) and the owning
/// request's `close`/`cancel`; whichever comes first wins.
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    content_length: Option<u64>,
    body: Option<Arc<ConnectionSlot>>,
}

impl HttpResponse {
    pub(crate) fn bodyless(status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            status,
            headers,
            content_length: None,
            body: None,
        }
    }

    pub(crate) fn streaming(
        status: StatusCode,
        headers: HeaderMap,
        content_length: Option<u64>,
        slot: Arc<ConnectionSlot>,
    ) -> Self {
        Self {
            status,
            headers,
            content_length,
            body: Some(slot),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup returning the first value as text
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Declared body length; `None` for bodyless responses or when unknown
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// `true` when the status allows a body and the connection was kept open for it
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// `true` once the underlying connection has been released
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.body.as_ref().map_or(true, |slot| slot.is_released())
    }

    /// Release the connection; later calls are no-ops
    pub fn disconnect(&self) {
        if let Some(slot) = &self.body {
            slot.release();
        }
    }

    /// Read the remaining body as UTF-8 text
    ///
    /// # Errors
    ///
    /// I/O failures from the connection, or `InvalidData` for non-UTF-8 bodies.
    pub fn text(&mut self) -> io::Result<String> {
        let mut body = String::new();
        self.read_to_string(&mut body)?;
        Ok(body)
    }
}

impl Read for HttpResponse {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &self.body {
            Some(slot) => slot.read(buf),
            None => Ok(0),
        }
    }
}

impl Drop for HttpResponse {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .field("has_body", &self.has_body())
            .finish()
    }
}
