use http::HeaderMap;
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Interrupts a connection from another thread without borrowing it
///
/// Called while the owning thread may be blocked in
/// [`Connection::read_body`]; after it runs that read should return promptly.
pub type AbortHandle = Arc<dyn Fn() + Send + Sync>;

/// Opens connections to a URL
///
/// The request core depends only on this contract; TLS setup, proxies and
/// request bodies are the opener's business.
pub trait Connector: Send + Sync {
    /// Prepare a connection to `url` without performing any I/O yet
    ///
    /// # Errors
    ///
    /// Any I/O failure while preparing the connection.
    fn open(&self, url: &Url) -> io::Result<Box<dyn Connection>>;
}

/// One HTTP exchange over an opened connection
pub trait Connection: Send {
    /// Establish the connection and send the request
    fn connect(&mut self) -> io::Result<()>;

    /// The numeric response status, or `None` when no valid code can be discerned
    fn response_code(&mut self) -> io::Result<Option<u16>>;

    /// Response headers (valid after a status has been read)
    fn headers(&self) -> HeaderMap;

    /// Declared length of the response body, if known
    fn content_length(&self) -> Option<u64>;

    /// Read the next chunk of the response body
    fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Release the underlying connection
    fn disconnect(&mut self);

    /// Handle that unblocks a pending [`read_body`](Self::read_body)
    ///
    /// Transports that cannot interrupt a read return `None`; a cancelled
    /// read then finishes its current chunk before the connection closes.
    fn abort_handle(&self) -> Option<AbortHandle> {
        None
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection already released")
}

/// Exclusive holder of an open connection shared by a request and its response
///
/// Whoever calls [`release`](Self::release) first wins; every later call is
/// a no-op. `release` never waits for a read in progress: it marks the slot
/// released, aborts the read if the transport allows it, and leaves the
/// disconnect to the reader when the reader holds the connection.
pub(crate) struct ConnectionSlot {
    conn: Mutex<Option<Box<dyn Connection>>>,
    released: AtomicBool,
    abort: Option<AbortHandle>,
}

impl ConnectionSlot {
    pub(crate) fn new(conn: Box<dyn Connection>) -> Self {
        Self {
            abort: conn.abort_handle(),
            conn: Mutex::new(Some(conn)),
            released: AtomicBool::new(false),
        }
    }

    /// Mark released and disconnect; returns `true` if this call did the release
    pub(crate) fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        match self.conn.try_lock() {
            Some(mut held) => {
                if let Some(mut conn) = held.take() {
                    conn.disconnect();
                }
            }
            // A reader holds the connection and disconnects once it returns
            None => {
                if let Some(abort) = &self.abort {
                    abort();
                }
            }
        }
        true
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub(crate) fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_released() {
            self.settle();
            return Err(not_connected());
        }
        let result = match self.conn.lock().as_mut() {
            Some(conn) => conn.read_body(buf),
            None => Err(not_connected()),
        };
        // Checked after unlocking: a release that found the lock taken relies on it
        if self.is_released() {
            self.settle();
        }
        result
    }

    fn settle(&self) {
        let conn = self.conn.lock().take();
        if let Some(mut conn) = conn {
            conn.disconnect();
        }
    }
}

/// Owns a connection on the worker's open path and disconnects it on drop
///
/// Every early return in `open_connection` goes through this guard, so an
/// error never leaks the connection.
pub(crate) struct ConnectionGuard {
    conn: Option<Box<dyn Connection>>,
}

impl ConnectionGuard {
    pub(crate) fn new(conn: Box<dyn Connection>) -> Self {
        Self { conn: Some(conn) }
    }

    pub(crate) fn get(&mut self) -> io::Result<&mut (dyn Connection + 'static)> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection released"))
    }

    /// Disconnect now
    pub(crate) fn release(mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.disconnect();
        }
    }

    /// Hand the connection on without disconnecting it
    pub(crate) fn into_inner(mut self) -> Option<Box<dyn Connection>> {
        self.conn.take()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.disconnect();
        }
    }
}
