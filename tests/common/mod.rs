#![allow(dead_code)]

pub mod mock_transport {
    use authlane::http::{AbortHandle, Connection, Connector};
    use http::{HeaderMap, HeaderName, HeaderValue};
    use std::io::{self, Cursor, Read};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};
    use url::Url;

    /// Counters shared between a test and the connections its connector hands out
    #[derive(Clone, Default)]
    pub struct Probe {
        opens: Arc<AtomicUsize>,
        connects: Arc<AtomicUsize>,
        reads: Arc<AtomicUsize>,
        disconnects: Arc<AtomicUsize>,
    }

    impl Probe {
        pub fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        pub fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        /// Number of `read_body` calls that have started
        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        pub fn disconnects(&self) -> usize {
            self.disconnects.load(Ordering::SeqCst)
        }

        /// Spin until a body read is in progress
        pub fn wait_for_read(&self) {
            let deadline = Instant::now() + Duration::from_secs(5);
            while self.reads() == 0 {
                assert!(Instant::now() < deadline, "no body read started");
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    type Hook = Arc<dyn Fn() + Send + Sync>;

    /// Scripted response served by [`MockConnector`]
    #[derive(Clone)]
    pub struct Script {
        status: Option<u16>,
        headers: Vec<(&'static str, &'static str)>,
        body: Vec<u8>,
        connect_error: Option<io::ErrorKind>,
        on_connect: Option<Hook>,
        read_delay: Option<Duration>,
        abortable: bool,
    }

    impl Script {
        pub fn status(code: u16) -> Self {
            Self {
                status: Some(code),
                headers: Vec::new(),
                body: Vec::new(),
                connect_error: None,
                on_connect: None,
                read_delay: None,
                abortable: false,
            }
        }

        /// A connection that never yields a valid status code
        pub fn no_status() -> Self {
            Self {
                status: None,
                ..Self::status(200)
            }
        }

        pub fn connect_error(kind: io::ErrorKind) -> Self {
            Self {
                connect_error: Some(kind),
                ..Self::status(200)
            }
        }

        pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
            self.headers.push((name, value));
            self
        }

        pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
            self.body = body.into();
            self
        }

        /// Make every body read stall for `delay` before returning data
        pub fn slow_read(mut self, delay: Duration) -> Self {
            self.read_delay = Some(delay);
            self
        }

        /// Hand out an abort handle that interrupts a stalled read
        pub fn abortable(mut self) -> Self {
            self.abortable = true;
            self
        }

        /// Run `hook` inside `connect()`, after the handshake "completes"
        pub fn on_connect<F>(mut self, hook: F) -> Self
        where
            F: Fn() + Send + Sync + 'static,
        {
            self.on_connect = Some(Arc::new(hook));
            self
        }
    }

    /// Connector that serves a [`Script`] and records what happened
    pub struct MockConnector {
        script: Script,
        probe: Probe,
    }

    impl MockConnector {
        pub fn new(script: Script) -> (Arc<Self>, Probe) {
            let probe = Probe::default();
            let connector = Arc::new(Self {
                script,
                probe: probe.clone(),
            });
            (connector, probe)
        }
    }

    impl Connector for MockConnector {
        fn open(&self, _url: &Url) -> io::Result<Box<dyn Connection>> {
            self.probe.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockConnection {
                script: self.script.clone(),
                probe: self.probe.clone(),
                body: Cursor::new(self.script.body.clone()),
                aborted: Arc::new(AtomicBool::new(false)),
            }))
        }
    }

    struct MockConnection {
        script: Script,
        probe: Probe,
        body: Cursor<Vec<u8>>,
        aborted: Arc<AtomicBool>,
    }

    impl Connection for MockConnection {
        fn connect(&mut self) -> io::Result<()> {
            self.probe.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(kind) = self.script.connect_error {
                return Err(io::Error::new(kind, "scripted connect failure"));
            }
            if let Some(hook) = &self.script.on_connect {
                hook();
            }
            Ok(())
        }

        fn response_code(&mut self) -> io::Result<Option<u16>> {
            Ok(self.script.status)
        }

        fn headers(&self) -> HeaderMap {
            let mut headers = HeaderMap::new();
            for &(name, value) in &self.script.headers {
                headers.append(HeaderName::from_static(name), HeaderValue::from_static(value));
            }
            headers
        }

        fn content_length(&self) -> Option<u64> {
            Some(self.script.body.len() as u64)
        }

        fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.probe.reads.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.script.read_delay {
                let until = Instant::now() + delay;
                while Instant::now() < until {
                    if self.aborted.load(Ordering::SeqCst) {
                        return Err(io::Error::new(io::ErrorKind::ConnectionAborted, "aborted"));
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            }
            self.body.read(buf)
        }

        fn disconnect(&mut self) {
            self.probe.disconnects.fetch_add(1, Ordering::SeqCst);
        }

        fn abort_handle(&self) -> Option<AbortHandle> {
            if !self.script.abortable {
                return None;
            }
            let aborted = Arc::clone(&self.aborted);
            Some(Arc::new(move || aborted.store(true, Ordering::SeqCst)))
        }
    }
}

pub mod executors {
    use authlane::dispatcher::{Executor, ExecutorService, Task};
    use authlane::Error;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Runs tasks inline and records shutdown calls
    #[derive(Default)]
    pub struct CountingService {
        executed: AtomicUsize,
        shutdown: AtomicBool,
    }

    impl CountingService {
        pub fn executed(&self) -> usize {
            self.executed.load(Ordering::SeqCst)
        }
    }

    impl Executor for CountingService {
        fn execute(&self, task: Task) -> authlane::Result<()> {
            if self.shutdown.load(Ordering::SeqCst) {
                return Err(Error::Rejected("counting service is shut down"));
            }
            self.executed.fetch_add(1, Ordering::SeqCst);
            task.run();
            Ok(())
        }
    }

    impl ExecutorService for CountingService {
        fn shutdown(&self) {
            self.shutdown.store(true, Ordering::SeqCst);
        }

        fn is_shutdown(&self) -> bool {
            self.shutdown.load(Ordering::SeqCst)
        }
    }
}
