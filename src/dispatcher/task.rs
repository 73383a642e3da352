use std::fmt;

/// Boxed unit of work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Which lane a [`Task`] belongs to
///
/// The classification is closed: anything that is not a callback runs on
/// the worker lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Completion notification; runs on the callback lane
    Callback,
    /// Blocking work (network I/O); runs on the single worker lane
    Request,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Callback => f.write_str("callback"),
            TaskKind::Request => f.write_str("request"),
        }
    }
}

/// A unit of work tagged with the lane it must run on
pub struct Task {
    kind: TaskKind,
    job: Job,
}

impl Task {
    /// Wrap `f` as a callback-kind task
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            kind: TaskKind::Callback,
            job: Box::new(f),
        }
    }

    /// Wrap `f` as a request-kind task
    pub fn request<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            kind: TaskKind::Request,
            job: Box::new(f),
        }
    }

    /// The routing predicate used by the dispatcher
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Shorthand for `kind() == TaskKind::Callback`
    #[inline]
    #[must_use]
    pub fn is_callback(&self) -> bool {
        self.kind == TaskKind::Callback
    }

    /// Consume the task and run it on the current thread
    pub fn run(self) {
        (self.job)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("kind", &self.kind).finish()
    }
}
