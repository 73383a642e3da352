//! # Main Looper Module
//!
//! The default callback context: a message queue bound to one designated
//! thread (the application's main/UI thread).
//!
//! A [`MainLooper`] is created on the designated thread with
//! [`MainLooper::prepare`] and stays there (it is `!Send`). Any thread can
//! hold a [`MainHandle`] to post work to it, check whether it is running on
//! the designated thread, or drop everything still pending.
//!
//! ## Usage
//!
//! ```rust
//! use authlane::dispatcher::Task;
//! use authlane::looper::MainLooper;
//!
//! let looper = MainLooper::prepare();
//! let handle = looper.handle();
//!
//! std::thread::spawn(move || {
//!     let quitter = handle.clone();
//!     handle.post(Task::callback(move || {
//!         println!("on the main thread");
//!         quitter.quit();
//!     }));
//! });
//!
//! looper.run();
//! ```
//!
//! Host applications with their own event loop call
//! [`MainLooper::run_pending`] from it instead of [`MainLooper::run`].

use crate::dispatcher::Task;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, error};

struct Shared {
    owner: ThreadId,
    queue: Mutex<VecDeque<Task>>,
    ready: Condvar,
    quit: AtomicBool,
}

impl Shared {
    fn run_one(&self, task: Task) {
        let kind = task.kind();
        if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| task.run()))
        {
            error!(kind = %kind, panic_message = ?panic, "Main looper task panicked");
        }
    }
}

/// Message loop owned by the designated thread
pub struct MainLooper {
    shared: Arc<Shared>,
    // Pinned to the thread that prepared it
    _not_send: PhantomData<*const ()>,
}

impl MainLooper {
    /// Bind a new looper to the calling thread
    #[must_use]
    pub fn prepare() -> Self {
        Self {
            shared: Arc::new(Shared {
                owner: thread::current().id(),
                queue: Mutex::new(VecDeque::new()),
                ready: Condvar::new(),
                quit: AtomicBool::new(false),
            }),
            _not_send: PhantomData,
        }
    }

    /// A handle other threads use to post to this looper
    #[must_use]
    pub fn handle(&self) -> MainHandle {
        MainHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Process posts until [`MainHandle::quit`] is called
    ///
    /// Posts still queued when the looper quits are left in place.
    pub fn run(&self) {
        debug!("Main looper running");
        loop {
            let next = {
                let mut queue = self.shared.queue.lock();
                loop {
                    if self.shared.quit.load(Ordering::Acquire) {
                        break None;
                    }
                    if let Some(task) = queue.pop_front() {
                        break Some(task);
                    }
                    self.shared.ready.wait(&mut queue);
                }
            };
            match next {
                Some(task) => self.shared.run_one(task),
                None => break,
            }
        }
        debug!("Main looper stopped");
    }

    /// Run the posts queued right now without blocking
    ///
    /// Posts added while these run wait for the next call. Returns the number
    /// of tasks run.
    pub fn run_pending(&self) -> usize {
        let batch: Vec<Task> = self.shared.queue.lock().drain(..).collect();
        let count = batch.len();
        for task in batch {
            self.shared.run_one(task);
        }
        count
    }
}

/// Cross-thread handle to a [`MainLooper`]
#[derive(Clone)]
pub struct MainHandle {
    shared: Arc<Shared>,
}

impl MainHandle {
    /// Queue `task` for the looper thread
    ///
    /// Returns `false` (dropping the task) if the looper has quit.
    pub fn post(&self, task: Task) -> bool {
        if self.shared.quit.load(Ordering::Acquire) {
            return false;
        }
        self.shared.queue.lock().push_back(task);
        self.shared.ready.notify_one();
        true
    }

    /// `true` when called from the looper's thread
    #[must_use]
    pub fn is_current_thread(&self) -> bool {
        thread::current().id() == self.shared.owner
    }

    /// Identity of the looper's thread
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.shared.owner
    }

    /// Drop every pending post without running it; returns how many were dropped
    pub fn remove_all(&self) -> usize {
        let dropped: Vec<Task> = self.shared.queue.lock().drain(..).collect();
        // Task destructors run outside the lock
        dropped.len()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Ask [`MainLooper::run`] to return
    pub fn quit(&self) {
        self.shared.quit.store(true, Ordering::Release);
        // Take the lock so a looper between its quit check and wait() sees the flag
        let _queue = self.shared.queue.lock();
        self.shared.ready.notify_all();
    }

    #[must_use]
    pub fn has_quit(&self) -> bool {
        self.shared.quit.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MainHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainHandle")
            .field("owner", &self.shared.owner)
            .field("pending", &self.pending())
            .finish()
    }
}
