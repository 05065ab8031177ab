//! Completion counter for a fan-out of workers.
//!
//! A [`CompletionCounter`] tracks how many workers are still outstanding.
//! Each worker is registered up front and receives a [`CompletionToken`];
//! consuming the token (or dropping it, e.g. while unwinding) decrements the
//! counter exactly once. [`CompletionCounter::wait`] blocks until the count
//! reaches zero.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

struct Shared {
    outstanding: Mutex<usize>,
    zero: Condvar,
}

impl Shared {
    // Poisoning is ignored: every update to the count is a single step.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.outstanding
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Shared count of outstanding workers.
///
/// Cheap to clone; all clones observe the same count.
#[derive(Clone)]
pub struct CompletionCounter {
    shared: Arc<Shared>,
}

impl CompletionCounter {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                outstanding: Mutex::new(0),
                zero: Condvar::new(),
            }),
        }
    }

    /// Register one more outstanding worker and hand back its token.
    ///
    /// Must be called before the worker is started so that a concurrent
    /// [`wait`](Self::wait) cannot observe zero too early.
    pub fn register(&self) -> CompletionToken {
        *self.shared.lock() += 1;
        CompletionToken {
            shared: Some(Arc::clone(&self.shared)),
        }
    }

    /// Number of workers that have not yet signalled completion.
    pub fn outstanding(&self) -> usize {
        *self.shared.lock()
    }

    /// Block until every registered worker has signalled completion.
    ///
    /// Returns immediately when nothing is outstanding.
    pub fn wait(&self) {
        let mut count = self.shared.lock();
        while *count > 0 {
            count = self
                .shared
                .zero
                .wait(count)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

impl Default for CompletionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionCounter")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// One worker's claim on the counter.
///
/// Not `Clone`: a token signals exactly once.
pub struct CompletionToken {
    shared: Option<Arc<Shared>>,
}

impl CompletionToken {
    /// Signal that this worker is finished.
    pub fn done(mut self) {
        self.signal();
    }

    fn signal(&mut self) {
        if let Some(shared) = self.shared.take() {
            let mut count = shared.lock();
            *count -= 1;
            if *count == 0 {
                shared.zero.notify_all();
            }
        }
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        self.signal();
    }
}

impl fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionToken")
            .field("pending", &self.shared.is_some())
            .finish()
    }
}
