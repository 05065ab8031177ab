//! The result conduit between workers and the collector.
//!
//! A thin layer over [`crossbeam_channel`]. A [`Sender`] / [`Receiver`] pair
//! is created by [`rendezvous()`] (capacity zero, every send waits for a
//! matching receive) or [`bounded()`] (sends succeed immediately while there
//! is free capacity). The channel closes once every sender has been dropped
//! or [`close`](Sender::close)d; receivers can still drain whatever was
//! buffered before that.

use crossbeam_channel::{self as cb};
use std::fmt;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error returned when sending after the receiver has gone away.
///
/// Carries the value back so the caller can decide what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendError<T>(pub T);

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "send failed: receiver is gone")
    }
}

impl<T: fmt::Debug> std::error::Error for SendError<T> {}

/// Error returned by [`Receiver::recv`] when the channel is closed and
/// drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvError;

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recv failed: channel is closed and empty")
    }
}

impl std::error::Error for RecvError {}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// The sending half of the conduit.
///
/// Each worker owns one clone. The collector side keeps one more and closes
/// it only after every worker has finished, so a send can never land on a
/// closed channel.
pub struct Sender<T> {
    inner: cb::Sender<T>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("capacity", &self.inner.capacity())
            .field("len", &self.inner.len())
            .finish()
    }
}

impl<T> Sender<T> {
    /// Send a value into the channel.
    ///
    /// On a rendezvous channel this blocks until the receiver takes the
    /// value; on a bounded channel it blocks only while the buffer is full.
    /// Returns [`SendError`] if the receiver has been dropped.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        self.inner.send(value).map_err(|e| SendError(e.0))
    }

    /// Close this handle.
    ///
    /// The channel reports closed to the receiver once the last handle is
    /// closed or dropped. Consuming `self` makes a later send through this
    /// handle impossible.
    pub fn close(self) {
        drop(self);
    }
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// The receiving half of the conduit.
pub struct Receiver<T> {
    inner: cb::Receiver<T>,
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("capacity", &self.inner.capacity())
            .field("len", &self.inner.len())
            .finish()
    }
}

impl<T> Receiver<T> {
    /// Block until a value arrives or the channel is closed and drained.
    pub fn recv(&self) -> Result<T, RecvError> {
        self.inner.recv().map_err(|_| RecvError)
    }

    /// Number of values currently buffered.
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// Create a zero-capacity channel.
///
/// Every send blocks until a receiver is there to take the value, so a
/// receiver must be draining concurrently with the senders.
pub fn rendezvous<T>() -> (Sender<T>, Receiver<T>) {
    bounded(0)
}

/// Create a channel that buffers up to `capacity` values.
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = cb::bounded(capacity);
    (Sender { inner: tx }, Receiver { inner: rx })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
