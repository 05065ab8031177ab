//! The delay-and-emit worker.
//!
//! One worker per entity: sleep for the entity's delay, send it to the
//! result conduit, then signal completion. That order is fixed and each step
//! happens exactly once.

use crate::channel::Sender;
use crate::entity::Entity;
use crate::error::SortError;
use crate::wait_group::CompletionToken;
use std::thread;
use std::time::Duration;

/// Run one worker to completion on the current thread.
///
/// The send may block on a rendezvous conduit until the collector receives.
/// If the collector has already gone away the entity is dropped and the
/// worker still signals completion.
pub fn run(entity: Entity, unit: Duration, sink: Sender<Entity>, token: CompletionToken) {
    thread::sleep(entity.delay(unit));

    let key = entity.sort_key();
    match sink.send(entity) {
        Ok(()) => tracing::trace!(key, "emitted"),
        Err(err) => tracing::debug!(entity = err.0.name(), key, "collector gone, dropping entity"),
    }
    sink.close();
    token.done();
}

/// Start a worker on its own OS thread.
///
/// The thread is detached; the caller joins through the completion counter
/// that issued `token`.
pub fn spawn(
    index: usize,
    entity: Entity,
    unit: Duration,
    sink: Sender<Entity>,
    token: CompletionToken,
) -> Result<(), SortError> {
    thread::Builder::new()
        .name(format!("sleepsort-worker-{}", index))
        .spawn(move || run(entity, unit, sink, token))
        .map(drop)
        .map_err(|source| SortError::Spawn {
            role: "worker",
            source,
        })
}
