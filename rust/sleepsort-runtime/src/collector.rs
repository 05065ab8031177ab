//! Fan-out / fan-in collectors.
//!
//! Both collectors spawn one [`worker`] per entity and hand back an
//! [`Emissions`] iterator that yields entities in the order their workers
//! woke up. They differ only in the conduit they use:
//!
//! * [`sort_unbuffered`] uses a rendezvous conduit. Every worker's send
//!   waits for the collector, so spawning and waiting are moved onto a
//!   supervisor thread while the caller drains. Spawning and waiting inline
//!   would deadlock on the first send.
//! * [`sort_buffered`] uses a conduit with room for every entity. Sends never
//!   wait, so the caller spawns, waits and closes inline, and the returned
//!   iterator reads an already-complete buffer.
//!
//! In both cases the conduit is closed exactly once, by the side holding the
//! completion counter, after the counter reaches zero.

use crate::channel::{self, Receiver, Sender};
use crate::entity::Entity;
use crate::error::SortError;
use crate::wait_group::{CompletionCounter, CompletionToken};
use crate::worker;
use std::fmt;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Delay unit used when none is given: one key step per millisecond.
pub const DEFAULT_UNIT: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Which collection conduit to sort through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Zero-capacity conduit drained concurrently with a supervisor.
    Unbuffered,
    /// Conduit pre-sized to hold every result.
    Buffered,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Unbuffered, Variant::Buffered];
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Unbuffered => write!(f, "Unbuffered"),
            Variant::Buffered => write!(f, "Buffered"),
        }
    }
}

// ---------------------------------------------------------------------------
// Emissions
// ---------------------------------------------------------------------------

/// Summary of a finished sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortReport {
    pub variant: Variant,
    pub emitted: usize,
    /// Wall-clock time from the first spawn to the last emission.
    pub elapsed: Duration,
}

/// Entities in emission order.
///
/// Iterating blocks until the next worker emits, and ends once the conduit
/// is closed and drained. Dropping this early disconnects the conduit;
/// workers still running then discard their entity and finish normally.
pub struct Emissions {
    variant: Variant,
    rx: Receiver<Entity>,
    supervisor: Option<JoinHandle<Result<(), SortError>>>,
    started: Instant,
    /// Time of the last worker emission seen so far.
    last_emission: Instant,
    emitted: usize,
}

impl Emissions {
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Drain whatever is left and report on the sort.
    ///
    /// For the unbuffered variant this also joins the supervisor and returns
    /// any error it hit while spawning workers.
    pub fn finish(mut self) -> Result<SortReport, SortError> {
        for _ in self.by_ref() {}
        let elapsed = self.last_emission.duration_since(self.started);

        if let Some(handle) = self.supervisor.take() {
            handle.join().map_err(|_| SortError::SupervisorPanicked)??;
        }

        tracing::debug!(
            variant = %self.variant,
            emitted = self.emitted,
            elapsed_ms = elapsed.as_millis() as u64,
            "sort finished"
        );
        Ok(SortReport {
            variant: self.variant,
            emitted: self.emitted,
            elapsed,
        })
    }
}

impl Iterator for Emissions {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let entity = self.rx.recv().ok()?;
        // A rendezvous receive happens at the moment of emission. Buffered
        // results were all emitted before the sort call returned.
        if self.variant == Variant::Unbuffered {
            self.last_emission = Instant::now();
        }
        self.emitted += 1;
        Some(entity)
    }
}

impl fmt::Debug for Emissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emissions")
            .field("variant", &self.variant)
            .field("emitted", &self.emitted)
            .field("supervised", &self.supervisor.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Collectors
// ---------------------------------------------------------------------------

/// Starts one worker; [`worker::spawn`] outside of tests.
trait Spawner:
    FnMut(usize, Entity, Duration, Sender<Entity>, CompletionToken) -> Result<(), SortError>
{
}

impl<F> Spawner for F where
    F: FnMut(usize, Entity, Duration, Sender<Entity>, CompletionToken) -> Result<(), SortError>
{
}

/// Register and spawn one worker per entity.
///
/// Stops at the first spawn failure. Workers already started keep running
/// and are still tracked by `counter`.
fn fan_out<I, S>(
    entities: I,
    unit: Duration,
    sink: &Sender<Entity>,
    counter: &CompletionCounter,
    spawn: &mut S,
) -> Result<(), SortError>
where
    I: IntoIterator<Item = Entity>,
    S: Spawner,
{
    for (index, entity) in entities.into_iter().enumerate() {
        let token = counter.register();
        spawn(index, entity, unit, sink.clone(), token)?;
    }
    Ok(())
}

/// Body of the unbuffered supervisor thread.
fn supervise<S: Spawner>(
    entities: Vec<Entity>,
    unit: Duration,
    sink: Sender<Entity>,
    mut spawn: S,
) -> Result<(), SortError> {
    let counter = CompletionCounter::new();
    let spawned = fan_out(entities, unit, &sink, &counter, &mut spawn);
    if let Err(err) = &spawned {
        tracing::error!(error = %err, "supervisor stopped spawning workers");
    }

    counter.wait();
    sink.close();
    tracing::debug!("result channel closed");
    spawned
}

/// Sort through a zero-capacity conduit.
///
/// Returns as soon as the supervisor is running; entities arrive through
/// the returned iterator while workers are still sleeping.
pub fn sort_unbuffered(entities: &[Entity], unit: Duration) -> Result<Emissions, SortError> {
    sort_unbuffered_with(entities, unit, worker::spawn)
}

fn sort_unbuffered_with<S>(
    entities: &[Entity],
    unit: Duration,
    spawn: S,
) -> Result<Emissions, SortError>
where
    S: Spawner + Send + 'static,
{
    tracing::debug!(
        variant = %Variant::Unbuffered,
        count = entities.len(),
        unit_us = unit.as_micros() as u64,
        "starting sort"
    );

    let (tx, rx) = channel::rendezvous();
    let entities = entities.to_vec();
    let started = Instant::now();

    let supervisor = thread::Builder::new()
        .name("sleepsort-supervisor".into())
        .spawn(move || supervise(entities, unit, tx, spawn))
        .map_err(|source| SortError::Spawn {
            role: "supervisor",
            source,
        })?;

    Ok(Emissions {
        variant: Variant::Unbuffered,
        rx,
        supervisor: Some(supervisor),
        started,
        last_emission: started,
        emitted: 0,
    })
}

/// Sort through a conduit sized to hold every entity.
///
/// Blocks until the slowest worker has emitted; the returned iterator then
/// reads the buffer without waiting.
pub fn sort_buffered(entities: &[Entity], unit: Duration) -> Result<Emissions, SortError> {
    sort_buffered_with(entities, unit, worker::spawn)
}

fn sort_buffered_with<S: Spawner>(
    entities: &[Entity],
    unit: Duration,
    mut spawn: S,
) -> Result<Emissions, SortError> {
    tracing::debug!(
        variant = %Variant::Buffered,
        count = entities.len(),
        unit_us = unit.as_micros() as u64,
        "starting sort"
    );

    let (tx, rx) = channel::bounded(entities.len());
    let started = Instant::now();
    let counter = CompletionCounter::new();

    let spawned = fan_out(entities.iter().cloned(), unit, &tx, &counter, &mut spawn);
    counter.wait();
    let last_emission = Instant::now();
    tx.close();
    tracing::debug!(buffered = rx.len(), "result channel closed");
    spawned?;

    Ok(Emissions {
        variant: Variant::Buffered,
        rx,
        supervisor: None,
        started,
        last_emission,
        emitted: 0,
    })
}

// ---------------------------------------------------------------------------
// SleepSorter
// ---------------------------------------------------------------------------

/// Entry point bundling the delay unit with the choice of collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepSorter {
    unit: Duration,
}

impl SleepSorter {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> Duration {
        self.unit
    }

    pub fn sort(&self, variant: Variant, entities: &[Entity]) -> Result<Emissions, SortError> {
        match variant {
            Variant::Unbuffered => self.sort_unbuffered(entities),
            Variant::Buffered => self.sort_buffered(entities),
        }
    }

    pub fn sort_unbuffered(&self, entities: &[Entity]) -> Result<Emissions, SortError> {
        sort_unbuffered(entities, self.unit)
    }

    pub fn sort_buffered(&self, entities: &[Entity]) -> Result<Emissions, SortError> {
        sort_buffered(entities, self.unit)
    }
}

impl Default for SleepSorter {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn names(emissions: Emissions) -> Vec<String> {
        emissions.map(|e| e.name().to_string()).collect()
    }

    fn abc() -> Vec<Entity> {
        vec![
            Entity::new("A", 300),
            Entity::new("B", 100),
            Entity::new("C", 200),
        ]
    }

    #[test]
    fn variant_display() {
        assert_eq!(Variant::Unbuffered.to_string(), "Unbuffered");
        assert_eq!(Variant::Buffered.to_string(), "Buffered");
    }

    #[test]
    fn unbuffered_orders_by_key() {
        let out = sort_unbuffered(&abc(), DEFAULT_UNIT).unwrap();
        assert_eq!(names(out), ["B", "C", "A"]);
    }

    #[test]
    fn buffered_orders_by_key() {
        let out = sort_buffered(&abc(), DEFAULT_UNIT).unwrap();
        assert_eq!(names(out), ["B", "C", "A"]);
    }

    #[test]
    fn buffered_results_are_ready_on_return() {
        let out = sort_buffered(&abc(), DEFAULT_UNIT).unwrap();
        // Every worker has already emitted into the buffer.
        assert_eq!(out.rx.len(), 3);
        assert!(out.started.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn unbuffered_returns_before_workers_finish() {
        let start = Instant::now();
        let out = sort_unbuffered(&abc(), DEFAULT_UNIT).unwrap();
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(names(out).len(), 3);
    }

    #[test]
    fn empty_input_closes_immediately() {
        for variant in Variant::ALL {
            let start = Instant::now();
            let out = SleepSorter::default().sort(variant, &[]).unwrap();
            let report = out.finish().unwrap();
            assert_eq!(report.emitted, 0);
            assert_eq!(report.variant, variant);
            assert!(start.elapsed() < Duration::from_millis(200));
        }
    }

    #[test]
    fn finish_drains_and_counts() {
        let mut out = sort_unbuffered(&abc(), DEFAULT_UNIT).unwrap();
        assert_eq!(out.next().unwrap().name(), "B");
        let report = out.finish().unwrap();
        assert_eq!(report.emitted, 3);
        assert_eq!(report.variant, Variant::Unbuffered);
    }

    #[test]
    fn dropping_unbuffered_early_lets_workers_complete() {
        let entities = [Entity::new("A", 50), Entity::new("B", 80)];
        let mut out = sort_unbuffered(&entities, DEFAULT_UNIT).unwrap();
        let supervisor = out.supervisor.take().unwrap();
        drop(out);

        // The supervisor returns only after every worker has signalled
        // completion, so their sends must have failed instead of blocking.
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        thread::spawn(move || done_tx.send(supervisor.join()));
        let joined = done_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("supervisor still waiting on workers");
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[test]
    fn buffered_elapsed_ignores_consumer_idle_time() {
        let out = sort_buffered(&[Entity::new("A", 10)], DEFAULT_UNIT).unwrap();
        thread::sleep(Duration::from_millis(300));
        let report = out.finish().unwrap();
        assert!(report.elapsed >= Duration::from_millis(10));
        assert!(report.elapsed < Duration::from_millis(200), "{:?}", report.elapsed);
    }

    #[test]
    fn unbuffered_elapsed_stops_at_last_receive() {
        let mut out = sort_unbuffered(&[Entity::new("A", 10)], DEFAULT_UNIT).unwrap();
        assert_eq!(out.next().unwrap().name(), "A");
        thread::sleep(Duration::from_millis(300));
        let report = out.finish().unwrap();
        assert_eq!(report.emitted, 1);
        assert!(report.elapsed >= Duration::from_millis(10));
        assert!(report.elapsed < Duration::from_millis(200), "{:?}", report.elapsed);
    }

    // -- spawn failures ---------------------------------------------------

    fn fail_at(
        n: usize,
    ) -> impl FnMut(usize, Entity, Duration, Sender<Entity>, CompletionToken) -> Result<(), SortError>
           + Send
           + 'static {
        move |index, entity, unit, sink, token| {
            if index == n {
                return Err(SortError::Spawn {
                    role: "worker",
                    source: std::io::Error::other("thread limit reached"),
                });
            }
            worker::spawn(index, entity, unit, sink, token)
        }
    }

    fn explode(
    ) -> impl FnMut(usize, Entity, Duration, Sender<Entity>, CompletionToken) -> Result<(), SortError>
           + Send
           + 'static {
        |_, _, _, _, _| panic!("spawner exploded")
    }

    #[test]
    fn buffered_spawn_failure_waits_for_started_workers() {
        let start = Instant::now();
        let err = sort_buffered_with(&abc(), DEFAULT_UNIT, fail_at(1)).unwrap_err();
        assert!(matches!(err, SortError::Spawn { role: "worker", .. }));
        // A (300) was already running and is waited for before reporting.
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn unbuffered_spawn_failure_surfaces_from_finish() {
        let mut out = sort_unbuffered_with(&abc(), DEFAULT_UNIT, fail_at(2)).unwrap();
        // A and B were started before the failure; C never was.
        let got: Vec<_> = out.by_ref().map(|e| e.name().to_string()).collect();
        assert_eq!(got, ["B", "A"]);
        let err = out.finish().unwrap_err();
        assert!(matches!(err, SortError::Spawn { role: "worker", .. }));
    }

    #[test]
    fn panicking_supervisor_is_reported() {
        let out = sort_unbuffered_with(&abc(), DEFAULT_UNIT, explode()).unwrap();
        assert!(matches!(out.finish(), Err(SortError::SupervisorPanicked)));
    }

    #[test]
    fn many_entities_through_rendezvous_do_not_deadlock() {
        let entities: Vec<_> = (0..64u64)
            .map(|k| Entity::new(format!("e{}", k), k % 8))
            .collect();
        let out = sort_unbuffered(&entities, DEFAULT_UNIT).unwrap();
        let keys: Vec<_> = out.map(|e| e.sort_key()).collect();
        assert_eq!(keys.len(), 64);
    }

    #[test]
    fn sorter_carries_unit() {
        let sorter = SleepSorter::new(Duration::from_micros(500));
        assert_eq!(sorter.unit(), Duration::from_micros(500));
        assert_eq!(SleepSorter::default().unit(), DEFAULT_UNIT);
    }

    #[test]
    fn emissions_debug_format() {
        let out = sort_buffered(&[], DEFAULT_UNIT).unwrap();
        let dbg = format!("{:?}", out);
        assert!(dbg.contains("Buffered"));
        assert!(dbg.contains("supervised: false"));
    }
}
