use thiserror::Error;

/// Errors surfaced by the sleep-sort runtime.
///
/// The ordering itself cannot fail; these cover bad input and the OS
/// refusing to give us threads.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("invalid sort key {key} for '{name}': keys must be non-negative")]
    InvalidKey { name: String, key: i64 },
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("supervisor thread panicked before closing the result channel")]
    SupervisorPanicked,
}
