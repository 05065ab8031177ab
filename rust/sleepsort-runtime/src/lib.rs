//! SleepSort Runtime
//!
//! Orders entities by sleeping on their sort keys in parallel and collecting
//! them as they wake. Provides the entity model, the result conduit, the
//! completion counter, the delay-and-emit worker, and the two collectors.

pub mod channel;
pub mod collector;
pub mod entity;
pub mod error;
pub mod wait_group;
pub mod worker;

pub use collector::{
    sort_buffered, sort_unbuffered, Emissions, SleepSorter, SortReport, Variant, DEFAULT_UNIT,
};
pub use entity::{entities_from_pairs, Entity};
pub use error::SortError;
