//! Observation and schedule source adapters.

mod in_memory;
mod postgres;

pub use in_memory::{InMemoryObservationSource, InMemoryScheduleSource};
pub use postgres::{PostgresObservationSource, PostgresScheduleSource};
