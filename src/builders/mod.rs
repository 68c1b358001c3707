//! Handles returned by add operations for fluent configuration.

pub mod handles;

pub use handles::{PoolHandle, WorkerHandle};
