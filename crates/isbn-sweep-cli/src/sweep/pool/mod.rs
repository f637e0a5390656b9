//! Blocking worker pool for partition generation.
//!
//! Each worker runs on its own OS thread, owns a bounded
//! [`tokio::sync::mpsc`] queue of [`WorkRequest`]s and an `Arc` of the shared,
//! read-only directory. Partitions are dispatched round-robin and each one
//! reports back over its own oneshot channel.

pub mod manager;
pub mod request;
pub mod worker;

pub use manager::WorkerPool;
pub use request::{Outcome, PartitionReport, PoolError, WorkRequest};
