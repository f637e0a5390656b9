//! Run orchestration for the `isbn-sweep` binary.
//!
//! ## Structure
//!
//! - [`config`] - CLI / environment configuration and validation.
//! - [`pool`] - blocking worker pool that runs partitions.
//! - [`summary`] - aggregation of per-partition reports.
//! - [`telemetry`] - logging and optional OpenTelemetry export.

pub mod config;
pub mod pool;
pub mod summary;
pub mod telemetry;
