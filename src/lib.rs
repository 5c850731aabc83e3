//! Bounded-concurrency runner over a shared, single-pass source.
//!
//! # Features
//! - Fixed pool of N tokio workers sharing one iteration cursor
//! - Every item goes to exactly one worker, in source order per worker
//! - Three aggregation modes: collect-all, flatten, settled
//! - Panics in the factory, the work unit or the source fail only that worker
//! - Callback-style work units through [`settle::executor`]
//! - Per-runner metrics and `tracing` instrumentation

mod cursor;
pub mod errors;
mod handle;
pub mod model;
pub mod result;
pub mod runner;
pub mod settle;

pub use errors::{ConfigError, Failure};
pub use model::{RunMetrics, Settled};
pub use result::{RunResult, WorkerOutcome};
pub use runner::{run_collect_all, run_flatten, run_settled, Config, ConcurrentRunner};
