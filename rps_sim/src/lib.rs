//! A rate-paced synthetic telemetry load generator.
//!
//! A run emits items (simulated telemetry events) into a [`Sink`] at a target
//! sustained rate while a second task prints the realized throughput once per
//! interval. The interesting part is the pacing: before every step the
//! [`Dispatcher`] compares how much time the ideal schedule has left against
//! how much the remaining work needs, and sleeps only when it is ahead. It
//! never skips items to catch up.
//!
//! # Architecture
//!
//! - [`RunConfig`]: immutable parameters of a run (total items, batch size,
//!   target rate, ...).
//! - [`Schedule`]: pure pacing math; decides between proceeding and sleeping.
//! - [`Dispatcher`]: issues items step by step and owns the [`ProgressCounter`].
//! - [`reporter_task`]: samples the counter every tick and hands a
//!   [`ThroughputReport`] to a [`Reporter`].
//! - [`Simulation`]: spawns both tasks and hands back a [`RunHandle`].
//!
//! The two tasks share nothing but the atomic progress counter and the
//! shutdown/interrupt signals in [`RunContext`].
//!
//! # Example
//!
//! ```rust,no_run
//! use rps_sim::{RunConfig, Simulation, StdoutReporter, TotalItems, TracingSink};
//! use std::num::NonZeroU64;
//!
//! #[tokio::main]
//! async fn main() -> rps_sim::Result<()> {
//!     let config = RunConfig::builder()
//!         .total_items(TotalItems::bounded(1000).unwrap())
//!         .target_rate(NonZeroU64::new(100).unwrap())
//!         .build();
//!     println!("{config}");
//!
//!     let summary = Simulation::builder()
//!         .config(config)
//!         .sink(TracingSink)
//!         .reporter(StdoutReporter)
//!         .build()
//!         .run()
//!         .await?;
//!     println!("sent {} items in {:?}", summary.items, summary.elapsed);
//!     Ok(())
//! }
//! ```

/// Run parameters
pub mod config;
/// Shutdown and interrupt signalling shared by both tasks
pub mod context;
/// The rate-paced item issuer
pub mod dispatcher;
pub mod error;
/// Shared items-issued counter
pub mod progress;
/// Periodic throughput observation
pub mod reporter;
pub mod schedule;
/// Destinations for generated items
pub mod sink;
/// Wiring that runs the dispatcher and reporter together
pub mod simulation;

pub use config::{RunConfig, TotalItems, DEFAULT_TARGET_RATE};
pub use context::{RunContext, ShutdownTrigger};
pub use dispatcher::{DispatchSummary, Dispatcher, Outcome};
pub use error::{Error, Result};
pub use progress::{ProgressCounter, ProgressReader};
pub use reporter::{
    reporter_task, JsonReporter, Reporter, StdoutReporter, ThroughputReport, ThroughputWindow,
};
pub use schedule::{PacingDecision, Schedule};
pub use simulation::{RunHandle, Simulation};
pub use sink::{Item, JsonSink, MemorySink, NullSink, Severity, Sink, TracingSink};
