//! Bat Algorithm global optimizer in pure Rust
//!
//! A population of candidates ("bats") moves through a box-bounded search
//! space. Each candidate is pulled towards the best candidate of the
//! previous iteration with a random frequency, occasionally replaced by a
//! local walk around that best, and accepts an improvement with a
//! probability given by its loudness.
//!
//! Supported features:
//! - Per-candidate deterministic random streams, so results depend only on
//!   `(population, seed, iterations)`
//! - Sequential driver with population snapshots
//! - Shared-memory driver over a rayon worker pool
//! - Distributed driver over in-process channels or a TCP mesh, with
//!   binomial-tree reduce and broadcast
//! - Per-iteration callback with early stop, and CSV recording
//! - `BENCH` result line for benchmark tooling
//!
//! ```no_run
//! use bat_algo::{BatAlgorithm, DriverKind, RunConfigBuilder};
//!
//! let config = RunConfigBuilder::new().population(40).iterations(1000).seed(7).build();
//! let report = BatAlgorithm::new(config).run(DriverKind::Threaded)?;
//! println!("{}", report.bench_line());
//! # Ok::<(), bat_algo::BatError>(())
//! ```

#![allow(missing_docs)]

pub mod bat;
pub mod config;
pub mod error;
pub mod loudness;
pub mod objective;
pub mod params;
pub mod population;
pub mod rng;
pub mod update;

pub mod sweep;

pub mod comm;
pub mod driver;

pub mod cli;
pub mod recorder;
pub mod report;
pub mod snapshot;

pub use bat::Bat;
pub use config::{RunConfig, RunConfigBuilder, SnapshotConfig};
pub use driver::{BatAlgorithm, run_distributed, run_distributed_local, run_sequential, run_threaded};
pub use error::{BatError, CommError};
pub use loudness::LoudnessMode;
pub use params::BatParams;
pub use population::init_population;
pub use recorder::{OptimizationRecord, OptimizationRecorder};
pub use report::{
	BatIntermediate, BatReport, BenchLine, Callback, CallbackAction, DriverKind, ResultSink, WriterSink,
};
pub use rng::BatRng;
pub use update::update_bat;
