//! Bat Algorithm optimizer
//! Common command-line interface definitions shared across binaries
//!
//! Copyright (C) 2025 Pierre Aubert pierre(at)spinorama(dot)org
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::path::PathBuf;
use std::process;

use crate::config::{
    DEFAULT_ITERATIONS, DEFAULT_POPULATION, DEFAULT_PROGRESS_INTERVAL, RunConfig, RunConfigBuilder,
    SnapshotConfig,
};
use crate::driver::BatAlgorithm;
use crate::error::BatError;
use crate::loudness::LoudnessMode;
use crate::recorder::OptimizationRecorder;
use crate::report::{BatReport, DriverKind, ResultSink, WriterSink};

/// Shared CLI arguments for the bat binaries.
#[derive(clap::Args, Debug, Clone)]
pub struct Args {
    /// Number of candidates in the population.
    #[arg(long = "n-bats", default_value_t = DEFAULT_POPULATION, value_parser = parse_strictly_positive_usize)]
    pub n_bats: usize,

    /// Number of iterations.
    #[arg(long, default_value_t = DEFAULT_ITERATIONS, value_parser = parse_strictly_positive_usize)]
    pub iters: usize,

    /// Run seed; a random one is drawn when omitted.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Suppress periodic progress reports.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Do not write population snapshots (sequential driver only).
    #[arg(long, default_value_t = false)]
    pub no_snapshot: bool,

    /// Directory for population snapshots. Default: $BAT_OUTPUT_DIR/snapshots
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Worker threads (threaded driver, or per rank for the distributed one).
    #[arg(long, value_parser = parse_strictly_positive_usize)]
    pub threads: Option<usize>,

    /// How the local walk reads the population-mean loudness.
    #[arg(long, value_enum, default_value_t = LoudnessMode::Snapshot)]
    pub loudness: LoudnessMode,

    /// Log progress every N iterations.
    #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL, value_parser = parse_strictly_positive_usize)]
    pub progress_interval: usize,

    /// Record the best candidate of every iteration to $BAT_OUTPUT_DIR/records/<NAME>.csv
    #[arg(long, value_name = "NAME")]
    pub record: Option<String>,
}

impl Args {
    /// Build the run configuration for `driver`
    ///
    /// Snapshots are only configured for the sequential driver.
    pub fn to_config(&self, driver: DriverKind, threads: usize, procs: usize) -> RunConfig {
        let mut builder = RunConfigBuilder::new()
            .population(self.n_bats)
            .iterations(self.iters)
            .quiet(self.quiet)
            .progress_interval(self.progress_interval)
            .threads(threads)
            .procs(procs)
            .loudness(self.loudness);
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        if driver == DriverKind::Sequential && !self.no_snapshot {
            builder = builder.snapshot(SnapshotConfig { dir: self.snapshot_dir.clone(), ..SnapshotConfig::default() });
        }
        builder.build()
    }
}

/// Initialize `env_logger` with `info` as the default filter
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init();
}

/// Run a sequential or threaded job, save the optional recording and print the `BENCH` line
pub fn run_shared_memory(args: &Args, driver: DriverKind, threads: usize) -> Result<BatReport, BatError> {
    let config = args.to_config(driver, threads, 1);
    let recorder = args.record.as_ref().map(|name| OptimizationRecorder::new(name.clone()));
    let mut algo = BatAlgorithm::new(config);
    if let Some(r) = &recorder {
        algo = algo.with_callback(r.create_callback());
    }
    let report = algo.run(driver)?;
    if let Some(r) = recorder {
        let path = r.save_to_csv(&bat_env::get_records_dir()?)?;
        log::info!("Recorded {} iterations to {}", r.num_iterations(), path.display());
    }
    emit_bench(&report)?;
    Ok(report)
}

/// Print the `BENCH` line of `report` on stdout
pub fn emit_bench(report: &BatReport) -> Result<(), BatError> {
    WriterSink::stdout().emit(&report.bench_line())?;
    Ok(())
}

/// Unwrap `result`, or log the error and exit with status 1
pub fn exit_on_error<T>(result: Result<T, BatError>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    }
}

// Custom value parser to enforce strictly positive integers (> 0)
fn parse_strictly_positive_usize(s: &str) -> Result<usize, String> {
    let v: usize = s.parse().map_err(|_| format!("invalid integer: {s}"))?;
    if v > 0 {
        Ok(v)
    } else {
        Err("value must be strictly positive (> 0)".to_string())
    }
}
