//! Run results, the machine-readable benchmark line and result sinks

use std::fmt;
use std::io::{self, Write};
use std::str::{FromStr, SplitWhitespace};
use std::time::Duration;

use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::bat::Bat;

/// Execution strategy that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverKind {
	Sequential,
	Threaded,
	Distributed,
}

impl DriverKind {
	/// Stable identifier used in the `BENCH` line
	///
	/// These tokens are what the external analysis scripts group by.
	pub fn token(&self) -> &'static str {
		match self {
			DriverKind::Sequential => "sequential",
			DriverKind::Threaded => "openmp",
			DriverKind::Distributed => "mpi",
		}
	}
}

impl FromStr for DriverKind {
	type Err = String;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"sequential" => Ok(DriverKind::Sequential),
			"openmp" => Ok(DriverKind::Threaded),
			"mpi" => Ok(DriverKind::Distributed),
			_ => Err(format!("unknown driver token: {}", s)),
		}
	}
}

/// Information passed to the callback after each iteration
pub struct BatIntermediate<'a> {
	pub iteration: usize,
	pub best: &'a Bat,
}

/// Action returned by the callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
	Continue,
	Stop,
}

/// Per-iteration observer; returning `Stop` ends the run after the current iteration
pub type Callback<'a> = dyn FnMut(&BatIntermediate<'_>) -> CallbackAction + Send + 'a;

/// Result of a run
#[derive(Clone)]
pub struct BatReport {
	pub best: Bat,
	pub driver: DriverKind,
	pub seed: u32,
	pub population_size: usize,
	/// Configured iteration count
	pub iterations: usize,
	/// Iterations actually run (less than `iterations` when a callback stopped the run)
	pub completed: usize,
	pub procs: usize,
	pub threads: usize,
	/// Wall-clock time of the iteration loop
	pub elapsed: Duration,
	/// Final positions, one row per candidate
	pub population: Array2<f64>,
	pub fitness: Array1<f64>,
}

impl fmt::Debug for BatReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BatReport")
			.field("driver", &self.driver)
			.field("best_fitness", &self.best.fitness)
			.field("best_position", &self.best.position)
			.field("completed", &self.completed)
			.field("procs", &self.procs)
			.field("threads", &self.threads)
			.field(
				"population",
				&format!("{}x{}", self.population.nrows(), self.population.ncols()),
			)
			.finish()
	}
}

/// Flat, serializable summary of a report
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
	pub driver: &'static str,
	pub seed: u32,
	pub n_bats: usize,
	pub iters: usize,
	pub completed: usize,
	pub procs: usize,
	pub threads: usize,
	pub time_s: f64,
	pub best_fitness: f64,
	pub best_position: Vec<f64>,
}

impl BatReport {
	/// True when a callback ended the run before `iterations`
	pub fn stopped_early(&self) -> bool {
		self.completed < self.iterations
	}

	pub fn bench_line(&self) -> BenchLine {
		BenchLine {
			driver: self.driver,
			n_bats: self.population_size,
			iters: self.iterations,
			procs: self.procs,
			threads: self.threads,
			time_s: self.elapsed.as_secs_f64(),
		}
	}

	pub fn summary(&self) -> ReportSummary {
		ReportSummary {
			driver: self.driver.token(),
			seed: self.seed,
			n_bats: self.population_size,
			iters: self.iterations,
			completed: self.completed,
			procs: self.procs,
			threads: self.threads,
			time_s: self.elapsed.as_secs_f64(),
			best_fitness: self.best.fitness,
			best_position: self.best.position.to_vec(),
		}
	}

	/// Pretty JSON of `summary()`
	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string_pretty(&self.summary())
	}
}

/// Machine-readable result line, fixed token order:
/// `BENCH version=<driver> n_bats=<N> iters=<T> procs=<P> threads=<W> time_s=<secs>`
#[derive(Debug, Clone, PartialEq)]
pub struct BenchLine {
	pub driver: DriverKind,
	pub n_bats: usize,
	pub iters: usize,
	pub procs: usize,
	pub threads: usize,
	pub time_s: f64,
}

impl fmt::Display for BenchLine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"BENCH version={} n_bats={} iters={} procs={} threads={} time_s={:.6}",
			self.driver.token(),
			self.n_bats,
			self.iters,
			self.procs,
			self.threads,
			self.time_s
		)
	}
}

impl FromStr for BenchLine {
	type Err = String;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut tokens = s.split_whitespace();
		if tokens.next() != Some("BENCH") {
			return Err("missing BENCH prefix".into());
		}
		let driver = bench_field(&mut tokens, "version")?.parse()?;
		let n_bats = bench_field(&mut tokens, "n_bats")?.parse().map_err(|e| format!("n_bats: {}", e))?;
		let iters = bench_field(&mut tokens, "iters")?.parse().map_err(|e| format!("iters: {}", e))?;
		let procs = bench_field(&mut tokens, "procs")?.parse().map_err(|e| format!("procs: {}", e))?;
		let threads = bench_field(&mut tokens, "threads")?.parse().map_err(|e| format!("threads: {}", e))?;
		let time_s = bench_field(&mut tokens, "time_s")?.parse().map_err(|e| format!("time_s: {}", e))?;
		Ok(BenchLine { driver, n_bats, iters, procs, threads, time_s })
	}
}

fn bench_field<'s>(tokens: &mut SplitWhitespace<'s>, key: &str) -> Result<&'s str, String> {
	let tok = tokens.next().ok_or_else(|| format!("missing {}", key))?;
	tok.strip_prefix(key)
		.and_then(|rest| rest.strip_prefix('='))
		.ok_or_else(|| format!("expected {}=..., got {}", key, tok))
}

/// Consumer of the end-of-run result line
pub trait ResultSink {
	fn emit(&mut self, line: &BenchLine) -> io::Result<()>;
}

/// Writes each line followed by a newline
pub struct WriterSink<W: Write> {
	out: W,
}

impl<W: Write> WriterSink<W> {
	pub fn new(out: W) -> Self {
		Self { out }
	}

	pub fn into_inner(self) -> W {
		self.out
	}
}

impl WriterSink<io::Stdout> {
	pub fn stdout() -> Self {
		Self::new(io::stdout())
	}
}

impl<W: Write> ResultSink for WriterSink<W> {
	fn emit(&mut self, line: &BenchLine) -> io::Result<()> {
		writeln!(self.out, "{}", line)?;
		self.out.flush()
	}
}

/// Collects lines in memory
impl ResultSink for Vec<BenchLine> {
	fn emit(&mut self, line: &BenchLine) -> io::Result<()> {
		self.push(line.clone());
		Ok(())
	}
}
