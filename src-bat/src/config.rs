use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::BatError;
use crate::loudness::{LoudnessMode, total_fits};
use crate::params::BatParams;

pub const DEFAULT_POPULATION: usize = 40;
pub const DEFAULT_ITERATIONS: usize = 10_000;
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;
/// Iterations at which the sequential driver dumps positions
pub const DEFAULT_SNAPSHOT_ITERATIONS: [usize; 4] = [0, 2500, 5000, 7500];

/// Where and when the sequential driver writes population snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
	/// Target directory; `None` resolves through `bat_env::get_snapshot_dir`
	pub dir: Option<PathBuf>,
	pub iterations: Vec<usize>,
}

impl Default for SnapshotConfig {
	fn default() -> Self {
		Self { dir: None, iterations: DEFAULT_SNAPSHOT_ITERATIONS.to_vec() }
	}
}

/// Configuration shared by the three drivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
	pub population: usize,
	pub iterations: usize,
	/// Run seed; `None` draws one at start-up
	pub seed: Option<u32>,
	/// Suppress periodic progress reports
	pub quiet: bool,
	pub progress_interval: usize,
	/// Worker threads (threaded driver, or per rank for the distributed one)
	pub threads: usize,
	/// Ranks started by the in-process distributed runner
	pub procs: usize,
	pub loudness: LoudnessMode,
	pub params: BatParams,
	/// Sequential driver only
	pub snapshot: Option<SnapshotConfig>,
}

impl Default for RunConfig {
	fn default() -> Self {
		Self {
			population: DEFAULT_POPULATION,
			iterations: DEFAULT_ITERATIONS,
			seed: None,
			quiet: false,
			progress_interval: DEFAULT_PROGRESS_INTERVAL,
			threads: 1,
			procs: 1,
			loudness: LoudnessMode::default(),
			params: BatParams::default(),
			snapshot: None,
		}
	}
}

impl RunConfig {
	/// Check everything that does not depend on the execution substrate
	pub fn validate(&self) -> Result<(), BatError> {
		if self.population == 0 {
			return Err(BatError::InvalidPopulation(self.population));
		}
		if self.iterations == 0 {
			return Err(BatError::InvalidIterations(self.iterations));
		}
		if self.threads == 0 {
			return Err(BatError::InvalidThreads(self.threads));
		}
		if self.procs == 0 {
			return Err(BatError::InvalidProcs(self.procs));
		}
		if self.progress_interval == 0 {
			return Err(BatError::InvalidProgressInterval);
		}
		self.params.validate()?;
		if !total_fits(self.population, self.params.a0) {
			return Err(BatError::InvalidParams(format!(
				"{} candidates at loudness {} exceed the loudness sum range",
				self.population, self.params.a0
			)));
		}
		Ok(())
	}

	/// Check that the population splits into `procs` equal partitions
	pub fn validate_partition(&self, procs: usize) -> Result<(), BatError> {
		self.validate()?;
		if procs == 0 {
			return Err(BatError::InvalidProcs(procs));
		}
		if self.population % procs != 0 {
			return Err(BatError::Indivisible { population: self.population, procs });
		}
		Ok(())
	}

	/// The configured seed, or a fresh random one
	pub fn resolve_seed(&self) -> u32 {
		self.seed.unwrap_or_else(rand::random::<u32>)
	}
}

/// Fluent builder for `RunConfig`
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
	cfg: RunConfig,
}

impl RunConfigBuilder {
	pub fn new() -> Self {
		Self { cfg: RunConfig::default() }
	}
	pub fn population(mut self, v: usize) -> Self {
		self.cfg.population = v;
		self
	}
	pub fn iterations(mut self, v: usize) -> Self {
		self.cfg.iterations = v;
		self
	}
	pub fn seed(mut self, v: u32) -> Self {
		self.cfg.seed = Some(v);
		self
	}
	pub fn quiet(mut self, v: bool) -> Self {
		self.cfg.quiet = v;
		self
	}
	pub fn progress_interval(mut self, v: usize) -> Self {
		self.cfg.progress_interval = v;
		self
	}
	pub fn threads(mut self, v: usize) -> Self {
		self.cfg.threads = v;
		self
	}
	pub fn procs(mut self, v: usize) -> Self {
		self.cfg.procs = v;
		self
	}
	pub fn loudness(mut self, v: LoudnessMode) -> Self {
		self.cfg.loudness = v;
		self
	}
	pub fn params(mut self, v: BatParams) -> Self {
		self.cfg.params = v;
		self
	}
	pub fn bounds(mut self, lower: f64, upper: f64) -> Self {
		self.cfg.params.lower = lower;
		self.cfg.params.upper = upper;
		self
	}
	pub fn snapshot(mut self, v: SnapshotConfig) -> Self {
		self.cfg.snapshot = Some(v);
		self
	}
	pub fn build(self) -> RunConfig {
		self.cfg
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let c = RunConfig::default();
		assert_eq!(c.population, 40);
		assert_eq!(c.iterations, 10_000);
		assert_eq!(c.loudness, LoudnessMode::Snapshot);
		assert!(c.validate().is_ok());
	}

	#[test]
	fn test_rejects_non_positive_sizes() {
		let c = RunConfigBuilder::new().population(0).build();
		assert!(matches!(c.validate(), Err(BatError::InvalidPopulation(0))));
		let c = RunConfigBuilder::new().iterations(0).build();
		assert!(matches!(c.validate(), Err(BatError::InvalidIterations(0))));
		let c = RunConfigBuilder::new().threads(0).build();
		assert!(matches!(c.validate(), Err(BatError::InvalidThreads(0))));
	}

	#[test]
	fn test_rejects_population_loudness_overflow() {
		let params = BatParams { a0: (1u64 << 60) as f64, ..BatParams::default() };
		assert!(params.validate().is_ok());
		let c = RunConfigBuilder::new().population(4).params(params).build();
		assert!(c.validate().is_ok());
		let c = RunConfigBuilder::new().population(40).params(params).build();
		assert!(matches!(c.validate(), Err(BatError::InvalidParams(_))));
	}

	#[test]
	fn test_partition_precondition() {
		let c = RunConfigBuilder::new().population(6).build();
		let err = c.validate_partition(4).unwrap_err();
		assert!(matches!(err, BatError::Indivisible { population: 6, procs: 4 }));
		assert!(err.is_config());
		assert!(c.validate_partition(3).is_ok());
	}

	#[test]
	fn test_seed_resolution() {
		let c = RunConfigBuilder::new().seed(17).build();
		assert_eq!(c.resolve_seed(), 17);
	}

	#[test]
	fn test_json_round_trip() {
		let c = RunConfigBuilder::new()
			.population(8)
			.seed(3)
			.loudness(LoudnessMode::Live)
			.snapshot(SnapshotConfig::default())
			.build();
		let text = serde_json::to_string(&c).unwrap();
		assert!(text.contains("\"live\""));
		let back: RunConfig = serde_json::from_str(&text).unwrap();
		assert_eq!(back, c);
	}
}
