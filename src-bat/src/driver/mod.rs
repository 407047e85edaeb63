//! Execution strategies for the iteration loop
//!
//! All drivers apply the same update rule to the same per-candidate random
//! streams and reduce the best candidate with the same ranking, so in
//! `LoudnessMode::Snapshot` they agree bit for bit on the final best.

use std::time::Instant;

use rayon::ThreadPool;

use crate::bat::Bat;
use crate::config::RunConfig;
use crate::error::BatError;
use crate::loudness::LoudnessSum;
use crate::population::{fitnesses, init_population, positions};
use crate::report::{BatIntermediate, BatReport, Callback, CallbackAction, DriverKind};
use crate::snapshot::SnapshotWriter;
use crate::sweep::{SweepContext, sweep};

pub mod distributed;
pub mod sequential;
pub mod threaded;

pub use distributed::{run_distributed, run_distributed_local};
pub use sequential::run_sequential;
pub use threaded::run_threaded;

/// A configured run plus an optional per-iteration callback
pub struct BatAlgorithm<'a> {
	config: RunConfig,
	callback: Option<Box<Callback<'a>>>,
}

impl<'a> BatAlgorithm<'a> {
	pub fn new(config: RunConfig) -> Self {
		Self { config, callback: None }
	}

	pub fn with_callback(mut self, cb: Box<Callback<'a>>) -> Self {
		self.callback = Some(cb);
		self
	}

	pub fn config(&self) -> &RunConfig {
		&self.config
	}

	/// Run on `driver`; the distributed driver runs `config.procs` in-process ranks
	pub fn run(&mut self, driver: DriverKind) -> Result<BatReport, BatError> {
		match driver {
			DriverKind::Sequential => run_sequential(&self.config, self.callback.as_deref_mut()),
			DriverKind::Threaded => run_threaded(&self.config, self.callback.as_deref_mut()),
			DriverKind::Distributed => {
				if self.callback.is_some() {
					return Err(BatError::Config("the distributed driver does not support callbacks".into()));
				}
				run_distributed_local(&self.config)
			}
		}
	}
}

pub(crate) fn format_position(best: &Bat) -> String {
	best.position.iter().map(|x| format!("{:.6}", x)).collect::<Vec<_>>().join(", ")
}

pub(crate) fn log_progress(config: &RunConfig, iteration: usize, best: &Bat) {
	if !config.quiet && iteration % config.progress_interval == 0 {
		log::info!(
			"[Iteration {}] Best fitness = {:.6} Position = ({})",
			iteration,
			best.fitness,
			format_position(best)
		);
	}
}

pub(crate) fn log_final(config: &RunConfig, best: &Bat) {
	if !config.quiet {
		log::info!("Final best fitness = {:.6}", best.fitness);
		log::info!("Final position = ({})", format_position(best));
	}
}

/// Shared-memory part of the sequential and threaded drivers
pub(crate) struct SharedLoop<'p> {
	pub driver: DriverKind,
	pub threads: usize,
	pub pool: Option<&'p ThreadPool>,
	pub snapshots: Option<SnapshotWriter>,
}

impl SharedLoop<'_> {
	pub fn run(self, config: &RunConfig, mut callback: Option<&mut Callback<'_>>) -> Result<BatReport, BatError> {
		let seed = config.resolve_seed();
		log::debug!(
			"{} driver: {} candidates, {} iterations, {} threads, seed {}",
			self.driver.token(),
			config.population,
			config.iterations,
			self.threads,
			seed
		);
		let (mut bats, mut best) = init_population(config.population, seed, &config.params)?;
		let mut loudness = LoudnessSum::of(&bats);

		let start = Instant::now();
		let mut completed = 0;
		for t in 0..config.iterations {
			let ctx = SweepContext {
				best: &best,
				iteration: t,
				mode: config.loudness,
				snapshot_mean: loudness.mean(),
				params: &config.params,
			};
			let outcome = sweep(&mut bats, &ctx, self.pool);
			best = outcome.best;
			loudness = outcome.loudness;
			completed = t + 1;

			if let Some(writer) = &self.snapshots {
				writer.maybe_write(t, &bats)?;
			}
			log_progress(config, t, &best);

			if let Some(cb) = callback.as_deref_mut() {
				if cb(&BatIntermediate { iteration: t, best: &best }) == CallbackAction::Stop {
					log::info!("Optimization stopped by callback after iteration {}", t);
					break;
				}
			}
		}
		let elapsed = start.elapsed();
		log_final(config, &best);

		Ok(BatReport {
			best,
			driver: self.driver,
			seed,
			population_size: config.population,
			iterations: config.iterations,
			completed,
			procs: 1,
			threads: self.threads,
			elapsed,
			population: positions(&bats),
			fitness: fitnesses(&bats),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::RunConfigBuilder;

	#[test]
	fn test_distributed_rejects_callback() {
		let cfg = RunConfigBuilder::new().population(4).iterations(2).seed(1).quiet(true).build();
		let mut algo = BatAlgorithm::new(cfg).with_callback(Box::new(|_: &BatIntermediate<'_>| CallbackAction::Continue));
		let err = algo.run(DriverKind::Distributed).unwrap_err();
		assert!(matches!(err, BatError::Config(_)));
	}

	#[test]
	fn test_algorithm_dispatch() {
		let cfg = RunConfigBuilder::new().population(8).iterations(5).seed(2).threads(2).quiet(true).build();
		let mut algo = BatAlgorithm::new(cfg);
		let seq = algo.run(DriverKind::Sequential).unwrap();
		let thr = algo.run(DriverKind::Threaded).unwrap();
		assert_eq!(seq.driver, DriverKind::Sequential);
		assert_eq!(thr.driver, DriverKind::Threaded);
		assert_eq!(seq.best, thr.best);
	}

	#[test]
	fn test_format_position() {
		let mut b = Bat::spawn(0, 1, &crate::params::BatParams::default());
		b.position = [0.5, -1.25];
		assert_eq!(format_position(&b), "0.500000, -1.250000");
	}
}
