//! SPMD driver: every rank owns a contiguous partition of the population
//!
//! Start-up: rank 0 builds the population, scatters equal partitions and
//! broadcasts the initial best together with the initial loudness sum.
//!
//! Each iteration issues exactly two collectives:
//! 1. an all-reduce of `(fitness, id, rank, loudness sum)` with the
//!    max-with-location operator;
//! 2. a broadcast of the winning candidate from the rank that holds it.
//!
//! After the loop rank 0 gathers the partitions to build the report.

use std::thread;
use std::time::Instant;

use crate::bat::Bat;
use crate::comm::{ChannelTransport, MaxLoc, Transport, all_reduce, broadcast_value, gather, scatter};
use crate::config::RunConfig;
use crate::driver::{log_final, log_progress};
use crate::error::{BatError, CommError};
use crate::loudness::LoudnessSum;
use crate::population::{fitnesses, init_population, positions};
use crate::report::{BatReport, DriverKind};
use crate::sweep::{SweepContext, build_pool, sweep};

/// Run one rank of a distributed job over `transport`
///
/// Every rank must call this with the same configuration. Rank 0 returns
/// the report, other ranks return `None`. Configuration errors are detected
/// before any message is exchanged, identically on every rank.
pub fn run_distributed<T: Transport + ?Sized>(
	transport: &mut T,
	config: &RunConfig,
) -> Result<Option<BatReport>, BatError> {
	let procs = transport.size();
	let rank = transport.rank();
	config.validate_partition(procs)?;
	let pool = build_pool(config.threads)?;
	let local_n = config.population / procs;

	// start-up
	let mut seed = 0;
	let (parts, initial) = if rank == 0 {
		seed = config.resolve_seed();
		log::debug!(
			"mpi driver: {} candidates over {} ranks, {} iterations, seed {}",
			config.population,
			procs,
			config.iterations,
			seed
		);
		let (bats, best) = init_population(config.population, seed, &config.params)?;
		let loudness = LoudnessSum::of(&bats);
		let parts: Vec<Vec<Bat>> = bats.chunks(local_n).map(|c| c.to_vec()).collect();
		(Some(parts), Some((best, loudness)))
	} else {
		(None, None)
	};
	let mut local: Vec<Bat> = scatter(transport, parts)?;
	let (mut best, mut loudness): (Bat, LoudnessSum) = broadcast_value(transport, 0, initial.as_ref())?;

	let start = Instant::now();
	for t in 0..config.iterations {
		let ctx = SweepContext {
			best: &best,
			iteration: t,
			mode: config.loudness,
			snapshot_mean: loudness.mean(),
			params: &config.params,
		};
		let outcome = sweep(&mut local, &ctx, pool.as_ref());

		let global = all_reduce(transport, MaxLoc::new(&outcome.best, rank, outcome.loudness), MaxLoc::combine)?;
		let owned = (rank == global.rank).then_some(&outcome.best);
		best = broadcast_value(transport, global.rank, owned)?;
		loudness = global.loudness;

		if rank == 0 {
			log_progress(config, t, &best);
		}
	}
	let elapsed = start.elapsed();

	let Some(parts) = gather(transport, local)? else {
		return Ok(None);
	};
	let bats: Vec<Bat> = parts.into_iter().flatten().collect();
	log_final(config, &best);

	Ok(Some(BatReport {
		best,
		driver: DriverKind::Distributed,
		seed,
		population_size: config.population,
		iterations: config.iterations,
		completed: config.iterations,
		procs,
		threads: config.threads,
		elapsed,
		population: positions(&bats),
		fitness: fitnesses(&bats),
	}))
}

/// Run `config.procs` ranks as threads of this process and return rank 0's report
pub fn run_distributed_local(config: &RunConfig) -> Result<BatReport, BatError> {
	config.validate_partition(config.procs)?;
	// all ranks must see the same seed
	let mut config = config.clone();
	config.seed = Some(config.resolve_seed());
	let config = &config;

	let results: Vec<Result<Option<BatReport>, BatError>> = thread::scope(|s| {
		let handles: Vec<_> = ChannelTransport::mesh(config.procs)
			.into_iter()
			.map(|mut t| {
				let rank = t.rank();
				thread::Builder::new()
					.name(format!("bat-rank-{}", rank))
					.spawn_scoped(s, move || run_distributed(&mut t, config))
					.map_err(BatError::Io)
			})
			.collect();
		handles
			.into_iter()
			.enumerate()
			.map(|(rank, h)| {
				h?.join().map_err(|_| BatError::ThreadPool(format!("rank {} panicked", rank)))?
			})
			.collect()
	});

	// a failing rank makes its peers see disconnects; report the root cause
	let mut first_err = None;
	let mut report = None;
	for r in results {
		match r {
			Ok(Some(rep)) => report = Some(rep),
			Ok(None) => {}
			Err(e) => {
				let replace = match &first_err {
					None => true,
					Some(prev) => is_disconnect(prev) && !is_disconnect(&e),
				};
				if replace {
					first_err = Some(e);
				}
			}
		}
	}
	if let Some(e) = first_err {
		return Err(e);
	}
	report.ok_or_else(|| BatError::Config("rank 0 produced no report".into()))
}

fn is_disconnect(e: &BatError) -> bool {
	matches!(e, BatError::Comm(CommError::Disconnected { .. }))
}
