//! One iteration's worth of updates over a contiguous slice of candidates
//!
//! The sweep is the map phase shared by every driver: each candidate of the
//! slice is updated against the same read-only best, then the slice reduces
//! to its best candidate and its loudness sum. With a worker pool the slice
//! is split into one contiguous chunk per worker; each worker folds a private
//! best and enters the merge section exactly once.

use parking_lot::Mutex;
use rayon::ThreadPool;
use rayon::prelude::*;

use crate::bat::Bat;
use crate::error::BatError;
use crate::loudness::{LoudnessBoard, LoudnessMode, LoudnessSum};
use crate::params::BatParams;
use crate::update::update_bat;

/// Partial result of a sweep
#[derive(Debug, Clone)]
pub struct SweepOutcome {
	/// Best of the slice, or the incoming best if nothing outranks it
	pub best: Bat,
	/// Loudness sum of the slice after the sweep
	pub loudness: LoudnessSum,
}

/// Read-only inputs of one sweep
pub struct SweepContext<'a> {
	pub best: &'a Bat,
	pub iteration: usize,
	pub mode: LoudnessMode,
	/// Mean used in `LoudnessMode::Snapshot`
	pub snapshot_mean: f64,
	pub params: &'a BatParams,
}

enum Source<'a> {
	Snapshot(f64),
	Live(&'a LoudnessBoard),
}

impl SweepContext<'_> {
	#[inline]
	fn update(&self, bat: &mut Bat, slot: usize, source: &Source<'_>) {
		match source {
			Source::Snapshot(mean) => update_bat(bat, self.best, self.iteration, mean, self.params),
			Source::Live(board) => {
				update_bat(bat, self.best, self.iteration, *board, self.params);
				board.publish(slot, bat.loudness);
			}
		}
	}

	fn run_chunk(&self, chunk: &mut [Bat], offset: usize, source: &Source<'_>) -> SweepOutcome {
		let mut thread_best = self.best.clone();
		let mut loudness = LoudnessSum::default();
		for (j, bat) in chunk.iter_mut().enumerate() {
			self.update(bat, offset + j, source);
			loudness.add(bat.loudness);
			if bat.outranks(&thread_best) {
				thread_best = bat.clone();
			}
		}
		SweepOutcome { best: thread_best, loudness }
	}
}

/// Build the worker pool for `threads` workers; a single worker runs inline
pub fn build_pool(threads: usize) -> Result<Option<ThreadPool>, BatError> {
	if threads == 0 {
		return Err(BatError::InvalidThreads(threads));
	}
	if threads == 1 {
		return Ok(None);
	}
	rayon::ThreadPoolBuilder::new()
		.num_threads(threads)
		.thread_name(|i| format!("bat-worker-{}", i))
		.build()
		.map(Some)
		.map_err(|e| BatError::ThreadPool(e.to_string()))
}

/// Update every candidate of `bats` once and reduce the slice
pub fn sweep(bats: &mut [Bat], ctx: &SweepContext<'_>, pool: Option<&ThreadPool>) -> SweepOutcome {
	let board = match ctx.mode {
		LoudnessMode::Live => Some(LoudnessBoard::from_bats(bats)),
		LoudnessMode::Snapshot => None,
	};
	let source = match &board {
		Some(b) => Source::Live(b),
		None => Source::Snapshot(ctx.snapshot_mean),
	};

	let Some(pool) = pool else {
		return ctx.run_chunk(bats, 0, &source);
	};

	let workers = pool.current_num_threads().max(1);
	let chunk = bats.len().div_ceil(workers).max(1);
	let next_best = Mutex::new(SweepOutcome { best: ctx.best.clone(), loudness: LoudnessSum::default() });
	pool.install(|| {
		bats.par_chunks_mut(chunk).enumerate().for_each(|(c, slice)| {
			let partial = ctx.run_chunk(slice, c * chunk, &source);
			// single merge point per worker
			let mut acc = next_best.lock();
			if partial.best.outranks(&acc.best) {
				acc.best = partial.best;
			}
			acc.loudness.merge(&partial.loudness);
		});
	});
	next_best.into_inner()
}
