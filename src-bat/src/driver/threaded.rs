use crate::config::RunConfig;
use crate::driver::SharedLoop;
use crate::error::BatError;
use crate::report::{BatReport, Callback, DriverKind};
use crate::sweep::build_pool;

/// Run each iteration across a pool of `config.threads` workers
///
/// The population is split into one contiguous chunk per worker. Each worker
/// reduces its chunk privately and merges into the shared best once per
/// iteration; the end of the parallel region is the barrier before the next
/// iteration starts.
pub fn run_threaded(config: &RunConfig, callback: Option<&mut Callback<'_>>) -> Result<BatReport, BatError> {
	config.validate()?;
	if config.snapshot.is_some() {
		log::debug!("population snapshots are only written by the sequential driver");
	}
	let pool = build_pool(config.threads)?;
	SharedLoop { driver: DriverKind::Threaded, threads: config.threads, pool: pool.as_ref(), snapshots: None }
		.run(config, callback)
}
