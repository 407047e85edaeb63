use crate::config::RunConfig;
use crate::driver::SharedLoop;
use crate::error::BatError;
use crate::report::{BatReport, Callback, DriverKind};
use crate::snapshot::SnapshotWriter;

/// Run the whole population on the calling thread, in index order
///
/// Writes the scheduled population snapshots when `config.snapshot` is set.
pub fn run_sequential(config: &RunConfig, callback: Option<&mut Callback<'_>>) -> Result<BatReport, BatError> {
	config.validate()?;
	let snapshots = config.snapshot.as_ref().map(SnapshotWriter::from_config).transpose()?;
	SharedLoop { driver: DriverKind::Sequential, threads: 1, pool: None, snapshots }.run(config, callback)
}
