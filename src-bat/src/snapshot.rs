//! Population snapshots written by the sequential driver
//!
//! One file per scheduled iteration, one row per candidate, coordinates
//! separated by commas and no header line.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::bat::Bat;
use crate::config::SnapshotConfig;
use crate::error::BatError;

/// File name of the snapshot taken at `iteration`
pub fn snapshot_file_name(iteration: usize) -> String {
	format!("snapshot_t{:03}.csv", iteration / 10)
}

/// Resolved snapshot schedule and target directory
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
	dir: PathBuf,
	iterations: Vec<usize>,
}

impl SnapshotWriter {
	/// Resolve the target directory, falling back to `BAT_OUTPUT_DIR/snapshots`
	///
	/// Fails when two scheduled iterations map to the same file name.
	pub fn from_config(config: &SnapshotConfig) -> Result<Self, BatError> {
		let mut names = HashMap::new();
		for &t in &config.iterations {
			if let Some(prev) = names.insert(snapshot_file_name(t), t) {
				if prev != t {
					return Err(BatError::Config(format!(
						"snapshot iterations {} and {} both write {}",
						prev,
						t,
						snapshot_file_name(t)
					)));
				}
			}
		}
		let dir = match &config.dir {
			Some(d) => {
				std::fs::create_dir_all(d)?;
				d.clone()
			}
			None => bat_env::get_snapshot_dir()?,
		};
		Ok(Self { dir, iterations: config.iterations.clone() })
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	pub fn is_scheduled(&self, iteration: usize) -> bool {
		self.iterations.contains(&iteration)
	}

	/// Write the snapshot for `iteration` if it is scheduled
	pub fn maybe_write(&self, iteration: usize, bats: &[Bat]) -> Result<Option<PathBuf>, BatError> {
		if !self.is_scheduled(iteration) {
			return Ok(None);
		}
		let path = self.dir.join(snapshot_file_name(iteration));
		write_positions(&path, bats)?;
		log::debug!("snapshot of iteration {} written to {}", iteration, path.display());
		Ok(Some(path))
	}
}

/// Write every candidate's position as one CSV row
pub fn write_positions(path: &Path, bats: &[Bat]) -> Result<(), BatError> {
	let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
	for b in bats {
		writer.write_record(b.position.iter().map(|x| format!("{:.6}", x)))?;
	}
	writer.flush()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::BatParams;
	use crate::population::init_population;

	#[test]
	fn test_file_names() {
		assert_eq!(snapshot_file_name(0), "snapshot_t000.csv");
		assert_eq!(snapshot_file_name(2500), "snapshot_t250.csv");
		assert_eq!(snapshot_file_name(7500), "snapshot_t750.csv");
	}

	#[test]
	fn test_colliding_schedule_rejected() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = SnapshotConfig { dir: Some(tmp.path().to_path_buf()), iterations: vec![0, 5] };
		assert!(matches!(SnapshotWriter::from_config(&cfg), Err(BatError::Config(_))));
		let cfg = SnapshotConfig { dir: Some(tmp.path().to_path_buf()), iterations: vec![0, 10, 10] };
		assert!(SnapshotWriter::from_config(&cfg).is_ok());
		let cfg = SnapshotConfig { dir: Some(tmp.path().to_path_buf()), ..SnapshotConfig::default() };
		assert!(SnapshotWriter::from_config(&cfg).is_ok());
	}

	#[test]
	fn test_writes_only_scheduled_iterations() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = SnapshotConfig { dir: Some(tmp.path().to_path_buf()), iterations: vec![0, 20] };
		let writer = SnapshotWriter::from_config(&cfg).unwrap();
		let (bats, _) = init_population(5, 1, &BatParams::default()).unwrap();

		assert!(writer.maybe_write(1, &bats).unwrap().is_none());
		let path = writer.maybe_write(20, &bats).unwrap().unwrap();
		assert!(path.ends_with("snapshot_t002.csv"));

		let text = std::fs::read_to_string(&path).unwrap();
		let rows: Vec<&str> = text.lines().collect();
		assert_eq!(rows.len(), 5);
		let first: Vec<f64> = rows[0].split(',').map(|v| v.parse().unwrap()).collect();
		assert_eq!(first.len(), 2);
		assert!((first[0] - bats[0].position[0]).abs() < 1e-6);
	}
}
