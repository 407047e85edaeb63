//! Environment variable utilities for the bat optimizer
//!
//! This module resolves the BAT_OUTPUT_DIR variable that points to the
//! directory receiving snapshots and records.

use crate::constants::{OUTPUT_DIR_VAR, RECORDS, SNAPSHOTS};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Error type for environment variable issues
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("BAT_OUTPUT_DIR is set but empty")]
    OutputDirEmpty,

    #[error("BAT_OUTPUT_DIR points to a file, not a directory: {0}")]
    OutputDirNotADirectory(PathBuf),

    #[error("Failed to create output directory {0}: {1}")]
    OutputDirCreationFailed(PathBuf, std::io::Error),
}

/// Get the output directory, creating it if necessary
///
/// # Returns
///
/// The directory named by `BAT_OUTPUT_DIR`, or the current directory when
/// the variable is not set.
///
/// # Errors
///
/// Returns an error if:
/// - BAT_OUTPUT_DIR is empty
/// - BAT_OUTPUT_DIR points to an existing file
/// - the directory cannot be created
///
/// # Example
///
/// ```no_run
/// use bat_env::env_utils::get_output_dir;
///
/// let out = get_output_dir()?;
/// println!("Output directory: {}", out.display());
/// # Ok::<(), bat_env::env_utils::EnvError>(())
/// ```
pub fn get_output_dir() -> Result<PathBuf, EnvError> {
    output_dir_from(env::var_os(OUTPUT_DIR_VAR))
}

/// Get the snapshot sub-directory of the output directory, creating it if necessary
pub fn get_snapshot_dir() -> Result<PathBuf, EnvError> {
    ensure_dir(get_output_dir()?.join(SNAPSHOTS))
}

/// Get the records sub-directory of the output directory, creating it if necessary
pub fn get_records_dir() -> Result<PathBuf, EnvError> {
    ensure_dir(get_output_dir()?.join(RECORDS))
}

fn output_dir_from(value: Option<OsString>) -> Result<PathBuf, EnvError> {
    match value {
        None => Ok(PathBuf::from(".")),
        Some(v) if v.is_empty() => Err(EnvError::OutputDirEmpty),
        Some(v) => ensure_dir(PathBuf::from(v)),
    }
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, EnvError> {
    if path.is_file() {
        return Err(EnvError::OutputDirNotADirectory(path));
    }
    if !Path::new(&path).exists() {
        std::fs::create_dir_all(&path)
            .map_err(|e| EnvError::OutputDirCreationFailed(path.clone(), e))?;
    }
    Ok(path)
}
