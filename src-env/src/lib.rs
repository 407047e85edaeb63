//! Environment helpers shared by the bat optimizer binaries and tests
//!
//! The only knob is `BAT_OUTPUT_DIR`, which selects where population
//! snapshots and optimization records are written.

pub mod constants;
pub mod env_utils;

pub use env_utils::{EnvError, get_output_dir, get_records_dir, get_snapshot_dir};
