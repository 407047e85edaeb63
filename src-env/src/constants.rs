/// Environment variable selecting the root directory for generated files
pub const OUTPUT_DIR_VAR: &str = "BAT_OUTPUT_DIR";

/// Sub-directory for population snapshots
pub const SNAPSHOTS: &str = "snapshots";

/// Sub-directory for per-iteration optimization records
pub const RECORDS: &str = "records";
