//! Error types for the optimizer and its message-passing layer

use thiserror::Error;

/// Errors raised by the drivers
///
/// Configuration variants are detected before any worker starts and before
/// any collective communication, so a failing run never leaves ranks behind.
#[derive(Debug, Error)]
pub enum BatError {
	#[error("population size must be positive, got {0}")]
	InvalidPopulation(usize),

	#[error("iteration count must be positive, got {0}")]
	InvalidIterations(usize),

	#[error("worker thread count must be positive, got {0}")]
	InvalidThreads(usize),

	#[error("worker process count must be positive, got {0}")]
	InvalidProcs(usize),

	#[error("progress interval must be positive")]
	InvalidProgressInterval,

	#[error("invalid algorithm parameters: {0}")]
	InvalidParams(String),

	#[error("population size {population} is not divisible by {procs} worker processes")]
	Indivisible { population: usize, procs: usize },

	#[error("configuration error: {0}")]
	Config(String),

	#[error("cannot allocate a population of {0} candidates")]
	Allocation(usize),

	#[error("cannot build worker pool: {0}")]
	ThreadPool(String),

	#[error("communication failure: {0}")]
	Comm(#[from] CommError),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("CSV error: {0}")]
	Csv(#[from] csv::Error),

	#[error("environment error: {0}")]
	Env(#[from] bat_env::EnvError),
}

impl BatError {
	/// True for errors an operator fixes by changing the configuration
	pub fn is_config(&self) -> bool {
		matches!(
			self,
			BatError::InvalidPopulation(_)
				| BatError::InvalidIterations(_)
				| BatError::InvalidThreads(_)
				| BatError::InvalidProcs(_)
				| BatError::InvalidProgressInterval
				| BatError::InvalidParams(_)
				| BatError::Indivisible { .. }
				| BatError::Config(_)
		)
	}
}

/// Errors of the point-to-point transports and the wire codec
#[derive(Debug, Error)]
pub enum CommError {
	#[error("peer rank {peer} disconnected")]
	Disconnected { peer: usize },

	#[error("rank {rank} is outside a world of {size}")]
	InvalidRank { rank: usize, size: usize },

	#[error("mesh setup timed out after {0:?}")]
	SetupTimeout(std::time::Duration),

	#[error("malformed message: {0}")]
	Codec(String),

	#[error("transport I/O error: {0}")]
	Io(#[from] std::io::Error),
}
