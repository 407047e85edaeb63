use crate::objective::objective;
use crate::params::{BatParams, DIMENSION, INIT_RANGE, Position, V0};
use crate::rng::BatRng;

/// One member of the population
#[derive(Debug, Clone, PartialEq)]
pub struct Bat {
	/// Global index in the population; also the RNG stream id
	pub id: usize,
	pub position: Position,
	pub velocity: Position,
	pub frequency: f64,
	pub loudness: f64,
	pub pulse_rate: f64,
	/// Objective value at `position`
	pub fitness: f64,
	pub rng: BatRng,
}

impl Bat {
	/// Create candidate `id` of a run seeded with `seed`
	///
	/// The position is drawn from `INIT_RANGE`, independently of the clamp
	/// bounds in `params`.
	pub fn spawn(id: usize, seed: u32, params: &BatParams) -> Self {
		let mut rng = BatRng::new(seed, id as u32);
		let mut position = [0.0; DIMENSION];
		for x in position.iter_mut() {
			*x = rng.uniform(INIT_RANGE.0, INIT_RANGE.1);
		}
		Self {
			id,
			position,
			velocity: [V0; DIMENSION],
			frequency: params.f_min,
			loudness: params.a0,
			pulse_rate: params.r0,
			fitness: objective(&position),
			rng,
		}
	}

	/// Strict ranking used by every best-candidate reduction
	///
	/// Higher fitness wins; equal fitness goes to the lower index. A best
	/// snapshot is only ever replaced by a candidate that outranks it.
	#[inline]
	pub fn outranks(&self, other: &Bat) -> bool {
		self.fitness > other.fitness || (self.fitness == other.fitness && self.id < other.id)
	}
}
