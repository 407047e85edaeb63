use ndarray::{Array1, Array2};

use crate::bat::Bat;
use crate::error::BatError;
use crate::params::{BatParams, DIMENSION};

/// Build `size` candidates from `seed` and select the initial best
///
/// Candidate `i` is seeded with stream id `i`, so the same `(size, seed)`
/// always yields the same population. Ties for the best go to the lowest
/// index.
pub fn init_population(
	size: usize,
	seed: u32,
	params: &BatParams,
) -> Result<(Vec<Bat>, Bat), BatError> {
	if size == 0 {
		return Err(BatError::InvalidPopulation(size));
	}
	let mut bats: Vec<Bat> = Vec::new();
	bats.try_reserve_exact(size).map_err(|_| BatError::Allocation(size))?;
	for i in 0..size {
		bats.push(Bat::spawn(i, seed, params));
	}
	let mut best = &bats[0];
	for b in &bats[1..] {
		if b.outranks(best) {
			best = b;
		}
	}
	let best = best.clone();
	log::debug!("initial population of {} ready, best fitness {:.6} (bat {})", size, best.fitness, best.id);
	Ok((bats, best))
}

/// Fold `bats` into `current` with the strict ranking
///
/// Returns `current` unchanged when no candidate outranks it.
pub fn best_of(bats: &[Bat], current: &Bat) -> Bat {
	let mut best = current;
	for b in bats {
		if b.outranks(best) {
			best = b;
		}
	}
	best.clone()
}

/// Positions as an `n x DIMENSION` matrix, row `i` = candidate `i`
pub fn positions(bats: &[Bat]) -> Array2<f64> {
	Array2::from_shape_fn((bats.len(), DIMENSION), |(i, d)| bats[i].position[d])
}

/// Fitness of every candidate, in population order
pub fn fitnesses(bats: &[Bat]) -> Array1<f64> {
	bats.iter().map(|b| b.fitness).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::objective::objective;

	#[test]
	fn test_init_is_deterministic() {
		let p = BatParams::default();
		let (a, best_a) = init_population(16, 99, &p).unwrap();
		let (b, best_b) = init_population(16, 99, &p).unwrap();
		assert_eq!(a, b);
		assert_eq!(best_a, best_b);
	}

	#[test]
	fn test_seed_changes_population() {
		let p = BatParams::default();
		let (a, _) = init_population(8, 1, &p).unwrap();
		let (b, _) = init_population(8, 2, &p).unwrap();
		assert_ne!(positions(&a), positions(&b));
	}

	#[test]
	fn test_best_is_maximum() {
		let p = BatParams::default();
		let (bats, best) = init_population(40, 5, &p).unwrap();
		let max = bats.iter().map(|b| b.fitness).fold(f64::NEG_INFINITY, f64::max);
		assert_eq!(best.fitness, max);
		assert_eq!(best, bats[best.id]);
		assert_eq!(best.fitness, objective(&best.position));
	}

	#[test]
	fn test_tie_goes_to_lowest_index() {
		let p = BatParams::default();
		let (mut bats, _) = init_population(5, 8, &p).unwrap();
		for b in bats.iter_mut() {
			b.position = [1.0, 1.0];
			b.fitness = objective(&b.position);
		}
		let seed_best = bats[4].clone();
		let best = best_of(&bats, &seed_best);
		assert_eq!(best.id, 0);
	}

	#[test]
	fn test_best_of_keeps_current_when_not_beaten() {
		let p = BatParams::default();
		let (bats, best) = init_population(10, 3, &p).unwrap();
		let mut stronger = best.clone();
		stronger.fitness = 1.0;
		stronger.id = usize::MAX;
		assert_eq!(best_of(&bats, &stronger), stronger);
	}

	#[test]
	fn test_zero_size_rejected() {
		let p = BatParams::default();
		assert!(matches!(init_population(0, 1, &p), Err(BatError::InvalidPopulation(0))));
	}

	#[test]
	fn test_matrix_views() {
		let p = BatParams::default();
		let (bats, _) = init_population(3, 4, &p).unwrap();
		let m = positions(&bats);
		assert_eq!(m.dim(), (3, DIMENSION));
		assert_eq!(m[[2, 1]], bats[2].position[1]);
		assert_eq!(fitnesses(&bats)[1], bats[1].fitness);
	}
}
