use crate::bat::Bat;
use crate::loudness::MeanLoudness;
use crate::objective::objective;
use crate::params::{BatParams, DIMENSION, LOCAL_WALK_SCALE};

/// Apply one Bat Algorithm move to `bat`
///
/// `best` is the read-only snapshot finalized at the end of the previous
/// iteration. Only `bat` is written; the random draws come from its own
/// stream, in this order: frequency, pulse, [2 normals per dimension when
/// the local walk runs], acceptance.
///
/// On rejection the stored position, fitness, loudness and pulse rate keep
/// their previous values; frequency and velocity keep their new values.
pub fn update_bat<L: MeanLoudness + ?Sized>(
	bat: &mut Bat,
	best: &Bat,
	iteration: usize,
	loudness: &L,
	params: &BatParams,
) {
	let beta = bat.rng.uniform01();
	bat.frequency = params.f_min + (params.f_max - params.f_min) * beta;

	// always attract towards the best candidate
	for d in 0..DIMENSION {
		bat.velocity[d] += (best.position[d] - bat.position[d]) * bat.frequency;
	}

	let mut candidate = bat.position;
	for d in 0..DIMENSION {
		candidate[d] = params.clamp(candidate[d] + bat.velocity[d]);
	}
	let mut f_new = objective(&candidate);

	let pulse = bat.rng.uniform01();
	if pulse > bat.pulse_rate {
		let a_mean = loudness.mean_loudness();
		let mut local = [0.0; DIMENSION];
		for d in 0..DIMENSION {
			let eps = bat.rng.normal(0.0, 1.0);
			local[d] = params.clamp(best.position[d] + LOCAL_WALK_SCALE * eps * a_mean);
		}
		let f_local = objective(&local);
		if f_local > f_new {
			candidate = local;
			f_new = f_local;
		}
	}

	let accept = bat.rng.uniform01();
	if f_new > bat.fitness && accept < bat.loudness {
		bat.position = candidate;
		bat.fitness = f_new;
		bat.loudness *= params.alpha;
		bat.pulse_rate = params.pulse_rate_at(iteration);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::{LB, UB};
	use crate::rng::BatRng;

	fn bat_at(id: usize, position: [f64; DIMENSION], seed: u32) -> Bat {
		let p = BatParams::default();
		let mut b = Bat::spawn(id, seed, &p);
		b.position = position;
		b.fitness = objective(&position);
		b
	}

	#[test]
	fn test_only_target_changes_and_best_untouched() {
		let p = BatParams::default();
		let best = bat_at(0, [0.5, -0.5], 1);
		let best_before = best.clone();
		let mut bat = bat_at(1, [4.0, 4.0], 1);
		update_bat(&mut bat, &best, 3, &1.0, &p);
		assert_eq!(best, best_before);
		assert_eq!(bat.id, 1);
	}

	#[test]
	fn test_bounds_respected() {
		let p = BatParams::default();
		let best = bat_at(0, [UB, LB], 5);
		for id in 0..50 {
			let mut bat = bat_at(id, [LB, UB], 5);
			bat.velocity = [1e6, -1e6];
			for t in 0..20 {
				update_bat(&mut bat, &best, t, &1.0, &p);
				for &x in &bat.position {
					assert!((LB..=UB).contains(&x), "x={} out of bounds", x);
				}
			}
		}
	}

	#[test]
	fn test_rejection_keeps_position_but_not_velocity() {
		let p = BatParams::default();
		// sitting on the optimum: nothing can be strictly better
		let best = bat_at(0, [0.0, 0.0], 2);
		let mut bat = bat_at(0, [0.0, 0.0], 2);
		bat.velocity = [0.3, -0.2];
		update_bat(&mut bat, &best, 1, &1.0, &p);
		assert_eq!(bat.position, [0.0, 0.0]);
		assert_eq!(bat.loudness, p.a0);
		assert_eq!(bat.pulse_rate, p.r0);
		// velocity and frequency are kept even though the move was rejected
		assert_eq!(bat.velocity, [0.3, -0.2]);
		assert!(bat.frequency >= p.f_min && bat.frequency <= p.f_max);
	}

	#[test]
	fn test_acceptance_requires_loudness() {
		let p = BatParams::default();
		let best = bat_at(0, [0.0, 0.0], 4);
		// a silent bat never accepts, however good the move
		let mut bat = bat_at(1, [3.0, 3.0], 4);
		bat.loudness = f64::MIN_POSITIVE;
		let before = bat.position;
		update_bat(&mut bat, &best, 2, &1.0, &p);
		assert_eq!(bat.position, before);
		assert_eq!(bat.fitness, objective(&before));
	}

	#[test]
	fn test_replays_stream_by_hand() {
		let p = BatParams::default();
		let best = bat_at(0, [0.25, -0.75], 9);
		let mut bat = bat_at(1, [2.0, 1.0], 9);
		bat.pulse_rate = 0.0; // force the local walk
		let mut rng = bat.rng.clone();
		let start = bat.clone();
		update_bat(&mut bat, &best, 4, &0.5, &p);

		let freq = p.f_min + (p.f_max - p.f_min) * rng.uniform01();
		let v = [
			(best.position[0] - start.position[0]) * freq,
			(best.position[1] - start.position[1]) * freq,
		];
		let global = [p.clamp(start.position[0] + v[0]), p.clamp(start.position[1] + v[1])];
		let _pulse = rng.uniform01();
		let local = [
			p.clamp(best.position[0] + 0.1 * rng.normal(0.0, 1.0) * 0.5),
			p.clamp(best.position[1] + 0.1 * rng.normal(0.0, 1.0) * 0.5),
		];
		let (cand, f_cand) = if objective(&local) > objective(&global) {
			(local, objective(&local))
		} else {
			(global, objective(&global))
		};
		let accept = rng.uniform01();
		assert_eq!(bat.frequency, freq);
		assert_eq!(bat.velocity, v);
		if f_cand > start.fitness && accept < start.loudness {
			assert_eq!(bat.position, cand);
			assert_eq!(bat.fitness, f_cand);
			assert_eq!(bat.loudness, start.loudness * p.alpha);
			assert_eq!(bat.pulse_rate, p.pulse_rate_at(4));
		} else {
			assert_eq!(bat.position, start.position);
		}
		assert_eq!(bat.rng, rng);
	}

	#[test]
	fn test_no_local_walk_draws_three_uniforms() {
		let p = BatParams::default();
		let best = bat_at(0, [0.0, 0.0], 6);
		let mut bat = bat_at(1, [1.0, 1.0], 6);
		// pulse draws are < 1 so a pulse rate of 1 disables the walk
		bat.pulse_rate = 1.0;
		let mut rng: BatRng = bat.rng.clone();
		update_bat(&mut bat, &best, 0, &1.0, &p);
		for _ in 0..3 {
			rng.uniform01();
		}
		assert_eq!(bat.rng, rng);
	}
}
