//! Algorithm constants and search-space bounds

use serde::{Deserialize, Serialize};

use crate::error::BatError;
use crate::loudness::{MAX_TOTAL_LOUDNESS, total_fits};

/// Dimensionality of the search space
pub const DIMENSION: usize = 2;

/// A point (or velocity) in the search space
pub type Position = [f64; DIMENSION];

pub const F_MIN: f64 = 0.0;
pub const F_MAX: f64 = 1.0;
/// Initial loudness
pub const A0: f64 = 1.0;
/// Initial pulse rate
pub const R0: f64 = 1.0;
/// Initial velocity component
pub const V0: f64 = 0.0;
/// Loudness decay on each accepted move
pub const ALPHA: f64 = 0.97;
/// Pulse-rate growth
pub const GAMMA: f64 = 0.1;
pub const LB: f64 = -5.0;
pub const UB: f64 = 5.0;

/// Range initial positions are drawn from.
///
/// Fixed on purpose: it does not follow `BatParams::lower/upper`.
pub const INIT_RANGE: (f64, f64) = (-5.0, 5.0);

/// Scale of the local random walk around the best candidate
pub const LOCAL_WALK_SCALE: f64 = 0.1;

/// Tunable coefficients of the Bat Algorithm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatParams {
	pub f_min: f64,
	pub f_max: f64,
	pub a0: f64,
	pub r0: f64,
	pub alpha: f64,
	pub gamma: f64,
	/// Lower clamp bound applied after every move
	pub lower: f64,
	/// Upper clamp bound applied after every move
	pub upper: f64,
}

impl Default for BatParams {
	fn default() -> Self {
		Self {
			f_min: F_MIN,
			f_max: F_MAX,
			a0: A0,
			r0: R0,
			alpha: ALPHA,
			gamma: GAMMA,
			lower: LB,
			upper: UB,
		}
	}
}

impl BatParams {
	/// Check the coefficient ranges the update rule relies on
	pub fn validate(&self) -> Result<(), BatError> {
		let finite = [
			self.f_min, self.f_max, self.a0, self.r0, self.alpha, self.gamma, self.lower,
			self.upper,
		]
		.iter()
		.all(|v| v.is_finite());
		if !finite {
			return Err(BatError::InvalidParams("all coefficients must be finite".into()));
		}
		if self.lower >= self.upper {
			return Err(BatError::InvalidParams(format!(
				"lower bound {} must be below upper bound {}",
				self.lower, self.upper
			)));
		}
		if self.f_min > self.f_max {
			return Err(BatError::InvalidParams(format!(
				"f_min {} exceeds f_max {}",
				self.f_min, self.f_max
			)));
		}
		if !(self.alpha > 0.0 && self.alpha < 1.0) {
			return Err(BatError::InvalidParams(format!("alpha {} not in (0, 1)", self.alpha)));
		}
		if self.a0 <= 0.0 {
			return Err(BatError::InvalidParams(format!("a0 {} must be positive", self.a0)));
		}
		if !total_fits(1, self.a0) {
			return Err(BatError::InvalidParams(format!(
				"a0 {} must be below {}",
				self.a0, MAX_TOTAL_LOUDNESS
			)));
		}
		if self.gamma < 0.0 {
			return Err(BatError::InvalidParams(format!("gamma {} must be >= 0", self.gamma)));
		}
		Ok(())
	}

	/// Clamp one coordinate to [lower, upper]
	#[inline]
	pub fn clamp(&self, v: f64) -> f64 {
		if v < self.lower {
			self.lower
		} else if v > self.upper {
			self.upper
		} else {
			v
		}
	}

	/// Pulse rate reached after an accepted move at `iteration`
	#[inline]
	pub fn pulse_rate_at(&self, iteration: usize) -> f64 {
		self.r0 * (1.0 - (-self.gamma * iteration as f64).exp())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_are_valid() {
		assert!(BatParams::default().validate().is_ok());
	}

	#[test]
	fn test_reject_inverted_bounds() {
		let p = BatParams { lower: 1.0, upper: -1.0, ..BatParams::default() };
		assert!(matches!(p.validate(), Err(BatError::InvalidParams(_))));
	}

	#[test]
	fn test_reject_alpha_out_of_range() {
		for alpha in [0.0, 1.0, 1.5, -0.2] {
			let p = BatParams { alpha, ..BatParams::default() };
			assert!(p.validate().is_err(), "alpha={} accepted", alpha);
		}
	}

	#[test]
	fn test_reject_oversized_a0() {
		let p = BatParams { a0: 1e20, ..BatParams::default() };
		assert!(matches!(p.validate(), Err(BatError::InvalidParams(_))));
		let p = BatParams { a0: 1e15, ..BatParams::default() };
		assert!(p.validate().is_ok());
	}

	#[test]
	fn test_clamp() {
		let p = BatParams::default();
		assert_eq!(p.clamp(-7.0), LB);
		assert_eq!(p.clamp(7.0), UB);
		assert_eq!(p.clamp(1.25), 1.25);
	}

	#[test]
	fn test_pulse_rate_grows_towards_r0() {
		let p = BatParams::default();
		assert_eq!(p.pulse_rate_at(0), 0.0);
		let mut prev = 0.0;
		for t in 1..200 {
			let r = p.pulse_rate_at(t);
			assert!(r >= prev && r <= p.r0);
			prev = r;
		}
		assert!((prev - p.r0).abs() < 1e-6);
	}
}
