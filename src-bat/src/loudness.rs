//! Population-mean loudness used by the local random walk
//!
//! Two readings are supported:
//! - `Snapshot`: the mean over the population as it stood at the end of the
//!   previous iteration. It is accumulated as an exact fixed-point integer
//!   sum, which is associative, so every driver (and every partitioning)
//!   computes the same bits.
//! - `Live`: the mean over whatever loudness values are currently published
//!   by the updaters, including candidates already updated in the running
//!   iteration. Reads race with writes of other slots; each slot is an
//!   atomic so a read never tears.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::bat::Bat;

/// Source of the population-mean loudness seen by one update
pub trait MeanLoudness {
	fn mean_loudness(&self) -> f64;
}

/// A mean computed up front
impl MeanLoudness for f64 {
	#[inline]
	fn mean_loudness(&self) -> f64 {
		*self
	}
}

/// How the drivers feed the mean loudness to the update rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoudnessMode {
	/// Previous-iteration mean, identical across drivers
	#[default]
	Snapshot,
	/// Relaxed read of the currently published values
	Live,
}

const FRACTION_BITS: u32 = 64;
const SCALE: f64 = (1u128 << FRACTION_BITS) as f64;

/// Bound on the total loudness of a population
///
/// Keeps the integer part of a `LoudnessSum` clear of the top bit of its
/// `u128`, so neither a single value nor the full sum can saturate.
pub const MAX_TOTAL_LOUDNESS: f64 = (1u128 << 63) as f64;

/// Whether `population` candidates at loudness `a0` fit in a `LoudnessSum`
pub fn total_fits(population: usize, a0: f64) -> bool {
	population as f64 * a0 < MAX_TOTAL_LOUDNESS
}

/// Exact, order-independent sum of loudness values
///
/// Each value is converted to a 64.64 fixed-point integer before being
/// added, so partial sums can be merged in any grouping. Values below
/// 2^-64 count as 0. The total must stay below `MAX_TOTAL_LOUDNESS`, which
/// `RunConfig::validate` enforces through `total_fits`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoudnessSum {
	total: u128,
	count: u64,
}

impl LoudnessSum {
	pub fn from_parts(total: u128, count: u64) -> Self {
		Self { total, count }
	}

	pub fn of(bats: &[Bat]) -> Self {
		let mut s = Self::default();
		for b in bats {
			s.add(b.loudness);
		}
		s
	}

	#[inline]
	pub fn add(&mut self, loudness: f64) {
		debug_assert!(loudness < MAX_TOTAL_LOUDNESS, "loudness {} saturates the fixed-point sum", loudness);
		self.total = self.total.saturating_add((loudness * SCALE) as u128);
		self.count += 1;
	}

	#[inline]
	pub fn merge(&mut self, other: &LoudnessSum) {
		self.total = self.total.saturating_add(other.total);
		self.count += other.count;
	}

	pub fn total(&self) -> u128 {
		self.total
	}

	pub fn count(&self) -> u64 {
		self.count
	}

	/// Mean of the accumulated values, 0 for an empty sum
	pub fn mean(&self) -> f64 {
		if self.count == 0 {
			return 0.0;
		}
		(self.total as f64 / SCALE) / self.count as f64
	}
}

/// Published loudness of every candidate of a slice
pub struct LoudnessBoard {
	slots: Vec<AtomicU64>,
}

impl LoudnessBoard {
	pub fn from_bats(bats: &[Bat]) -> Self {
		Self { slots: bats.iter().map(|b| AtomicU64::new(b.loudness.to_bits())).collect() }
	}

	/// Publish the loudness of slot `i`
	#[inline]
	pub fn publish(&self, i: usize, loudness: f64) {
		self.slots[i].store(loudness.to_bits(), Ordering::Relaxed);
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}
}

impl MeanLoudness for LoudnessBoard {
	fn mean_loudness(&self) -> f64 {
		if self.slots.is_empty() {
			return 0.0;
		}
		let sum: f64 = self.slots.iter().map(|s| f64::from_bits(s.load(Ordering::Relaxed))).sum();
		sum / self.slots.len() as f64
	}
}

impl<T: MeanLoudness + ?Sized> MeanLoudness for &T {
	#[inline]
	fn mean_loudness(&self) -> f64 {
		(**self).mean_loudness()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::BatParams;

	#[test]
	fn test_sum_is_grouping_independent() {
		let values: Vec<f64> = (0..37).map(|k| 0.97f64.powi(k)).collect();
		let mut flat = LoudnessSum::default();
		for &v in &values {
			flat.add(v);
		}
		let mut left = LoudnessSum::default();
		let mut right = LoudnessSum::default();
		for &v in &values[..13] {
			left.add(v);
		}
		for &v in values[13..].iter().rev() {
			right.add(v);
		}
		right.merge(&left);
		assert_eq!(flat, right);
		assert_eq!(flat.mean().to_bits(), right.mean().to_bits());
	}

	#[test]
	fn test_mean_close_to_float_mean() {
		let values = [1.0, 0.97, 0.9409, 0.5];
		let mut s = LoudnessSum::default();
		for v in values {
			s.add(v);
		}
		let float_mean = values.iter().sum::<f64>() / values.len() as f64;
		assert!((s.mean() - float_mean).abs() < 1e-15);
		assert_eq!(LoudnessSum::default().mean(), 0.0);
	}

	#[test]
	fn test_large_loudness_mean_is_exact() {
		let p = BatParams { a0: 1e15, ..BatParams::default() };
		let bats: Vec<Bat> = (0..4).map(|i| Bat::spawn(i, 1, &p)).collect();
		assert_eq!(LoudnessSum::of(&bats).mean(), 1e15);
	}

	#[test]
	fn test_total_fits() {
		assert!(total_fits(40, 1.0));
		assert!(total_fits(4, 1e15));
		assert!(!total_fits(4, 1e20));
		assert!(!total_fits(40, (1u64 << 62) as f64));
	}

	#[test]
	fn test_board_tracks_published_values() {
		let p = BatParams::default();
		let bats: Vec<Bat> = (0..4).map(|i| Bat::spawn(i, 3, &p)).collect();
		let board = LoudnessBoard::from_bats(&bats);
		assert_eq!(board.len(), 4);
		assert_eq!(board.mean_loudness(), 1.0);
		board.publish(2, 0.5);
		assert_eq!(board.mean_loudness(), 3.5 / 4.0);
	}
}
