//! Collective operations built on point-to-point messages
//!
//! `reduce` and `broadcast` use binomial trees, so both finish in
//! `ceil(log2(size))` rounds with no central collector. `scatter` and
//! `gather` are linear and only used at start-up and teardown.
//! Every rank of the job must enter the same collectives in the same order.

use crate::bat::Bat;
use crate::comm::codec::{Wire, from_bytes, to_bytes};
use crate::comm::transport::Transport;
use crate::error::CommError;
use crate::loudness::LoudnessSum;

/// Max-with-location reduction value
///
/// Carries the partial loudness sum along so one reduction serves both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxLoc {
	pub fitness: f64,
	/// Global index of the candidate
	pub id: usize,
	/// Rank holding the candidate
	pub rank: usize,
	pub loudness: LoudnessSum,
}

impl MaxLoc {
	pub fn new(best: &Bat, rank: usize, loudness: LoudnessSum) -> Self {
		Self { fitness: best.fitness, id: best.id, rank, loudness }
	}

	/// Higher fitness, then lower id, then lower rank
	fn beats(&self, other: &MaxLoc) -> bool {
		if self.fitness != other.fitness {
			return self.fitness > other.fitness;
		}
		(self.id, self.rank) < (other.id, other.rank)
	}

	/// Combine two partial results; associative and commutative
	pub fn combine(self, other: MaxLoc) -> MaxLoc {
		let mut loudness = self.loudness;
		loudness.merge(&other.loudness);
		let winner = if other.beats(&self) { other } else { self };
		MaxLoc { loudness, ..winner }
	}
}

/// Send `payload` from `root` to every rank; returns the payload on all ranks
///
/// Non-root ranks pass an empty buffer.
pub fn broadcast<T: Transport + ?Sized>(t: &mut T, root: usize, payload: Vec<u8>) -> Result<Vec<u8>, CommError> {
	t.check_rank(root)?;
	let size = t.size();
	let rank = t.rank();
	let relative = (rank + size - root) % size;

	let mut buf = payload;
	let mut mask = 1;
	while mask < size {
		if relative & mask != 0 {
			let src = (rank + size - mask) % size;
			buf = t.recv(src)?;
			break;
		}
		mask <<= 1;
	}
	mask >>= 1;
	while mask > 0 {
		if relative + mask < size {
			let dest = (rank + mask) % size;
			t.send(dest, &buf)?;
		}
		mask >>= 1;
	}
	Ok(buf)
}

/// Typed broadcast; only `root` needs to supply a value
pub fn broadcast_value<T, W>(t: &mut T, root: usize, value: Option<&W>) -> Result<W, CommError>
where
	T: Transport + ?Sized,
	W: Wire,
{
	let payload = if t.rank() == root {
		let v = value.ok_or_else(|| CommError::Codec("broadcast root has no value".into()))?;
		to_bytes(v)?
	} else {
		Vec::new()
	};
	from_bytes(&broadcast(t, root, payload)?)
}

/// Combine every rank's value with `op`; rank 0 gets `Some(result)`
pub fn reduce<T, W, F>(t: &mut T, value: W, op: F) -> Result<Option<W>, CommError>
where
	T: Transport + ?Sized,
	W: Wire,
	F: Fn(W, W) -> W,
{
	let size = t.size();
	let rank = t.rank();
	let mut acc = value;
	let mut mask = 1;
	while mask < size {
		if rank & mask == 0 {
			let src = rank | mask;
			if src < size {
				let other = from_bytes(&t.recv(src)?)?;
				acc = op(acc, other);
			}
		} else {
			t.send(rank & !mask, &to_bytes(&acc)?)?;
			return Ok(None);
		}
		mask <<= 1;
	}
	Ok(Some(acc))
}

/// `reduce` to rank 0 followed by `broadcast` from rank 0
pub fn all_reduce<T, W, F>(t: &mut T, value: W, op: F) -> Result<W, CommError>
where
	T: Transport + ?Sized,
	W: Wire,
	F: Fn(W, W) -> W,
{
	let reduced = reduce(t, value, op)?;
	broadcast_value(t, 0, reduced.as_ref())
}

/// Rank 0 sends `parts[r]` to rank `r` and keeps `parts[0]`
///
/// Other ranks pass `None` and receive their part.
pub fn scatter<T, W>(t: &mut T, parts: Option<Vec<W>>) -> Result<W, CommError>
where
	T: Transport + ?Sized,
	W: Wire,
{
	if t.rank() != 0 {
		return from_bytes(&t.recv(0)?);
	}
	let parts = parts.ok_or_else(|| CommError::Codec("scatter root has no data".into()))?;
	if parts.len() != t.size() {
		return Err(CommError::Codec(format!("scatter of {} parts over {} ranks", parts.len(), t.size())));
	}
	let mut parts = parts.into_iter();
	let own = parts.next().ok_or_else(|| CommError::Codec("empty scatter".into()))?;
	for (dest, part) in parts.enumerate() {
		t.send(dest + 1, &to_bytes(&part)?)?;
	}
	Ok(own)
}

/// Every rank sends `value` to rank 0, which gets them back in rank order
pub fn gather<T, W>(t: &mut T, value: W) -> Result<Option<Vec<W>>, CommError>
where
	T: Transport + ?Sized,
	W: Wire,
{
	if t.rank() != 0 {
		t.send(0, &to_bytes(&value)?)?;
		return Ok(None);
	}
	let mut out = Vec::with_capacity(t.size());
	out.push(value);
	for src in 1..t.size() {
		out.push(from_bytes(&t.recv(src)?)?);
	}
	Ok(Some(out))
}
