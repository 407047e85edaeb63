//! Little-endian wire format for everything exchanged between ranks
//!
//! A `Bat` is a fixed-size record:
//! `id u64 | position f64 x D | velocity f64 x D | frequency | loudness |
//! pulse_rate | fitness (f64 each) | rng state u32`.
//! A partition is a `u64` count followed by that many records.

use std::io::{Cursor, ErrorKind};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::bat::Bat;
use crate::comm::collective::MaxLoc;
use crate::error::CommError;
use crate::loudness::LoudnessSum;
use crate::params::DIMENSION;
use crate::rng::BatRng;

/// Encoded size of one `Bat`
pub const BAT_RECORD_LEN: usize = 8 + 16 * DIMENSION + 32 + 4;

/// Types that can cross a transport
pub trait Wire: Sized {
	fn encode(&self, out: &mut Vec<u8>) -> Result<(), CommError>;
	fn decode(input: &mut Cursor<&[u8]>) -> Result<Self, CommError>;
}

/// Encode a value into a fresh buffer
pub fn to_bytes<T: Wire>(value: &T) -> Result<Vec<u8>, CommError> {
	let mut out = Vec::new();
	value.encode(&mut out)?;
	Ok(out)
}

/// Decode a value that must span the whole buffer
pub fn from_bytes<T: Wire>(bytes: &[u8]) -> Result<T, CommError> {
	let mut cur = Cursor::new(bytes);
	let value = T::decode(&mut cur)?;
	if cur.position() as usize != bytes.len() {
		return Err(CommError::Codec(format!(
			"{} trailing bytes after message",
			bytes.len() - cur.position() as usize
		)));
	}
	Ok(value)
}

fn truncated(e: std::io::Error) -> CommError {
	if e.kind() == ErrorKind::UnexpectedEof {
		CommError::Codec("truncated message".into())
	} else {
		CommError::Io(e)
	}
}

fn get_f64(input: &mut Cursor<&[u8]>) -> Result<f64, CommError> {
	input.read_f64::<LittleEndian>().map_err(truncated)
}

fn get_u64(input: &mut Cursor<&[u8]>) -> Result<u64, CommError> {
	input.read_u64::<LittleEndian>().map_err(truncated)
}

fn get_index(input: &mut Cursor<&[u8]>) -> Result<usize, CommError> {
	let v = get_u64(input)?;
	usize::try_from(v).map_err(|_| CommError::Codec(format!("index {} out of range", v)))
}

impl Wire for Bat {
	fn encode(&self, out: &mut Vec<u8>) -> Result<(), CommError> {
		out.write_u64::<LittleEndian>(self.id as u64)?;
		for &x in self.position.iter().chain(self.velocity.iter()) {
			out.write_f64::<LittleEndian>(x)?;
		}
		out.write_f64::<LittleEndian>(self.frequency)?;
		out.write_f64::<LittleEndian>(self.loudness)?;
		out.write_f64::<LittleEndian>(self.pulse_rate)?;
		out.write_f64::<LittleEndian>(self.fitness)?;
		out.write_u32::<LittleEndian>(self.rng.state())?;
		Ok(())
	}

	fn decode(input: &mut Cursor<&[u8]>) -> Result<Self, CommError> {
		let id = get_index(input)?;
		let mut position = [0.0; DIMENSION];
		for x in position.iter_mut() {
			*x = get_f64(input)?;
		}
		let mut velocity = [0.0; DIMENSION];
		for v in velocity.iter_mut() {
			*v = get_f64(input)?;
		}
		let frequency = get_f64(input)?;
		let loudness = get_f64(input)?;
		let pulse_rate = get_f64(input)?;
		let fitness = get_f64(input)?;
		let state = input.read_u32::<LittleEndian>().map_err(truncated)?;
		Ok(Bat {
			id,
			position,
			velocity,
			frequency,
			loudness,
			pulse_rate,
			fitness,
			rng: BatRng::from_state(state),
		})
	}
}

impl Wire for Vec<Bat> {
	fn encode(&self, out: &mut Vec<u8>) -> Result<(), CommError> {
		out.reserve(8 + self.len() * BAT_RECORD_LEN);
		out.write_u64::<LittleEndian>(self.len() as u64)?;
		for b in self {
			b.encode(out)?;
		}
		Ok(())
	}

	fn decode(input: &mut Cursor<&[u8]>) -> Result<Self, CommError> {
		let n = get_index(input)?;
		let remaining = input.get_ref().len().saturating_sub(input.position() as usize);
		if n.checked_mul(BAT_RECORD_LEN).is_none_or(|need| need > remaining) {
			return Err(CommError::Codec(format!("partition of {} records exceeds {} bytes", n, remaining)));
		}
		(0..n).map(|_| Bat::decode(input)).collect()
	}
}

impl Wire for LoudnessSum {
	fn encode(&self, out: &mut Vec<u8>) -> Result<(), CommError> {
		out.write_u128::<LittleEndian>(self.total())?;
		out.write_u64::<LittleEndian>(self.count())?;
		Ok(())
	}

	fn decode(input: &mut Cursor<&[u8]>) -> Result<Self, CommError> {
		let total = input.read_u128::<LittleEndian>().map_err(truncated)?;
		let count = get_u64(input)?;
		Ok(LoudnessSum::from_parts(total, count))
	}
}

impl Wire for MaxLoc {
	fn encode(&self, out: &mut Vec<u8>) -> Result<(), CommError> {
		out.write_f64::<LittleEndian>(self.fitness)?;
		out.write_u64::<LittleEndian>(self.id as u64)?;
		out.write_u64::<LittleEndian>(self.rank as u64)?;
		self.loudness.encode(out)
	}

	fn decode(input: &mut Cursor<&[u8]>) -> Result<Self, CommError> {
		Ok(MaxLoc {
			fitness: get_f64(input)?,
			id: get_index(input)?,
			rank: get_index(input)?,
			loudness: LoudnessSum::decode(input)?,
		})
	}
}

impl<A: Wire, B: Wire> Wire for (A, B) {
	fn encode(&self, out: &mut Vec<u8>) -> Result<(), CommError> {
		self.0.encode(out)?;
		self.1.encode(out)
	}

	fn decode(input: &mut Cursor<&[u8]>) -> Result<Self, CommError> {
		let a = A::decode(input)?;
		let b = B::decode(input)?;
		Ok((a, b))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::BatParams;
	use crate::population::init_population;

	#[test]
	fn test_bat_record_is_exact() {
		let (mut bats, _) = init_population(3, 9, &BatParams::default()).unwrap();
		bats[1].rng.uniform01();
		bats[1].loudness = 0.97;
		let bytes = to_bytes(&bats[1]).unwrap();
		assert_eq!(bytes.len(), BAT_RECORD_LEN);
		let back: Bat = from_bytes(&bytes).unwrap();
		assert_eq!(back, bats[1]);
		assert_eq!(back.fitness.to_bits(), bats[1].fitness.to_bits());
	}

	#[test]
	fn test_partition_and_pair() {
		let (bats, best) = init_population(4, 2, &BatParams::default()).unwrap();
		let msg = (best.clone(), LoudnessSum::of(&bats));
		let back: (Bat, LoudnessSum) = from_bytes(&to_bytes(&msg).unwrap()).unwrap();
		assert_eq!(back, msg);
		let part: Vec<Bat> = from_bytes(&to_bytes(&bats).unwrap()).unwrap();
		assert_eq!(part, bats);
	}

	#[test]
	fn test_truncated_message() {
		let (bats, _) = init_population(2, 2, &BatParams::default()).unwrap();
		let bytes = to_bytes(&bats[0]).unwrap();
		let err = from_bytes::<Bat>(&bytes[..bytes.len() - 1]).unwrap_err();
		assert!(matches!(err, CommError::Codec(_)));
	}

	#[test]
	fn test_trailing_bytes_rejected() {
		let mut bytes = to_bytes(&LoudnessSum::from_parts(5, 1)).unwrap();
		bytes.push(0);
		assert!(matches!(from_bytes::<LoudnessSum>(&bytes), Err(CommError::Codec(_))));
	}

	#[test]
	fn test_oversized_partition_count() {
		let mut bytes = Vec::new();
		bytes.write_u64::<LittleEndian>(u64::MAX).unwrap();
		assert!(matches!(from_bytes::<Vec<Bat>>(&bytes), Err(CommError::Codec(_))));
	}
}
