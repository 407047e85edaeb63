//! Message passing between the ranks of a distributed run
//!
//! - `transport`: point-to-point byte messages (in-process channels or TCP)
//! - `codec`: little-endian wire format
//! - `collective`: broadcast, reduce, all-reduce, scatter and gather

pub mod codec;
pub mod collective;
pub mod transport;

pub use codec::Wire;
pub use collective::{MaxLoc, all_reduce, broadcast, broadcast_value, gather, reduce, scatter};
pub use transport::{ChannelTransport, TcpTransport, Transport, peer_addresses};
