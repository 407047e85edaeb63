//! Point-to-point byte transports between ranks
//!
//! Messages between a given pair of ranks are delivered in order. Both
//! transports block on `recv` until the message from the requested rank
//! arrives.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crossbeam::channel::{Receiver, Sender, unbounded};

use crate::error::CommError;

/// How long a rank keeps dialing or waiting for peers during mesh setup
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_RETRY: Duration = Duration::from_millis(50);

/// One rank's view of the job
pub trait Transport: Send {
	fn rank(&self) -> usize;
	fn size(&self) -> usize;
	fn send(&mut self, dest: usize, payload: &[u8]) -> Result<(), CommError>;
	fn recv(&mut self, src: usize) -> Result<Vec<u8>, CommError>;

	fn check_rank(&self, rank: usize) -> Result<(), CommError> {
		if rank >= self.size() {
			return Err(CommError::InvalidRank { rank, size: self.size() });
		}
		Ok(())
	}
}

/// In-process transport; every rank runs on its own thread
pub struct ChannelTransport {
	rank: usize,
	/// `outbox[d]` delivers to rank `d`
	outbox: Vec<Sender<Vec<u8>>>,
	/// `inbox[s]` receives from rank `s`
	inbox: Vec<Receiver<Vec<u8>>>,
}

impl ChannelTransport {
	/// Build a fully connected mesh of `size` ranks, one channel per ordered pair
	pub fn mesh(size: usize) -> Vec<ChannelTransport> {
		let mut senders: Vec<Vec<Sender<Vec<u8>>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
		let mut receivers: Vec<Vec<Receiver<Vec<u8>>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
		for src in 0..size {
			for dest in 0..size {
				let (tx, rx) = unbounded();
				senders[src].push(tx);
				receivers[dest].push(rx);
			}
		}
		senders
			.into_iter()
			.zip(receivers)
			.enumerate()
			.map(|(rank, (outbox, inbox))| ChannelTransport { rank, outbox, inbox })
			.collect()
	}
}

impl Transport for ChannelTransport {
	fn rank(&self) -> usize {
		self.rank
	}

	fn size(&self) -> usize {
		self.outbox.len()
	}

	fn send(&mut self, dest: usize, payload: &[u8]) -> Result<(), CommError> {
		self.check_rank(dest)?;
		self.outbox[dest].send(payload.to_vec()).map_err(|_| CommError::Disconnected { peer: dest })
	}

	fn recv(&mut self, src: usize) -> Result<Vec<u8>, CommError> {
		self.check_rank(src)?;
		self.inbox[src].recv().map_err(|_| CommError::Disconnected { peer: src })
	}
}

/// Multi-process transport over a full mesh of TCP connections
///
/// Frames are a little-endian `u32` length followed by the payload.
pub struct TcpTransport {
	rank: usize,
	size: usize,
	peers: Vec<Option<TcpStream>>,
	/// Messages sent to ourselves
	loopback: VecDeque<Vec<u8>>,
}

impl TcpTransport {
	/// Join the mesh as `rank`, given every rank's listening address
	///
	/// `listener` must already be bound to `peers[rank]`. Lower ranks are
	/// dialed, higher ranks are accepted; each new connection starts with the
	/// dialer's rank as a `u32`.
	pub fn connect(rank: usize, listener: TcpListener, peers: &[SocketAddr]) -> Result<Self, CommError> {
		Self::connect_with_timeout(rank, listener, peers, CONNECT_TIMEOUT)
	}

	pub fn connect_with_timeout(
		rank: usize,
		listener: TcpListener,
		peers: &[SocketAddr],
		timeout: Duration,
	) -> Result<Self, CommError> {
		let size = peers.len();
		if rank >= size {
			return Err(CommError::InvalidRank { rank, size });
		}
		let mut streams: Vec<Option<TcpStream>> = (0..size).map(|_| None).collect();

		for (peer, addr) in peers.iter().enumerate().take(rank) {
			let mut stream = dial(addr, timeout)?;
			stream.set_nodelay(true)?;
			stream.write_u32::<LittleEndian>(rank as u32)?;
			streams[peer] = Some(stream);
			log::debug!("rank {} connected to rank {} at {}", rank, peer, addr);
		}

		let deadline = Instant::now() + timeout;
		listener.set_nonblocking(true)?;
		for _ in rank + 1..size {
			let (mut stream, from) = accept_until(&listener, deadline, timeout)?;
			stream.set_nonblocking(false)?;
			stream.set_nodelay(true)?;
			stream.set_read_timeout(Some(timeout))?;
			let peer = stream.read_u32::<LittleEndian>()? as usize;
			stream.set_read_timeout(None)?;
			if peer <= rank || peer >= size || streams[peer].is_some() {
				return Err(CommError::Codec(format!("unexpected handshake from rank {} ({})", peer, from)));
			}
			streams[peer] = Some(stream);
			log::debug!("rank {} accepted rank {} from {}", rank, peer, from);
		}

		Ok(Self { rank, size, peers: streams, loopback: VecDeque::new() })
	}

	fn stream(&mut self, peer: usize) -> Result<&mut TcpStream, CommError> {
		self.peers[peer].as_mut().ok_or(CommError::Disconnected { peer })
	}
}

fn dial(addr: &SocketAddr, timeout: Duration) -> Result<TcpStream, CommError> {
	let deadline = Instant::now() + timeout;
	loop {
		match TcpStream::connect(addr) {
			Ok(s) => return Ok(s),
			Err(e) if Instant::now() < deadline => {
				log::trace!("waiting for {}: {}", addr, e);
				thread::sleep(CONNECT_RETRY);
			}
			Err(e) => return Err(e.into()),
		}
	}
}

fn accept_until(
	listener: &TcpListener,
	deadline: Instant,
	timeout: Duration,
) -> Result<(TcpStream, SocketAddr), CommError> {
	loop {
		match listener.accept() {
			Ok(conn) => return Ok(conn),
			Err(e) if e.kind() == ErrorKind::WouldBlock => {
				if Instant::now() >= deadline {
					return Err(CommError::SetupTimeout(timeout));
				}
				thread::sleep(CONNECT_RETRY);
			}
			Err(e) => return Err(e.into()),
		}
	}
}

/// Listening addresses of a `world`-rank job on `host`, rank `r` on `base_port + r`
pub fn peer_addresses(host: &str, base_port: u16, world: usize) -> Result<Vec<SocketAddr>, CommError> {
	(0..world)
		.map(|r| {
			let port = u16::try_from(r)
				.ok()
				.and_then(|r| base_port.checked_add(r))
				.ok_or(CommError::InvalidRank { rank: r, size: world })?;
			(host, port)
				.to_socket_addrs()?
				.next()
				.ok_or_else(|| CommError::Io(std::io::Error::new(ErrorKind::NotFound, format!("cannot resolve {}", host))))
		})
		.collect()
}

impl Transport for TcpTransport {
	fn rank(&self) -> usize {
		self.rank
	}

	fn size(&self) -> usize {
		self.size
	}

	fn send(&mut self, dest: usize, payload: &[u8]) -> Result<(), CommError> {
		self.check_rank(dest)?;
		if dest == self.rank {
			self.loopback.push_back(payload.to_vec());
			return Ok(());
		}
		let len = u32::try_from(payload.len())
			.map_err(|_| CommError::Codec(format!("frame of {} bytes too large", payload.len())))?;
		let mut frame = Vec::with_capacity(4 + payload.len());
		frame.write_u32::<LittleEndian>(len)?;
		frame.extend_from_slice(payload);
		self.stream(dest)?.write_all(&frame).map_err(|e| disconnected(e, dest))
	}

	fn recv(&mut self, src: usize) -> Result<Vec<u8>, CommError> {
		self.check_rank(src)?;
		if src == self.rank {
			return self.loopback.pop_front().ok_or(CommError::Disconnected { peer: src });
		}
		let stream = self.stream(src)?;
		let len = stream.read_u32::<LittleEndian>().map_err(|e| disconnected(e, src))? as usize;
		let mut buf = vec![0u8; len];
		stream.read_exact(&mut buf).map_err(|e| disconnected(e, src))?;
		Ok(buf)
	}
}

fn disconnected(e: std::io::Error, peer: usize) -> CommError {
	match e.kind() {
		ErrorKind::UnexpectedEof | ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
			CommError::Disconnected { peer }
		}
		_ => CommError::Io(e),
	}
}
