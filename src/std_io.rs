// SPDX-License-Identifier: Apache-2.0

//! Interop with host byte streams and sockets.

use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use crate::cancel::{self, AsyncCloseable};
use crate::streams::{RawReader, RawWriter};
use crate::{Buffer, Error, Result};

/// Adapts any [`io::Read`] into a [`RawReader`]. End of stream maps to
/// `None`; host errors are wrapped.
pub struct IoReader<R: io::Read> {
	inner: R,
	closed: bool,
}

impl<R: io::Read> IoReader<R> {
	pub fn new(inner: R) -> Self {
		Self { inner, closed: false }
	}

	pub fn get_ref(&self) -> &R { &self.inner }

	pub fn into_inner(self) -> R { self.inner }
}

impl<R: io::Read> RawReader for IoReader<R> {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>> {
		if self.closed { return Err(Error::Closed) }
		cancel::check()?;
		if byte_count == 0 { return Ok(Some(0)) }
		let n = sink.fill_from(&mut self.inner, byte_count)?;
		Ok(if n == 0 { None } else { Some(n) })
	}

	fn close(&mut self) -> Result {
		self.closed = true;
		Ok(())
	}
}

/// Adapts any [`io::Write`] into a [`RawWriter`].
pub struct IoWriter<W: io::Write> {
	inner: W,
	closed: bool,
}

impl<W: io::Write> IoWriter<W> {
	pub fn new(inner: W) -> Self {
		Self { inner, closed: false }
	}

	pub fn get_ref(&self) -> &W { &self.inner }

	pub fn into_inner(self) -> W { self.inner }
}

impl<W: io::Write> RawWriter for IoWriter<W> {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		if self.closed { return Err(Error::Closed) }
		cancel::check()?;
		if byte_count > source.size() {
			return Err(Error::illegal(format!(
				"cannot write {byte_count} bytes out of a {}-byte buffer",
				source.size(),
			)));
		}
		source.drain_to(&mut self.inner, byte_count)?;
		Ok(())
	}

	fn flush(&mut self) -> Result {
		if self.closed { return Err(Error::Closed) }
		self.inner.flush()?;
		Ok(())
	}

	fn close(&mut self) -> Result {
		if self.closed { return Ok(()) }
		self.closed = true;
		self.inner.flush()?;
		Ok(())
	}
}

impl AsyncCloseable for TcpStream {
	fn close_abruptly(&self) {
		let _ = self.shutdown(Shutdown::Both);
	}
}

/// Splits a TCP stream into reader and writer halves. While either half is
/// blocked inside a call, it is registered with the ambient cancel scope's
/// watchdog, which shuts the socket down when the deadline elapses or the
/// scope is cancelled.
pub fn socket_streams(stream: TcpStream) -> (SocketReader, SocketWriter) {
	let stream = Arc::new(stream);
	(
		SocketReader { stream: Arc::clone(&stream), closed: false },
		SocketWriter { stream, closed: false },
	)
}

/// The reading half of a TCP stream.
pub struct SocketReader {
	stream: Arc<TcpStream>,
	closed: bool,
}

impl RawReader for SocketReader {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>> {
		if self.closed { return Err(Error::Closed) }
		if byte_count == 0 { return Ok(Some(0)) }
		let resource: Arc<dyn AsyncCloseable> = self.stream.clone();
		cancel::guard(resource, || {
			let mut stream = &*self.stream;
			let n = sink.fill_from(&mut stream, byte_count)?;
			if n == 0 {
				// A watchdog shutdown surfaces as EOF on the blocked read;
				// report the deadline or cancel instead of a clean end.
				cancel::check()?;
				return Ok(None);
			}
			Ok(Some(n))
		})
	}

	fn close(&mut self) -> Result {
		if !self.closed {
			self.closed = true;
			let _ = self.stream.shutdown(Shutdown::Read);
		}
		Ok(())
	}
}

/// The writing half of a TCP stream.
pub struct SocketWriter {
	stream: Arc<TcpStream>,
	closed: bool,
}

impl RawWriter for SocketWriter {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		if self.closed { return Err(Error::Closed) }
		if byte_count > source.size() {
			return Err(Error::illegal(format!(
				"cannot write {byte_count} bytes out of a {}-byte buffer",
				source.size(),
			)));
		}
		let resource: Arc<dyn AsyncCloseable> = self.stream.clone();
		cancel::guard(resource, || {
			let mut stream = &*self.stream;
			source.drain_to(&mut stream, byte_count)?;
			Ok(())
		})
	}

	fn close(&mut self) -> Result {
		if !self.closed {
			self.closed = true;
			let _ = self.stream.shutdown(Shutdown::Write);
		}
		Ok(())
	}
}
