// SPDX-License-Identifier: Apache-2.0

//! Byte stream contracts.
//!
//! [`RawReader`] and [`RawWriter`] move bytes at segment granularity between
//! a [`Buffer`] and some producer or consumer: another buffer, a host stream,
//! a socket, a pipe. The buffered [`Reader`] and [`Writer`] layers wrap them
//! with typed decoding and encoding. Implementations that may block consult
//! the ambient cancel scope (see [`cancel`](crate::cancel)) on entry.

use crate::{Buffer, Reader, Result, Writer};

/// A producer of bytes.
pub trait RawReader {
	/// Reads up to `byte_count` bytes, appending them to `sink`, and returns
	/// the number read, or `None` once the stream is exhausted. Returns
	/// `Some(0)` only when `byte_count` is zero. May block until at least one
	/// byte is available.
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>>;

	/// Closes the stream and releases its resources. Closing is idempotent.
	fn close(&mut self) -> Result { Ok(()) }
}

/// A consumer of bytes.
pub trait RawWriter {
	/// Removes exactly `byte_count` bytes from the head of `source`,
	/// blocking until every byte is accepted.
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result;

	/// Pushes accepted bytes toward their final destination, best-effort.
	fn flush(&mut self) -> Result { Ok(()) }

	/// Flushes where state permits, then closes the stream. Idempotent.
	fn close(&mut self) -> Result { Ok(()) }
}

impl<R: RawReader + ?Sized> RawReader for &mut R {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>> {
		(**self).read_at_most_to(sink, byte_count)
	}

	fn close(&mut self) -> Result {
		(**self).close()
	}
}

impl<W: RawWriter + ?Sized> RawWriter for &mut W {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		(**self).write(source, byte_count)
	}

	fn flush(&mut self) -> Result {
		(**self).flush()
	}

	fn close(&mut self) -> Result {
		(**self).close()
	}
}

/// Returns a writer that discards everything written to it.
pub fn void_writer() -> VoidWriter { VoidWriter }

/// Returns a reader that is exhausted from the start.
pub fn void_reader() -> VoidReader { VoidReader }

/// A [`RawWriter`] that discards everything written to it.
#[derive(Copy, Clone, Debug, Default)]
pub struct VoidWriter;

impl RawWriter for VoidWriter {
	/// Skips `byte_count` bytes of `source`.
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		source.skip(byte_count)
	}
}

/// A [`RawReader`] that produces no data.
#[derive(Copy, Clone, Debug, Default)]
pub struct VoidReader;

impl RawReader for VoidReader {
	fn read_at_most_to(&mut self, _sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>> {
		Ok((byte_count == 0).then_some(0))
	}
}

/// Wraps any [`RawReader`] in a buffered [`Reader`].
pub trait BufferedReaderExt: RawReader + Sized {
	fn buffered(self) -> Reader<Self> {
		Reader::new(self)
	}
}

impl<R: RawReader> BufferedReaderExt for R {}

/// Wraps any [`RawWriter`] in a buffered [`Writer`].
pub trait BufferedWriterExt: RawWriter + Sized {
	fn buffered(self) -> Writer<Self> {
		Writer::new(self)
	}
}

impl<W: RawWriter> BufferedWriterExt for W {}
