// SPDX-License-Identifier: Apache-2.0

//! The buffered writing layer.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use crate::byte_str::ByteString;
use crate::streams::{RawReader, RawWriter};
use crate::{Buffer, Error, Result, SEGMENT_SIZE};

macro_rules! forward_int_writes {
	($($name:ident $le_name:ident -> $ty:ident,)+) => {$(
		#[doc = concat!("Writes one big-endian [`", stringify!($ty), "`].")]
		pub fn $name(&mut self, value: $ty) -> Result {
			self.check_open()?;
			self.buffer.$name(value);
			self.emit_complete_segments()
		}

		#[doc = concat!("Writes one little-endian [`", stringify!($ty), "`].")]
		pub fn $le_name(&mut self, value: $ty) -> Result {
			self.check_open()?;
			self.buffer.$le_name(value);
			self.emit_complete_segments()
		}
	)+}
}

/// A buffered layer over a [`RawWriter`], adding typed encoding.
///
/// Writes accumulate in an internal buffer; filled segments are emitted to
/// the underlying writer automatically, so the buffer stays within one
/// segment of data. [`flush`](Self::flush) pushes everything through.
/// Closing flushes first and surfaces a flush failure only after the
/// underlying writer has had its chance to close.
pub struct Writer<W: RawWriter> {
	buffer: Buffer,
	inner: W,
	closed: bool,
}

impl<W: RawWriter> Writer<W> {
	pub fn new(inner: W) -> Self {
		Self {
			buffer: Buffer::new(),
			inner,
			closed: false,
		}
	}

	/// Returns the bytes accepted but not yet emitted.
	pub fn buffer(&self) -> &Buffer { &self.buffer }

	pub fn get_ref(&self) -> &W { &self.inner }

	pub fn get_mut(&mut self) -> &mut W { &mut self.inner }

	fn check_open(&self) -> Result {
		if self.closed { Err(Error::Closed) } else { Ok(()) }
	}

	/// Writes one byte.
	pub fn write_u8(&mut self, value: u8) -> Result {
		self.check_open()?;
		self.buffer.write_u8(value);
		self.emit_complete_segments()
	}

	/// Writes one byte, reinterpreted from signed.
	pub fn write_i8(&mut self, value: i8) -> Result {
		self.write_u8(value as u8)
	}

	forward_int_writes! {
		write_u16 write_u16_le -> u16,
		write_i16 write_i16_le -> i16,
		write_u32 write_u32_le -> u32,
		write_i32 write_i32_le -> i32,
		write_u64 write_u64_le -> u64,
		write_i64 write_i64_le -> i64,
	}

	/// Writes the decimal digits of `value`.
	pub fn write_decimal_i64(&mut self, value: i64) -> Result {
		self.check_open()?;
		self.buffer.write_decimal_i64(value);
		self.emit_complete_segments()
	}

	/// Writes the lowercase hexadecimal digits of `value`.
	pub fn write_hex_u64(&mut self, value: u64) -> Result {
		self.check_open()?;
		self.buffer.write_hex_u64(value);
		self.emit_complete_segments()
	}

	/// Writes the entire slice.
	pub fn write_from_slice(&mut self, bytes: &[u8]) -> Result {
		self.check_open()?;
		self.buffer.write_from_slice(bytes);
		self.emit_complete_segments()
	}

	/// Writes the UTF-8 bytes of `text`.
	pub fn write_utf8(&mut self, text: &str) -> Result {
		self.write_from_slice(text.as_bytes())
	}

	/// Writes one code point as UTF-8, with the same replacement policy as
	/// [`Buffer::write_utf8_code_point`].
	pub fn write_utf8_code_point(&mut self, code_point: u32) -> Result {
		self.check_open()?;
		self.buffer.write_utf8_code_point(code_point);
		self.emit_complete_segments()
	}

	/// Writes UTF-16 code units as UTF-8, with the same replacement policy
	/// as [`Buffer::write_utf16`].
	pub fn write_utf16(&mut self, units: &[u16]) -> Result {
		self.check_open()?;
		self.buffer.write_utf16(units);
		self.emit_complete_segments()
	}

	/// Writes the contents of a byte string.
	pub fn write_byte_string(&mut self, value: &ByteString) -> Result {
		self.check_open()?;
		self.buffer.write_byte_string(value);
		self.emit_complete_segments()
	}

	/// Emits everything buffered to the underlying writer, without flushing
	/// it.
	pub fn emit(&mut self) -> Result {
		self.check_open()?;
		let byte_count = self.buffer.size();
		if byte_count > 0 {
			self.inner.write(&mut self.buffer, byte_count)?;
		}
		Ok(())
	}

	/// Emits only segments that can no longer grow, keeping a partial tail
	/// buffered.
	pub fn emit_complete_segments(&mut self) -> Result {
		self.check_open()?;
		let byte_count = self.buffer.complete_segment_bytes();
		if byte_count > 0 {
			self.inner.write(&mut self.buffer, byte_count)?;
		}
		Ok(())
	}

	/// Emits everything buffered and flushes the underlying writer.
	pub fn flush(&mut self) -> Result {
		self.emit()?;
		self.inner.flush()
	}

	/// Reads `source` until exhaustion, emitting as segments fill. Returns
	/// the number of bytes moved.
	pub fn write_all_from(&mut self, source: &mut impl RawReader) -> Result<usize> {
		self.check_open()?;
		let mut total = 0;
		while let Some(n) = source.read_at_most_to(&mut self.buffer, SEGMENT_SIZE)? {
			total += n;
			self.emit_complete_segments()?;
		}
		Ok(total)
	}

	/// Flushes, then closes the underlying writer. A flush failure is
	/// surfaced only after the close has been attempted. Idempotent.
	pub fn close(&mut self) -> Result {
		if self.closed {
			return Ok(());
		}
		self.closed = true;
		let flushed = (|| {
			let byte_count = self.buffer.size();
			if byte_count > 0 {
				self.inner.write(&mut self.buffer, byte_count)?;
			}
			self.inner.flush()
		})();
		let closed = self.inner.close();
		self.buffer.clear();
		flushed?;
		closed
	}
}

impl<W: RawWriter> RawWriter for Writer<W> {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		self.check_open()?;
		self.buffer.write(source, byte_count)?;
		self.emit_complete_segments()
	}

	fn flush(&mut self) -> Result {
		Writer::flush(self)
	}

	fn close(&mut self) -> Result {
		Writer::close(self)
	}
}

impl<W: RawWriter> io::Write for Writer<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.write_from_slice(buf)?;
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Writer::flush(self)?;
		Ok(())
	}
}

impl<W: RawWriter> Drop for Writer<W> {
	fn drop(&mut self) {
		let _ = self.close();
	}
}

enum Command {
	Write(Buffer),
	Flush(SyncSender<()>),
}

/// A [`RawWriter`] that hands transfers to a dedicated worker thread over a
/// queue, so the writing thread never blocks on the underlying writer.
///
/// The worker's first error is kept and surfaced on a later call.
/// [`flush`](RawWriter::flush) blocks until the worker has drained;
/// [`close`](RawWriter::close) drains, closes the underlying writer, and
/// joins the worker.
pub struct AsyncWriter {
	commands: Option<Sender<Command>>,
	worker: Option<JoinHandle<()>>,
	error: Arc<Mutex<Option<Error>>>,
}

impl AsyncWriter {
	pub fn new<W: RawWriter + Send + 'static>(inner: W) -> Self {
		let (commands, queue) = mpsc::channel();
		let error = Arc::new(Mutex::new(None));
		let slot = Arc::clone(&error);
		let worker = thread::Builder::new()
			.name("jayo-async-writer".into())
			.spawn(move || worker_loop(inner, queue, slot))
			.expect("failed to spawn the async writer thread");
		Self {
			commands: Some(commands),
			worker: Some(worker),
			error,
		}
	}

	fn take_error(&self) -> Result {
		let held = self.error
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		match held {
			Some(error) => Err(error),
			None => Ok(()),
		}
	}
}

fn worker_loop<W: RawWriter>(
	mut inner: W,
	queue: Receiver<Command>,
	error: Arc<Mutex<Option<Error>>>,
) {
	let mut store = |failure: Error| {
		log::debug!("async writer: {failure}");
		let mut slot = error.lock().unwrap_or_else(PoisonError::into_inner);
		slot.get_or_insert(failure);
	};
	for command in queue {
		match command {
			Command::Write(mut chunk) => {
				let byte_count = chunk.size();
				if let Err(failure) = inner.write(&mut chunk, byte_count) {
					store(failure);
				}
			}
			Command::Flush(done) => {
				if let Err(failure) = inner.flush() {
					store(failure);
				}
				let _ = done.send(());
			}
		}
	}
	if let Err(failure) = inner.close() {
		store(failure);
	}
}

impl RawWriter for AsyncWriter {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		self.take_error()?;
		let Some(commands) = &self.commands else {
			return Err(Error::Closed);
		};
		let mut chunk = Buffer::new();
		chunk.write(source, byte_count)?;
		commands.send(Command::Write(chunk)).map_err(|_| Error::Closed)?;
		Ok(())
	}

	fn flush(&mut self) -> Result {
		self.take_error()?;
		let Some(commands) = &self.commands else {
			return Err(Error::Closed);
		};
		let (done, drained) = mpsc::sync_channel(0);
		commands.send(Command::Flush(done)).map_err(|_| Error::Closed)?;
		// A dropped sender means the worker died; the error slot explains.
		let _ = drained.recv();
		self.take_error()
	}

	fn close(&mut self) -> Result {
		if self.commands.is_none() && self.worker.is_none() {
			return Ok(());
		}
		drop(self.commands.take());
		if let Some(worker) = self.worker.take() {
			let _ = worker.join();
		}
		self.take_error()
	}
}

impl Drop for AsyncWriter {
	fn drop(&mut self) {
		let _ = RawWriter::close(self);
	}
}
