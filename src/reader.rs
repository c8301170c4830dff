// SPDX-License-Identifier: Apache-2.0

//! The buffered reading layer.

use std::io;
use std::mem;
use crate::byte_str::ByteString;
use crate::streams::{RawReader, RawWriter};
use crate::util::utf8::utf8_char_width;
use crate::{Buffer, Error, Result, SEGMENT_SIZE};

macro_rules! forward_int_reads {
	($($name:ident $le_name:ident -> $ty:ident,)+) => {$(
		#[doc = concat!("Reads one big-endian [`", stringify!($ty), "`].")]
		pub fn $name(&mut self) -> Result<$ty> {
			self.require(mem::size_of::<$ty>())?;
			self.buffer.$name()
		}

		#[doc = concat!("Reads one little-endian [`", stringify!($ty), "`].")]
		pub fn $le_name(&mut self) -> Result<$ty> {
			self.require(mem::size_of::<$ty>())?;
			self.buffer.$le_name()
		}
	)+}
}

/// A buffered layer over a [`RawReader`], adding typed decoding.
///
/// Refills pull whole segments from the underlying reader; reads consume the
/// internal buffer. A reader is open until [`close`](Self::close); reads on
/// a closed reader fail with [`Error::Closed`], while an I/O error leaves it
/// open.
pub struct Reader<R: RawReader> {
	buffer: Buffer,
	inner: R,
	closed: bool,
}

impl<R: RawReader> Reader<R> {
	pub fn new(inner: R) -> Self {
		Self {
			buffer: Buffer::new(),
			inner,
			closed: false,
		}
	}

	/// Returns the bytes buffered but not yet consumed.
	pub fn buffer(&self) -> &Buffer { &self.buffer }

	pub fn get_ref(&self) -> &R { &self.inner }

	pub fn get_mut(&mut self) -> &mut R { &mut self.inner }

	fn check_open(&self) -> Result {
		if self.closed { Err(Error::Closed) } else { Ok(()) }
	}

	/// Pulls one segment-granular batch from the underlying reader,
	/// returning `false` at end of stream.
	fn refill(&mut self) -> Result<bool> {
		Ok(self.inner.read_at_most_to(&mut self.buffer, SEGMENT_SIZE)?.is_some())
	}

	/// Returns `true` once the buffer is empty and the underlying reader is
	/// exhausted.
	pub fn exhausted(&mut self) -> Result<bool> {
		Ok(!self.request(1)?)
	}

	/// Buffers at least `byte_count` bytes, returning `false` when the
	/// stream ends first.
	pub fn request(&mut self, byte_count: usize) -> Result<bool> {
		self.check_open()?;
		while self.buffer.size() < byte_count {
			if !self.refill()? {
				return Ok(false);
			}
		}
		Ok(true)
	}

	/// Buffers at least `byte_count` bytes, failing with `EndOfInput` when
	/// the stream ends first.
	pub fn require(&mut self, byte_count: usize) -> Result {
		if self.request(byte_count)? {
			Ok(())
		} else {
			Err(Error::EndOfInput)
		}
	}

	/// Reads one byte.
	pub fn read_u8(&mut self) -> Result<u8> {
		self.require(1)?;
		self.buffer.read_u8()
	}

	/// Reads one byte, reinterpreted as signed.
	pub fn read_i8(&mut self) -> Result<i8> {
		self.require(1)?;
		self.buffer.read_i8()
	}

	forward_int_reads! {
		read_u16 read_u16_le -> u16,
		read_i16 read_i16_le -> i16,
		read_u32 read_u32_le -> u32,
		read_i32 read_i32_le -> i32,
		read_u64 read_u64_le -> u64,
		read_i64 read_i64_le -> i64,
	}

	/// Reads a signed decimal number, stopping at the first non-digit.
	pub fn read_decimal_i64(&mut self) -> Result<i64> {
		self.require(1)?;
		// Buffer the full run of digits first. Twenty digits and a sign
		// already overflow an i64, so stop pulling there and let the decode
		// report it.
		let mut scanned = 0;
		while scanned < 21 && self.request(scanned + 1)? {
			let byte = self.buffer.get(scanned)
				.expect("requested bytes should be buffered");
			let accepted = byte.is_ascii_digit() || (scanned == 0 && byte == b'-');
			if !accepted { break }
			scanned += 1;
		}
		self.buffer.read_decimal_i64()
	}

	/// Reads an unsigned hexadecimal number, stopping at the first non-digit.
	pub fn read_hex_u64(&mut self) -> Result<u64> {
		self.require(1)?;
		let mut scanned = 0;
		while scanned < 17 && self.request(scanned + 1)? {
			let byte = self.buffer.get(scanned)
				.expect("requested bytes should be buffered");
			if !byte.is_ascii_hexdigit() { break }
			scanned += 1;
		}
		self.buffer.read_hex_u64()
	}

	/// Reads exactly `byte_count` bytes as a byte string.
	pub fn read_byte_str(&mut self, byte_count: usize) -> Result<ByteString> {
		self.require(byte_count)?;
		self.buffer.read_byte_str(byte_count)
	}

	/// Reads everything until end of stream as a byte string.
	pub fn read_byte_str_to_end(&mut self) -> Result<ByteString> {
		self.check_open()?;
		while self.refill()? {}
		self.buffer.read_byte_str_to_end()
	}

	/// Reads exactly `byte_count` bytes as UTF-8 text, with malformed
	/// sequences replaced by U+FFFD.
	pub fn read_utf8(&mut self, byte_count: usize) -> Result<String> {
		self.require(byte_count)?;
		self.buffer.read_utf8(byte_count)
	}

	/// Reads everything until end of stream as UTF-8 text.
	pub fn read_utf8_to_end(&mut self) -> Result<String> {
		self.check_open()?;
		while self.refill()? {}
		self.buffer.read_utf8_to_end()
	}

	/// Reads one code point, with the same replacement policy as
	/// [`Buffer::read_utf8_code_point`].
	pub fn read_utf8_code_point(&mut self) -> Result<char> {
		self.require(1)?;
		let width = utf8_char_width(
			self.buffer.get(0).expect("one byte was required"),
		);
		if width > 1 {
			// Best effort; a truncated stream decodes to a replacement.
			let _ = self.request(width)?;
		}
		self.buffer.read_utf8_code_point()
	}

	/// Reads a line up to the next `\n` or `\r\n`, consuming the delimiter.
	/// At end of stream, returns what remains, or `None` when nothing does.
	pub fn read_utf8_line(&mut self) -> Result<Option<String>> {
		match self.index_of(b'\n', 0, usize::MAX)? {
			Some(newline) => self.buffer.read_line_at(newline).map(Some),
			None if self.buffer.is_empty() => Ok(None),
			None => self.buffer.read_utf8_to_end().map(Some),
		}
	}

	/// Like [`read_utf8_line`](Self::read_utf8_line), but fails with
	/// `EndOfInput` when the stream ends, or `limit` bytes are scanned,
	/// without a delimiter. A `\r\n` straddling the limit still counts.
	pub fn read_utf8_line_strict(&mut self, limit: usize) -> Result<String> {
		let scan = limit.saturating_add(1);
		if let Some(newline) = self.index_of(b'\n', 0, scan)? {
			return self.buffer.read_line_at(newline);
		}
		if scan < usize::MAX
			&& self.request(scan.saturating_add(1))?
			&& self.buffer.get(scan - 1) == Some(b'\r')
			&& self.buffer.get(scan) == Some(b'\n')
		{
			return self.buffer.read_line_at(scan);
		}
		Err(Error::EndOfInput)
	}

	/// Reads bytes into `dst`, returning the number read: zero only at end
	/// of stream (or for an empty slice).
	pub fn read_into_slice(&mut self, dst: &mut [u8]) -> Result<usize> {
		self.check_open()?;
		if self.buffer.is_empty() && !self.refill()? {
			return Ok(0);
		}
		Ok(self.buffer.read_into_slice(dst))
	}

	/// Fills `dst` completely, failing with `EndOfInput` without consuming
	/// anything when the stream is too short.
	pub fn read_into_slice_exact(&mut self, dst: &mut [u8]) -> Result {
		self.require(dst.len())?;
		self.buffer.read_into_slice_exact(dst)
	}

	pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		self.require(N)?;
		self.buffer.read_array()
	}

	/// Drains the stream into `dst`, returning the number of bytes moved.
	pub fn read_all(&mut self, dst: &mut impl RawWriter) -> Result<usize> {
		self.check_open()?;
		let mut total = 0;
		loop {
			if self.buffer.is_empty() && !self.refill()? {
				break;
			}
			let byte_count = self.buffer.size();
			dst.write(&mut self.buffer, byte_count)?;
			total += byte_count;
		}
		Ok(total)
	}

	/// Discards exactly `byte_count` bytes, reading as needed; fails with
	/// `EndOfInput` when the stream is too short.
	pub fn skip(&mut self, mut byte_count: usize) -> Result {
		self.check_open()?;
		while byte_count > 0 {
			if self.buffer.is_empty() && !self.refill()? {
				return Err(Error::EndOfInput);
			}
			let n = byte_count.min(self.buffer.size());
			self.buffer.skip(n)?;
			byte_count -= n;
		}
		Ok(())
	}

	/// Returns the index of the first `byte` in `[from, to)`, reading more
	/// data as needed. `None` when the stream ends, or `to` is reached,
	/// first. Found or not, the scanned bytes stay buffered.
	pub fn index_of(&mut self, byte: u8, from: usize, to: usize) -> Result<Option<usize>> {
		self.check_open()?;
		let mut search_from = from;
		loop {
			let buffered = self.buffer.size();
			if let Some(found) = self.buffer.index_of(byte, search_from, to) {
				return Ok(Some(found));
			}
			if buffered >= to || !self.refill()? {
				return Ok(None);
			}
			search_from = search_from.max(buffered);
		}
	}

	/// Returns the index of the first occurrence of `needle` at or after
	/// `from`, reading more data as needed.
	pub fn index_of_slice(&mut self, needle: &[u8], from: usize) -> Result<Option<usize>> {
		self.check_open()?;
		if needle.is_empty() {
			return Ok(Some(from));
		}
		let mut search_from = from;
		loop {
			let buffered = self.buffer.size();
			if let Some(found) = self.buffer.index_of_slice(needle, search_from) {
				return Ok(Some(found));
			}
			if !self.refill()? {
				return Ok(None);
			}
			// A match may straddle the old boundary; back up by a needle.
			search_from = search_from.max(
				buffered.saturating_sub(needle.len() - 1),
			);
		}
	}

	/// Returns a reader over the upcoming bytes without consuming them. The
	/// peek aliases the buffered data and pulls more from the underlying
	/// stream as needed; closing it is a no-op, and this reader resumes from
	/// its current position.
	pub fn peek(&mut self) -> Reader<Peek<'_, R>> {
		Reader::new(Peek { reader: self, offset: 0 })
	}

	/// Closes the underlying reader and discards buffered bytes. Idempotent.
	pub fn close(&mut self) -> Result {
		if self.closed {
			return Ok(());
		}
		self.closed = true;
		self.buffer.clear();
		self.inner.close()
	}
}

impl<R: RawReader> RawReader for Reader<R> {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>> {
		self.check_open()?;
		if byte_count == 0 {
			return Ok(Some(0));
		}
		if self.buffer.is_empty() && !self.refill()? {
			return Ok(None);
		}
		let n = byte_count.min(self.buffer.size());
		sink.write(&mut self.buffer, n)?;
		Ok(Some(n))
	}

	fn close(&mut self) -> Result {
		Reader::close(self)
	}
}

impl<R: RawReader> io::Read for Reader<R> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if buf.is_empty() {
			return Ok(0);
		}
		self.check_open()?;
		if self.buffer.is_empty() && !self.refill()? {
			return Ok(0);
		}
		Ok(self.buffer.read_into_slice(buf))
	}
}

impl<R: RawReader> io::BufRead for Reader<R> {
	fn fill_buf(&mut self) -> io::Result<&[u8]> {
		self.check_open()?;
		if self.buffer.is_empty() {
			self.refill()?;
		}
		Ok(self.buffer.head_slice())
	}

	fn consume(&mut self, amt: usize) {
		let _ = self.buffer.skip(amt);
	}
}

impl<R: RawReader> Drop for Reader<R> {
	fn drop(&mut self) {
		let _ = self.close();
	}
}

/// A view over the bytes a [`Reader`] has not yet consumed. Reading copies
/// ahead of the parent reader's position by aliasing its buffered segments.
pub struct Peek<'a, R: RawReader> {
	reader: &'a mut Reader<R>,
	offset: usize,
}

impl<R: RawReader> RawReader for Peek<'_, R> {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>> {
		if byte_count == 0 {
			return Ok(Some(0));
		}
		if self.offset == self.reader.buffer.size() && !self.reader.refill()? {
			return Ok(None);
		}
		let n = byte_count.min(self.reader.buffer.size() - self.offset);
		self.reader.buffer.copy_to(sink, self.offset, n)?;
		self.offset += n;
		Ok(Some(n))
	}

	// Closing a peek leaves the underlying reader untouched.
	fn close(&mut self) -> Result { Ok(()) }
}
