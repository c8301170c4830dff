// SPDX-License-Identifier: Apache-2.0

use crate::byte_str::ByteString;
use crate::streams::RawReader;
use crate::util::utf8::{utf8_char_width, REPLACEMENT};
use crate::{Buffer, Error, Result};

macro_rules! int_reads {
	($($name:ident $le_name:ident -> $ty:ident,)+) => {$(
		#[doc = concat!("Removes one big-endian [`", stringify!($ty), "`] from the head.")]
		pub fn $name(&mut self) -> Result<$ty> {
			Ok(<$ty>::from_be_bytes(self.read_array()?))
		}

		#[doc = concat!("Removes one little-endian [`", stringify!($ty), "`] from the head.")]
		pub fn $le_name(&mut self) -> Result<$ty> {
			Ok(<$ty>::from_le_bytes(self.read_array()?))
		}
	)+}
}

impl Buffer {
	/// Fails with `EndOfInput` unless `byte_count` bytes are readable.
	pub(crate) fn require(&self, byte_count: usize) -> Result {
		if self.size() < byte_count {
			Err(Error::EndOfInput)
		} else {
			Ok(())
		}
	}

	/// Removes one byte from the head.
	pub fn read_u8(&mut self) -> Result<u8> {
		self.require(1)?;
		let byte = {
			let head = self.segments.front_mut()
				.expect("required bytes should be buffered");
			head.pop().expect("required bytes should be buffered")
		};
		self.size -= 1;
		self.tidy_head();
		Ok(byte)
	}

	/// Removes one byte from the head, reinterpreted as signed.
	pub fn read_i8(&mut self) -> Result<i8> {
		self.read_u8().map(|n| n as i8)
	}

	int_reads! {
		read_u16 read_u16_le -> u16,
		read_i16 read_i16_le -> i16,
		read_u32 read_u32_le -> u32,
		read_i32 read_i32_le -> i32,
		read_u64 read_u64_le -> u64,
		read_i64 read_i64_le -> i64,
	}

	pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		self.require(N)?;
		let mut array = [0; N];
		self.read_into_slice(&mut array);
		Ok(array)
	}

	/// Removes bytes into `dst`, returning the number copied: the slice
	/// length, or everything buffered, whichever is smaller.
	pub fn read_into_slice(&mut self, dst: &mut [u8]) -> usize {
		let mut copied = 0;
		while copied < dst.len() {
			let n = {
				let Some(head) = self.segments.front_mut() else { break };
				head.pop_into_slice(&mut dst[copied..])
			};
			self.size -= n;
			copied += n;
			self.tidy_head();
		}
		copied
	}

	/// Removes exactly `dst.len()` bytes into `dst`, or fails with
	/// `EndOfInput` consuming nothing.
	pub fn read_into_slice_exact(&mut self, dst: &mut [u8]) -> Result {
		self.require(dst.len())?;
		let copied = self.read_into_slice(dst);
		debug_assert_eq!(copied, dst.len());
		Ok(())
	}

	/// Removes `byte_count` bytes as an immutable byte string.
	pub fn read_byte_str(&mut self, byte_count: usize) -> Result<ByteString> {
		self.require(byte_count)?;
		let mut bytes = vec![0; byte_count];
		self.read_into_slice_exact(&mut bytes)?;
		Ok(bytes.into())
	}

	/// Removes everything buffered as an immutable byte string.
	pub fn read_byte_str_to_end(&mut self) -> Result<ByteString> {
		let byte_count = self.size();
		self.read_byte_str(byte_count)
	}

	/// Reads a signed decimal number from the head: an optional `-` followed
	/// by one or more digits, stopping at the first non-digit. Fails with a
	/// protocol error when no digit is present or the value overflows an
	/// `i64`; nothing is consumed on failure.
	pub fn read_decimal_i64(&mut self) -> Result<i64> {
		const OVERFLOW_ZONE: i64 = i64::MIN / 10;

		self.require(1)?;
		let negative = self.get(0) == Some(b'-');
		let start = usize::from(negative);

		// Accumulate in negative space; i64::MIN has no positive counterpart.
		let mut value: i64 = 0;
		let mut digits = 0;
		while let Some(byte) = self.get(start + digits) {
			if !byte.is_ascii_digit() { break }
			let digit = (byte - b'0') as i64;
			if value < OVERFLOW_ZONE || value * 10 < i64::MIN + digit {
				return Err(Error::protocol("decimal number too large"));
			}
			value = value * 10 - digit;
			digits += 1;
		}
		if digits == 0 {
			return Err(Error::protocol(match self.get(start) {
				Some(byte) => format!("expected a digit, found {byte:#04x}"),
				None => "expected a digit, found end of buffer".to_owned(),
			}));
		}
		if !negative && value == i64::MIN {
			return Err(Error::protocol("decimal number too large"));
		}
		self.skip(start + digits)?;
		Ok(if negative { value } else { -value })
	}

	/// Reads an unsigned hexadecimal number from the head, accepting either
	/// case and stopping at the first non-digit. Fails with a protocol error
	/// when no digit is present or the value overflows a `u64`; nothing is
	/// consumed on failure.
	pub fn read_hex_u64(&mut self) -> Result<u64> {
		self.require(1)?;
		let mut value: u64 = 0;
		let mut digits = 0;
		while let Some(byte) = self.get(digits) {
			let digit = match byte {
				b'0'..=b'9' => byte - b'0',
				b'a'..=b'f' => byte - b'a' + 10,
				b'A'..=b'F' => byte - b'A' + 10,
				_ => break,
			};
			if value & 0xF000_0000_0000_0000 != 0 {
				return Err(Error::protocol("hexadecimal number too large"));
			}
			value = (value << 4) | u64::from(digit);
			digits += 1;
		}
		if digits == 0 {
			let byte = self.get(0).expect("at least one byte was required");
			return Err(Error::protocol(format!(
				"expected a hexadecimal digit, found {byte:#04x}",
			)));
		}
		self.skip(digits)?;
		Ok(value)
	}

	/// Removes `byte_count` bytes, decoded as UTF-8 with malformed sequences
	/// replaced by U+FFFD.
	pub fn read_utf8(&mut self, byte_count: usize) -> Result<String> {
		self.require(byte_count)?;
		let mut bytes = vec![0; byte_count];
		self.read_into_slice_exact(&mut bytes)?;
		if simdutf8::basic::from_utf8(&bytes).is_ok() {
			// Safety: the bytes were just validated.
			Ok(unsafe { String::from_utf8_unchecked(bytes) })
		} else {
			Ok(String::from_utf8_lossy(&bytes).into_owned())
		}
	}

	/// Removes everything buffered, decoded as UTF-8.
	pub fn read_utf8_to_end(&mut self) -> Result<String> {
		let byte_count = self.size();
		self.read_utf8(byte_count)
	}

	/// Removes one code point from the head. Malformed input consumes a
	/// single byte and decodes to U+FFFD: overlong encodings, truncated or
	/// interrupted sequences, surrogates, and values above U+10FFFF.
	pub fn read_utf8_code_point(&mut self) -> Result<char> {
		let first = self.get(0).ok_or(Error::EndOfInput)?;
		let width = utf8_char_width(first);
		if width == 1 {
			self.skip(1)?;
			return Ok(first as char);
		}
		if width == 0 || self.size() < width {
			self.skip(1)?;
			return Ok(REPLACEMENT);
		}
		let mut code_point = u32::from(first) & (0x7F >> width);
		for i in 1..width {
			let byte = self.get(i).expect("width was checked against size");
			if byte & 0xC0 != 0x80 {
				self.skip(1)?;
				return Ok(REPLACEMENT);
			}
			code_point = (code_point << 6) | u32::from(byte & 0x3F);
		}
		let min = match width {
			2 => 0x80,
			3 => 0x800,
			_ => 0x1_0000,
		};
		if code_point < min || (0xD800..=0xDFFF).contains(&code_point) || code_point > 0x10_FFFF {
			self.skip(1)?;
			return Ok(REPLACEMENT);
		}
		self.skip(width)?;
		Ok(char::from_u32(code_point).expect("the code point was just validated"))
	}

	/// Reads a line up to the next `\n` or `\r\n`, consuming the delimiter
	/// but not returning it. With no delimiter left, returns the remaining
	/// bytes, or `None` when the buffer is empty. A `\r` not followed by
	/// `\n` is ordinary content and stays in the line.
	pub fn read_utf8_line(&mut self) -> Result<Option<String>> {
		if self.is_empty() { return Ok(None) }
		match self.index_of(b'\n', 0, self.size()) {
			Some(newline) => self.read_line_at(newline).map(Some),
			None => self.read_utf8_to_end().map(Some),
		}
	}

	/// Like [`read_utf8_line`](Self::read_utf8_line), but fails with
	/// `EndOfInput` when no delimiter appears within `limit` bytes or before
	/// the end of the buffer. A `\r\n` straddling the limit still counts.
	pub fn read_utf8_line_strict(&mut self, limit: usize) -> Result<String> {
		let scan = limit.saturating_add(1).min(self.size());
		if let Some(newline) = self.index_of(b'\n', 0, scan) {
			return self.read_line_at(newline);
		}
		if scan > 0
			&& scan < self.size()
			&& self.get(scan - 1) == Some(b'\r')
			&& self.get(scan) == Some(b'\n')
		{
			return self.read_line_at(scan);
		}
		Err(Error::EndOfInput)
	}

	/// Reads the line ending with the `\n` at `newline`, consuming the
	/// delimiter.
	pub(crate) fn read_line_at(&mut self, newline: usize) -> Result<String> {
		if newline > 0 && self.get(newline - 1) == Some(b'\r') {
			let line = self.read_utf8(newline - 1)?;
			self.skip(2)?;
			Ok(line)
		} else {
			let line = self.read_utf8(newline)?;
			self.skip(1)?;
			Ok(line)
		}
	}

	/// Pulls one segment-granular batch of bytes from `reader` into the tail,
	/// returning the number read. Zero means end of stream.
	pub(crate) fn fill_from(
		&mut self,
		reader: &mut impl std::io::Read,
		byte_count: usize,
	) -> std::io::Result<usize> {
		if byte_count == 0 { return Ok(0) }
		let mut result = Ok(0);
		let n = {
			let tail = self.writable_tail();
			tail.write_with(|dst| {
				let cap = byte_count.min(dst.len());
				match reader.read(&mut dst[..cap]) {
					Ok(n) => n,
					Err(error) => {
						result = Err(error);
						0
					}
				}
			})
		};
		result?;
		self.size += n;
		self.tidy_tail();
		Ok(n)
	}
}

impl RawReader for Buffer {
	/// Moves up to `byte_count` of this buffer's bytes into `sink`. Returns
	/// `None` when this buffer is empty.
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>> {
		if byte_count == 0 { return Ok(Some(0)) }
		if self.is_empty() { return Ok(None) }
		let n = byte_count.min(self.size());
		sink.write(self, n)?;
		Ok(Some(n))
	}
}

