// SPDX-License-Identifier: Apache-2.0

use crate::byte_str::ByteString;
use crate::streams::RawWriter;
use crate::util::utf8::{code_points_of_utf16, encode_code_point};
use crate::{Buffer, Result};

macro_rules! int_writes {
	($($name:ident $le_name:ident -> $ty:ident,)+) => {$(
		#[doc = concat!("Appends one big-endian [`", stringify!($ty), "`].")]
		pub fn $name(&mut self, value: $ty) {
			self.write_from_slice(&value.to_be_bytes());
		}

		#[doc = concat!("Appends one little-endian [`", stringify!($ty), "`].")]
		pub fn $le_name(&mut self, value: $ty) {
			self.write_from_slice(&value.to_le_bytes());
		}
	)+}
}

impl Buffer {
	/// Appends the entire slice, claiming segments as the tail fills.
	pub fn write_from_slice(&mut self, mut bytes: &[u8]) {
		while !bytes.is_empty() {
			let n = {
				let tail = self.writable_tail();
				tail.push_slice(bytes)
			};
			self.size += n;
			bytes = &bytes[n..];
		}
	}

	/// Appends one byte.
	pub fn write_u8(&mut self, value: u8) {
		self.write_from_slice(&[value]);
	}

	/// Appends one byte, reinterpreted from signed.
	pub fn write_i8(&mut self, value: i8) {
		self.write_u8(value as u8);
	}

	int_writes! {
		write_u16 write_u16_le -> u16,
		write_i16 write_i16_le -> i16,
		write_u32 write_u32_le -> u32,
		write_i32 write_i32_le -> i32,
		write_u64 write_u64_le -> u64,
		write_i64 write_i64_le -> i64,
	}

	/// Appends the decimal digits of `value`, with a leading `-` when
	/// negative.
	pub fn write_decimal_i64(&mut self, value: i64) {
		if value == 0 {
			self.write_u8(b'0');
			return;
		}
		let mut magnitude = value.unsigned_abs();
		let mut digits = [0u8; 20];
		let mut at = digits.len();
		while magnitude != 0 {
			at -= 1;
			digits[at] = b'0' + (magnitude % 10) as u8;
			magnitude /= 10;
		}
		if value < 0 {
			at -= 1;
			digits[at] = b'-';
		}
		self.write_from_slice(&digits[at..]);
	}

	/// Appends the lowercase hexadecimal digits of `value`, without a prefix
	/// or leading zeros.
	pub fn write_hex_u64(&mut self, mut value: u64) {
		const DIGITS: &[u8; 16] = b"0123456789abcdef";

		if value == 0 {
			self.write_u8(b'0');
			return;
		}
		let mut digits = [0u8; 16];
		let mut at = digits.len();
		while value != 0 {
			at -= 1;
			digits[at] = DIGITS[(value & 0xF) as usize];
			value >>= 4;
		}
		self.write_from_slice(&digits[at..]);
	}

	/// Appends the UTF-8 bytes of `text`.
	pub fn write_utf8(&mut self, text: &str) {
		self.write_from_slice(text.as_bytes());
	}

	/// Appends one code point as UTF-8. Surrogate code points and values
	/// above U+10FFFF append `?` instead.
	pub fn write_utf8_code_point(&mut self, code_point: u32) {
		let mut buf = [0; 4];
		let n = encode_code_point(code_point, &mut buf);
		self.write_from_slice(&buf[..n]);
	}

	/// Appends UTF-16 code units as UTF-8, combining surrogate pairs into
	/// 4-byte sequences. Unpaired surrogates append `?`.
	pub fn write_utf16(&mut self, units: &[u16]) {
		for code_point in code_points_of_utf16(units) {
			self.write_utf8_code_point(code_point);
		}
	}

	/// Appends the contents of a byte string.
	pub fn write_byte_string(&mut self, value: &ByteString) {
		for chunk in value.chunks() {
			self.write_from_slice(chunk);
		}
	}

	/// Pushes up to `byte_count` head bytes into `writer`, returning the
	/// number written.
	pub(crate) fn drain_to(
		&mut self,
		writer: &mut impl std::io::Write,
		byte_count: usize,
	) -> std::io::Result<usize> {
		let mut remaining = byte_count.min(self.size());
		let mut total = 0;
		while remaining > 0 {
			let written = {
				let head = self.segments.front_mut()
					.expect("a non-empty buffer should have a head segment");
				let offered = remaining.min(head.len());
				let written = writer.write(&head.data()[..offered])?;
				head.consume(written);
				written
			};
			if written == 0 {
				return Err(std::io::ErrorKind::WriteZero.into());
			}
			self.size -= written;
			total += written;
			remaining -= written;
			self.tidy_head();
		}
		Ok(total)
	}
}

impl RawWriter for Buffer {
	/// Moves exactly `byte_count` bytes from `source` to this buffer's tail.
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		Buffer::write(self, source, byte_count)
	}
}
