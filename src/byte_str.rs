// SPDX-License-Identifier: Apache-2.0

//! Immutable byte sequences.
//!
//! A [`ByteString`] is either a single contiguous allocation or a segmented
//! snapshot aliasing buffer blocks. The two representations compare, hash,
//! and search identically. [`Utf8`] refines a byte string whose contents are
//! valid UTF-8; [`Ascii`] refines that further to seven-bit data.

mod encoding;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};
use crate::segment::{Block, Segment};
use crate::{Error, Result};

/// An immutable sequence of bytes.
#[derive(Clone)]
pub struct ByteString {
	repr: Repr,
	hash: OnceLock<u64>,
}

#[derive(Clone)]
enum Repr {
	Contiguous(Arc<[u8]>),
	Segmented {
		chunks: Vec<Chunk>,
		/// Cumulative end offsets: `directory[i]` is one past chunk `i`.
		directory: Vec<usize>,
	},
}

/// One aliased run of a segment block.
#[derive(Clone)]
pub(crate) struct Chunk {
	block: Arc<Block>,
	start: usize,
	end: usize,
}

impl Chunk {
	fn as_slice(&self) -> &[u8] {
		&self.block[self.start..self.end]
	}
}

impl ByteString {
	/// Returns a byte string copying `bytes`.
	pub fn of(bytes: &[u8]) -> Self {
		Self::from_arc(Arc::from(bytes))
	}

	pub fn empty() -> Self {
		Self::from_arc(Arc::from(&[][..]))
	}

	fn from_arc(data: Arc<[u8]>) -> Self {
		Self {
			repr: Repr::Contiguous(data),
			hash: OnceLock::new(),
		}
	}

	/// Builds a segmented byte string aliasing the given segments' blocks.
	pub(crate) fn from_segments<'a>(segments: impl Iterator<Item = &'a Segment>) -> Self {
		let mut chunks = Vec::new();
		let mut directory = Vec::new();
		let mut len = 0;
		for seg in segments {
			if seg.is_empty() { continue }
			len += seg.len();
			chunks.push(Chunk {
				block: Arc::clone(seg.block()),
				start: seg.pos(),
				end: seg.limit(),
			});
			directory.push(len);
		}
		if chunks.is_empty() {
			return Self::empty();
		}
		Self {
			repr: Repr::Segmented { chunks, directory },
			hash: OnceLock::new(),
		}
	}

	/// Returns the length in bytes.
	pub fn len(&self) -> usize {
		match &self.repr {
			Repr::Contiguous(data) => data.len(),
			Repr::Segmented { directory, .. } => *directory.last()
				.expect("segmented byte strings always hold at least one chunk"),
		}
	}

	pub fn is_empty(&self) -> bool { self.len() == 0 }

	/// Returns the byte at `index`.
	///
	/// # Panics
	///
	/// Panics when `index` is out of bounds.
	pub fn byte_at(&self, index: usize) -> u8 {
		match &self.repr {
			Repr::Contiguous(data) => data[index],
			Repr::Segmented { chunks, directory } => {
				assert!(
					index < self.len(),
					"index {index} out of bounds for length {}", self.len(),
				);
				// The directory makes random access a binary search.
				let at = directory.partition_point(|&end| end <= index);
				let chunk_start = if at == 0 { 0 } else { directory[at - 1] };
				chunks[at].as_slice()[index - chunk_start]
			}
		}
	}

	/// Returns the byte at `index`, or `None` when out of bounds.
	pub fn get(&self, index: usize) -> Option<u8> {
		(index < self.len()).then(|| self.byte_at(index))
	}

	/// Iterates the underlying byte runs: a single slice for contiguous
	/// strings, one per aliased block otherwise.
	pub(crate) fn chunks(&self) -> Chunks<'_> {
		match &self.repr {
			Repr::Contiguous(data) => Chunks::One(Some(&data[..])),
			Repr::Segmented { chunks, .. } => Chunks::Many(chunks.iter()),
		}
	}

	/// Copies the contents into a vector.
	pub fn to_vec(&self) -> Vec<u8> {
		let mut vec = Vec::with_capacity(self.len());
		for chunk in self.chunks() {
			vec.extend_from_slice(chunk);
		}
		vec
	}

	/// Borrows the bytes when contiguous, materializing a copy otherwise.
	pub(crate) fn contiguous(&self) -> Cow<'_, [u8]> {
		match &self.repr {
			Repr::Contiguous(data) => Cow::Borrowed(data),
			Repr::Segmented { .. } => Cow::Owned(self.to_vec()),
		}
	}

	/// Returns the bytes in `[start, end)` as a new byte string. The full
	/// range returns a cheap clone.
	///
	/// # Panics
	///
	/// Panics when the range is inverted or out of bounds.
	pub fn substring(&self, start: usize, end: usize) -> ByteString {
		assert!(
			start <= end && end <= self.len(),
			"substring {start}..{end} out of bounds for length {}", self.len(),
		);
		if start == 0 && end == self.len() {
			return self.clone();
		}
		let mut vec = Vec::with_capacity(end - start);
		let mut base = 0;
		for chunk in self.chunks() {
			let chunk_end = base + chunk.len();
			if chunk_end > start && base < end {
				let from = start.saturating_sub(base);
				let to = (end - base).min(chunk.len());
				vec.extend_from_slice(&chunk[from..to]);
			}
			base = chunk_end;
			if base >= end { break }
		}
		vec.into()
	}

	/// Returns `true` if the bytes at `offset` equal `bytes`.
	pub fn range_equals(&self, offset: usize, bytes: &[u8]) -> bool {
		let Some(end) = offset.checked_add(bytes.len()) else { return false };
		if end > self.len() { return false }
		let mut matched = 0;
		let mut base = 0;
		for chunk in self.chunks() {
			let chunk_end = base + chunk.len();
			if matched < bytes.len() && chunk_end > offset + matched {
				let start = offset + matched - base;
				let n = (chunk.len() - start).min(bytes.len() - matched);
				if chunk[start..start + n] != bytes[matched..matched + n] {
					return false;
				}
				matched += n;
			}
			base = chunk_end;
			if matched == bytes.len() { break }
		}
		matched == bytes.len()
	}

	pub fn starts_with(&self, prefix: &[u8]) -> bool {
		self.range_equals(0, prefix)
	}

	pub fn ends_with(&self, suffix: &[u8]) -> bool {
		self.len() >= suffix.len() && self.range_equals(self.len() - suffix.len(), suffix)
	}

	/// Returns the index of the first occurrence of `needle` at or after
	/// `from`. An empty needle matches immediately.
	pub fn index_of(&self, needle: &[u8], from: usize) -> Option<usize> {
		if needle.is_empty() {
			return Some(from.min(self.len()));
		}
		let last = self.len().checked_sub(needle.len())?;
		(from..=last).find(|&i| self.range_equals(i, needle))
	}

	/// Returns the index of the last occurrence of `needle` starting at or
	/// before `from`.
	pub fn last_index_of(&self, needle: &[u8], from: usize) -> Option<usize> {
		if needle.is_empty() {
			return Some(from.min(self.len()));
		}
		let last = self.len().checked_sub(needle.len())?;
		(0..=last.min(from)).rev().find(|&i| self.range_equals(i, needle))
	}

	pub fn is_ascii(&self) -> bool {
		self.chunks().all(|chunk| chunk.is_ascii())
	}

	/// Returns a copy with ASCII letters lowercased, or a cheap clone of
	/// `self` when no byte would change.
	pub fn to_ascii_lowercase(&self) -> ByteString {
		if !self.chunks().any(|c| c.iter().any(u8::is_ascii_uppercase)) {
			return self.clone();
		}
		let mut vec = self.to_vec();
		vec.make_ascii_lowercase();
		vec.into()
	}

	/// Returns a copy with ASCII letters uppercased, or a cheap clone of
	/// `self` when no byte would change.
	pub fn to_ascii_uppercase(&self) -> ByteString {
		if !self.chunks().any(|c| c.iter().any(u8::is_ascii_lowercase)) {
			return self.clone();
		}
		let mut vec = self.to_vec();
		vec.make_ascii_uppercase();
		vec.into()
	}

	/// Decodes the bytes as UTF-8, replacing malformed sequences with U+FFFD.
	pub fn decode_to_string(&self) -> String {
		let bytes = self.to_vec();
		if simdutf8::basic::from_utf8(&bytes).is_ok() {
			// Safety: the bytes were just validated.
			unsafe { String::from_utf8_unchecked(bytes) }
		} else {
			String::from_utf8_lossy(&bytes).into_owned()
		}
	}

	/// Decodes the bytes as ISO-8859-1, mapping every byte to the code point
	/// of the same value.
	pub fn decode_latin1(&self) -> String {
		self.chunks()
			.flat_map(|chunk| chunk.iter().map(|&b| char::from(b)))
			.collect()
	}

	fn cached_hash(&self) -> u64 {
		*self.hash.get_or_init(|| {
			// FNV-1a over the logical byte sequence.
			let mut hash: u64 = 0xCBF2_9CE4_8422_2325;
			for chunk in self.chunks() {
				for &byte in chunk {
					hash ^= u64::from(byte);
					hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
				}
			}
			hash
		})
	}

	fn compare(&self, other: &ByteString) -> Ordering {
		let mut left = self.chunks();
		let mut right = other.chunks();
		let mut a: &[u8] = &[];
		let mut b: &[u8] = &[];
		loop {
			if a.is_empty() {
				a = left.next().unwrap_or(&[]);
			}
			if b.is_empty() {
				b = right.next().unwrap_or(&[]);
			}
			match (a.is_empty(), b.is_empty()) {
				(true, true) => return Ordering::Equal,
				(true, false) => return Ordering::Less,
				(false, true) => return Ordering::Greater,
				(false, false) => {}
			}
			let n = a.len().min(b.len());
			match a[..n].cmp(&b[..n]) {
				Ordering::Equal => {
					a = &a[n..];
					b = &b[n..];
				}
				unequal => return unequal,
			}
		}
	}
}

pub(crate) enum Chunks<'a> {
	One(Option<&'a [u8]>),
	Many(std::slice::Iter<'a, Chunk>),
}

impl<'a> Iterator for Chunks<'a> {
	type Item = &'a [u8];

	fn next(&mut self) -> Option<&'a [u8]> {
		match self {
			Self::One(slice) => slice.take(),
			Self::Many(chunks) => chunks.next().map(Chunk::as_slice),
		}
	}
}

impl Default for ByteString {
	fn default() -> Self { Self::empty() }
}

impl PartialEq for ByteString {
	fn eq(&self, other: &Self) -> bool {
		if self.len() != other.len() {
			return false;
		}
		if let (Some(a), Some(b)) = (self.hash.get(), other.hash.get()) {
			if a != b { return false }
		}
		self.compare(other) == Ordering::Equal
	}
}

impl Eq for ByteString {}

impl PartialOrd for ByteString {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ByteString {
	fn cmp(&self, other: &Self) -> Ordering {
		self.compare(other)
	}
}

impl Hash for ByteString {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_u64(self.cached_hash());
	}
}

impl From<Vec<u8>> for ByteString {
	fn from(value: Vec<u8>) -> Self {
		Self::from_arc(value.into())
	}
}

impl From<&[u8]> for ByteString {
	fn from(value: &[u8]) -> Self {
		Self::of(value)
	}
}

impl<const N: usize> From<[u8; N]> for ByteString {
	fn from(value: [u8; N]) -> Self {
		Self::of(&value)
	}
}

impl From<&str> for ByteString {
	fn from(value: &str) -> Self {
		Self::of(value.as_bytes())
	}
}

impl fmt::Debug for ByteString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ByteString[size={} hex=", self.len())?;
		let mut remaining = 64usize;
		'outer: for chunk in self.chunks() {
			for byte in chunk {
				if remaining == 0 {
					write!(f, "…")?;
					break 'outer;
				}
				write!(f, "{byte:02x}")?;
				remaining -= 1;
			}
		}
		write!(f, "]")
	}
}

/// A byte string whose contents are valid UTF-8.
#[derive(Clone)]
pub struct Utf8 {
	bytes: ByteString,
	/// Materialized text for segmented data; contiguous data borrows in
	/// place.
	string: OnceLock<String>,
	utf16_len: OnceLock<usize>,
}

impl Utf8 {
	/// Validates `bytes` as UTF-8.
	pub fn from_byte_string(bytes: ByteString) -> Result<Utf8> {
		let string = OnceLock::new();
		match &bytes.repr {
			Repr::Contiguous(data) => {
				simdutf8::compat::from_utf8(data)
					.map_err(|e| Error::protocol(format!("invalid UTF-8: {e}")))?;
			}
			Repr::Segmented { .. } => {
				// Sequences may straddle chunk boundaries; validate a
				// materialized copy and keep it as the cached text.
				let vec = bytes.to_vec();
				simdutf8::compat::from_utf8(&vec)
					.map_err(|e| Error::protocol(format!("invalid UTF-8: {e}")))?;
				// Safety: the bytes were just validated.
				let _ = string.set(unsafe { String::from_utf8_unchecked(vec) });
			}
		}
		Ok(Self {
			bytes,
			string,
			utf16_len: OnceLock::new(),
		})
	}

	/// Borrows the contents as text.
	pub fn as_str(&self) -> &str {
		if let Repr::Contiguous(data) = &self.bytes.repr {
			// Safety: validated at construction.
			return unsafe { std::str::from_utf8_unchecked(data) };
		}
		self.string
			.get_or_init(|| {
				let vec = self.bytes.to_vec();
				// Safety: validated at construction.
				unsafe { String::from_utf8_unchecked(vec) }
			})
			.as_str()
	}

	/// Returns the number of UTF-16 code units needed to encode the text.
	/// Computed once and cached.
	pub fn len_utf16(&self) -> usize {
		*self.utf16_len.get_or_init(|| {
			self.as_str().chars().map(char::len_utf16).sum()
		})
	}

	/// The exact number of bytes `text` occupies in a buffer.
	pub fn size_of(text: &str) -> usize {
		text.len()
	}

	/// The exact number of bytes the UTF-16 code units occupy once encoded,
	/// under the same unpaired-surrogate policy as
	/// [`Buffer::write_utf16`](crate::Buffer::write_utf16).
	pub fn size_of_utf16(units: &[u16]) -> usize {
		crate::util::utf8::utf16_utf8_len(units)
	}

	pub fn into_byte_string(self) -> ByteString {
		self.bytes
	}
}

impl Deref for Utf8 {
	type Target = ByteString;

	fn deref(&self) -> &ByteString { &self.bytes }
}

impl From<&str> for Utf8 {
	fn from(value: &str) -> Self {
		Self {
			bytes: value.into(),
			string: OnceLock::new(),
			utf16_len: OnceLock::new(),
		}
	}
}

impl PartialEq for Utf8 {
	fn eq(&self, other: &Self) -> bool { self.bytes == other.bytes }
}

impl Eq for Utf8 {}

impl Hash for Utf8 {
	fn hash<H: Hasher>(&self, state: &mut H) { self.bytes.hash(state) }
}

impl fmt::Display for Utf8 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl fmt::Debug for Utf8 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Utf8({:?})", self.as_str())
	}
}

/// A byte string of seven-bit text: valid UTF-8 whose UTF-16 length equals
/// its byte length.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ascii {
	text: Utf8,
}

impl Ascii {
	/// Refines `text`, failing when any byte is outside the ASCII range.
	pub fn from_utf8(text: Utf8) -> Result<Ascii> {
		if !text.is_ascii() {
			return Err(Error::protocol("non-ASCII byte in ASCII string"));
		}
		Ok(Self { text })
	}

	pub fn into_utf8(self) -> Utf8 {
		self.text
	}
}

impl Deref for Ascii {
	type Target = Utf8;

	fn deref(&self) -> &Utf8 { &self.text }
}

impl TryFrom<&str> for Ascii {
	type Error = Error;

	fn try_from(value: &str) -> Result<Ascii> {
		Self::from_utf8(value.into())
	}
}

impl fmt::Display for Ascii {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl fmt::Debug for Ascii {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Ascii({:?})", self.as_str())
	}
}
