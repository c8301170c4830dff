// SPDX-License-Identifier: Apache-2.0

//! The segmented byte queue at the center of the library.
//!
//! A [`Buffer`] is a deque of pooled segments: the head holds the oldest
//! bytes and the tail the newest. Reads consume from the head and recycle
//! segments as they empty; writes fill the tail and claim segments as it
//! fills. Moving data between buffers relinks whole segments instead of
//! copying wherever possible, and snapshots alias segment blocks rather than
//! duplicating them.

mod read;
mod write;

use std::collections::VecDeque;
use std::fmt;
use crate::byte_str::ByteString;
use crate::segment::{Segment, SHARE_MINIMUM};
use crate::{pool, Error, Result};

/// A mutable, double-ended queue of bytes.
///
/// A buffer is also an in-memory stream: it implements both
/// [`RawReader`](crate::RawReader) (reading consumes its head) and
/// [`RawWriter`](crate::RawWriter) (writing appends to its tail), and never
/// blocks. It is not safe for concurrent use.
#[derive(Default)]
pub struct Buffer {
	segments: VecDeque<Segment>,
	size: usize,
}

impl Buffer {
	pub fn new() -> Self { Self::default() }

	/// Returns the number of readable bytes.
	pub fn size(&self) -> usize { self.size }

	pub fn is_empty(&self) -> bool { self.size == 0 }

	/// Releases every segment back to the pool.
	pub fn clear(&mut self) {
		for seg in self.segments.drain(..) {
			pool::release(seg);
		}
		self.size = 0;
	}

	/// Returns the byte at `index` without consuming it.
	pub fn get(&self, mut index: usize) -> Option<u8> {
		if index >= self.size { return None }
		for seg in &self.segments {
			if index < seg.len() {
				return Some(seg.data()[index]);
			}
			index -= seg.len();
		}
		None
	}

	/// Moves `byte_count` bytes from the head of `source` to the tail of this
	/// buffer. Whole head segments transfer by relinking; a partial head is
	/// absorbed into this buffer's tail when it fits, or its block is aliased
	/// when the piece is large enough to be worth it.
	pub fn write(&mut self, source: &mut Buffer, mut byte_count: usize) -> Result {
		if byte_count > source.size {
			return Err(Error::illegal(format!(
				"cannot move {byte_count} bytes out of a {}-byte buffer",
				source.size,
			)));
		}
		while byte_count > 0 {
			let head_len = source.segments.front().map_or(0, Segment::len);
			debug_assert!(head_len > 0, "a non-empty buffer should have a non-empty head");
			if byte_count < head_len {
				let tail_space = self.segments.back().map_or(0, Segment::writable_space);
				if byte_count <= tail_space || byte_count < SHARE_MINIMUM {
					self.copy_from_head(source, byte_count);
				} else {
					let head = source.segments.front_mut()
						.expect("a non-empty buffer should have a head segment");
					let prefix = head.share(byte_count);
					head.consume(byte_count);
					source.size -= byte_count;
					self.push_segment(prefix);
				}
				byte_count = 0;
			} else {
				let head = source.pop_head()
					.expect("a non-empty buffer should have a head segment");
				byte_count -= head.len();
				self.link_tail(head);
			}
		}
		Ok(())
	}

	/// Copies `byte_count` bytes starting at `offset` into `dst` without
	/// consuming them, aliasing blocks instead of copying bytes.
	pub fn copy_to(&self, dst: &mut Buffer, offset: usize, byte_count: usize) -> Result {
		let Some(end) = offset.checked_add(byte_count) else {
			return Err(Error::illegal("offset + byte_count overflows"));
		};
		if end > self.size {
			return Err(Error::illegal(format!(
				"range {offset}..{end} out of bounds for a {}-byte buffer",
				self.size,
			)));
		}
		let mut skip = offset;
		let mut remaining = byte_count;
		for seg in &self.segments {
			if remaining == 0 { break }
			if skip >= seg.len() {
				skip -= seg.len();
				continue;
			}
			let take = (seg.len() - skip).min(remaining);
			let mut view = seg.share_all();
			view.consume(skip);
			view.truncate(take);
			dst.push_segment(view);
			skip = 0;
			remaining -= take;
		}
		Ok(())
	}

	/// Returns an immutable snapshot aliasing this buffer's blocks. Constant
	/// per-segment cost; later reads and writes on this buffer leave the
	/// snapshot untouched.
	pub fn snapshot(&self) -> ByteString {
		ByteString::from_segments(self.segments.iter())
	}

	/// Returns the index of the first `byte` in `[from, to)`, or `None`.
	pub fn index_of(&self, byte: u8, from: usize, to: usize) -> Option<usize> {
		let to = to.min(self.size);
		if from >= to { return None }
		let mut base = 0;
		for seg in &self.segments {
			let seg_end = base + seg.len();
			if seg_end > from {
				let data = seg.data();
				let start = from.saturating_sub(base);
				let end = (to - base).min(data.len());
				if let Some(i) = data[start..end].iter().position(|&b| b == byte) {
					return Some(base + start + i);
				}
			}
			base = seg_end;
			if base >= to { break }
		}
		None
	}

	/// Returns the index of the first occurrence of `needle` at or after
	/// `from`, or `None`. An empty needle matches immediately.
	pub fn index_of_slice(&self, needle: &[u8], from: usize) -> Option<usize> {
		if needle.is_empty() { return Some(from.min(self.size)) }
		let last = self.size.checked_sub(needle.len())?;
		let mut i = from;
		while i <= last {
			let candidate = self.index_of(needle[0], i, last + 1)?;
			if self.range_equals(candidate, needle) {
				return Some(candidate);
			}
			i = candidate + 1;
		}
		None
	}

	/// Returns `true` if the bytes at `offset` equal `bytes`.
	pub(crate) fn range_equals(&self, offset: usize, bytes: &[u8]) -> bool {
		let Some(end) = offset.checked_add(bytes.len()) else { return false };
		if end > self.size { return false }
		let mut matched = 0;
		let mut base = 0;
		for seg in &self.segments {
			let data = seg.data();
			let seg_end = base + data.len();
			if matched < bytes.len() && seg_end > offset + matched {
				let start = offset + matched - base;
				let n = (data.len() - start).min(bytes.len() - matched);
				if data[start..start + n] != bytes[matched..matched + n] {
					return false;
				}
				matched += n;
			}
			base = seg_end;
			if matched == bytes.len() { break }
		}
		matched == bytes.len()
	}

	/// Discards exactly `byte_count` bytes from the head. When the buffer
	/// holds fewer, everything is discarded and `EndOfInput` is returned.
	pub fn skip(&mut self, byte_count: usize) -> Result {
		let short = byte_count > self.size;
		let mut remaining = byte_count.min(self.size);
		while remaining > 0 {
			let head = self.segments.front_mut()
				.expect("a non-empty buffer should have a head segment");
			let n = remaining.min(head.len());
			head.consume(n);
			self.size -= n;
			remaining -= n;
			self.tidy_head();
		}
		if short { Err(Error::EndOfInput) } else { Ok(()) }
	}

	/// Drains this buffer into `dst`, returning the number of bytes written.
	pub fn read_all(&mut self, dst: &mut impl crate::RawWriter) -> Result<usize> {
		let byte_count = self.size;
		if byte_count > 0 {
			dst.write(self, byte_count)?;
		}
		Ok(byte_count)
	}

	/// Appends everything `source` produces, returning the number of bytes
	/// read.
	pub fn write_all_from(&mut self, source: &mut impl crate::RawReader) -> Result<usize> {
		let mut total = 0;
		while let Some(n) = source.read_at_most_to(self, crate::SEGMENT_SIZE)? {
			total += n;
		}
		Ok(total)
	}

	/// Appends a whole segment, recycling it if empty.
	pub(crate) fn push_segment(&mut self, seg: Segment) {
		if seg.is_empty() {
			pool::release(seg);
			return;
		}
		self.size += seg.len();
		self.segments.push_back(seg);
	}

	/// Links a segment to the tail, absorbing it into the previous tail when
	/// it fits there to keep segment occupancy high.
	fn link_tail(&mut self, mut seg: Segment) {
		if seg.is_empty() {
			pool::release(seg);
			return;
		}
		self.size += seg.len();
		if let Some(tail) = self.segments.back_mut() {
			if seg.len() <= tail.writable_space() {
				seg.move_into(tail, seg.len());
				pool::release(seg);
				return;
			}
		}
		self.segments.push_back(seg);
	}

	fn pop_head(&mut self) -> Option<Segment> {
		let head = self.segments.pop_front()?;
		self.size -= head.len();
		Some(head)
	}

	/// Recycles emptied head segments. Called after every consuming read.
	fn tidy_head(&mut self) {
		while self.segments.front().is_some_and(Segment::is_empty) {
			let head = self.segments.pop_front()
				.expect("an empty head was just observed");
			pool::release(head);
		}
	}

	/// Copies `byte_count` bytes (less than the head's length) from `source`'s
	/// head into this buffer's tail.
	fn copy_from_head(&mut self, source: &mut Buffer, byte_count: usize) {
		let head = source.segments.front_mut()
			.expect("a non-empty buffer should have a head segment");
		let mut remaining = byte_count;
		while remaining > 0 {
			let tail = self.writable_tail();
			let n = head.move_into(tail, remaining);
			self.size += n;
			remaining -= n;
		}
		source.size -= byte_count;
	}

	/// Returns the tail segment, claiming a fresh one when the current tail
	/// is full or shared.
	fn writable_tail(&mut self) -> &mut Segment {
		let needs_new = match self.segments.back() {
			Some(tail) => tail.writable_space() == 0,
			None => true,
		};
		if needs_new {
			self.segments.push_back(pool::take());
		}
		self.segments.back_mut()
			.expect("a tail segment was just ensured")
	}

	/// Drops an empty tail left behind by a stalled write.
	fn tidy_tail(&mut self) {
		if self.segments.back().is_some_and(Segment::is_empty) {
			let tail = self.segments.pop_back()
				.expect("an empty tail was just observed");
			pool::release(tail);
		}
	}

	/// Returns the bytes in segments that can no longer grow: everything
	/// except a tail still open for writing.
	pub(crate) fn complete_segment_bytes(&self) -> usize {
		match self.segments.back() {
			Some(tail) if tail.writable_space() > 0 => self.size - tail.len(),
			_ => self.size,
		}
	}

	/// Returns the readable bytes of the head segment.
	pub(crate) fn head_slice(&self) -> &[u8] {
		self.segments.front().map_or(&[], Segment::data)
	}

}

impl PartialEq for Buffer {
	/// Compares contents byte for byte, regardless of how either buffer's
	/// bytes are segmented.
	fn eq(&self, other: &Self) -> bool {
		if self.size != other.size {
			return false;
		}
		let mut left = self.segments.iter().map(Segment::data);
		let mut right = other.segments.iter().map(Segment::data);
		let mut a: &[u8] = &[];
		let mut b: &[u8] = &[];
		loop {
			if a.is_empty() {
				a = left.next().unwrap_or(&[]);
			}
			if b.is_empty() {
				b = right.next().unwrap_or(&[]);
			}
			if a.is_empty() && b.is_empty() {
				return true;
			}
			let n = a.len().min(b.len());
			if n == 0 || a[..n] != b[..n] {
				// Unequal sizes were ruled out, so a lone empty side means a
				// bookkeeping bug rather than shorter content.
				return false;
			}
			a = &a[n..];
			b = &b[n..];
		}
	}
}

impl Eq for Buffer {}

impl From<&[u8]> for Buffer {
	fn from(value: &[u8]) -> Self {
		let mut buf = Buffer::new();
		buf.write_from_slice(value);
		buf
	}
}

impl From<&str> for Buffer {
	fn from(value: &str) -> Self {
		value.as_bytes().into()
	}
}

impl Clone for Buffer {
	/// Clones by aliasing blocks: linear in segments, no byte copies. The
	/// clone and the original each consume independently.
	fn clone(&self) -> Self {
		let mut out = Buffer::new();
		for seg in &self.segments {
			out.segments.push_back(seg.share_all());
		}
		out.size = self.size;
		out
	}
}

impl Drop for Buffer {
	fn drop(&mut self) {
		self.clear();
	}
}

impl fmt::Debug for Buffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Buffer[size={} data=", self.size)?;
		let mut remaining = 64usize;
		'outer: for seg in &self.segments {
			for byte in seg.data() {
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
