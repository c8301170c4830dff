// SPDX-License-Identifier: Apache-2.0

//! An in-memory producer/consumer coupling.
//!
//! A pipe holds a buffer with a size cap between a writing half and a
//! reading half, usually owned by different threads. The writer parks while
//! the buffer is full; the reader parks while it is empty. Closing either
//! half wakes the other. Parked calls observe the ambient cancel scope: the
//! pipe registers itself as a closeable resource, so a deadline or a cancel
//! wakes the waiters and the checkpoint inside the loop reports it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use crate::cancel::{self, AsyncCloseable, CancelToken};
use crate::streams::{RawReader, RawWriter};
use crate::{Buffer, Error, Result};

/// Creates a pipe holding at most `max_buffer_size` bytes.
///
/// # Panics
///
/// Panics when `max_buffer_size` is zero.
pub fn pipe(max_buffer_size: usize) -> (PipeReader, PipeWriter) {
	assert!(max_buffer_size > 0, "a pipe needs room for at least one byte");
	let shared = Arc::new(Shared {
		state: Mutex::new(State {
			buffer: Buffer::new(),
			max_buffer_size,
			reader_closed: false,
			writer_closed: false,
		}),
		bytes_in: Condvar::new(),
		bytes_out: Condvar::new(),
	});
	(
		PipeReader { shared: Arc::clone(&shared) },
		PipeWriter { shared },
	)
}

struct State {
	buffer: Buffer,
	max_buffer_size: usize,
	reader_closed: bool,
	writer_closed: bool,
}

struct Shared {
	state: Mutex<State>,
	/// Signalled when the writer produces or closes.
	bytes_in: Condvar,
	/// Signalled when the reader drains or closes.
	bytes_out: Condvar,
}

impl Shared {
	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Parks on `waker` until notified, or until the ambient deadline when
	/// one is set. The caller re-checks its condition and the scope either
	/// way.
	fn park<'a>(&self, waker: &Condvar, state: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
		let deadline = CancelToken::current().and_then(|token| token.deadline());
		match deadline {
			Some(at) => {
				let timeout = at.saturating_duration_since(Instant::now());
				waker.wait_timeout(state, timeout)
					.unwrap_or_else(PoisonError::into_inner)
					.0
			}
			None => waker.wait(state).unwrap_or_else(PoisonError::into_inner),
		}
	}
}

impl AsyncCloseable for Shared {
	fn close_abruptly(&self) {
		// Wake both sides; their loops re-check the scope and fail there.
		self.bytes_in.notify_all();
		self.bytes_out.notify_all();
	}
}

/// The reading half of a pipe.
pub struct PipeReader {
	shared: Arc<Shared>,
}

impl RawReader for PipeReader {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<Option<usize>> {
		if byte_count == 0 {
			return Ok(Some(0));
		}
		let resource: Arc<dyn AsyncCloseable> = self.shared.clone();
		cancel::guard(resource, || {
			let mut state = self.shared.lock();
			loop {
				cancel::check()?;
				if state.reader_closed {
					return Err(Error::Closed);
				}
				if !state.buffer.is_empty() {
					let n = byte_count.min(state.buffer.size());
					sink.write(&mut state.buffer, n)?;
					self.shared.bytes_out.notify_all();
					return Ok(Some(n));
				}
				if state.writer_closed {
					return Ok(None);
				}
				state = self.shared.park(&self.shared.bytes_in, state);
			}
		})
	}

	fn close(&mut self) -> Result {
		let mut state = self.shared.lock();
		if !state.reader_closed {
			state.reader_closed = true;
			self.shared.bytes_in.notify_all();
			self.shared.bytes_out.notify_all();
		}
		Ok(())
	}
}

impl Drop for PipeReader {
	fn drop(&mut self) {
		let _ = RawReader::close(self);
	}
}

/// The writing half of a pipe.
pub struct PipeWriter {
	shared: Arc<Shared>,
}

impl RawWriter for PipeWriter {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		if byte_count > source.size() {
			return Err(Error::illegal(format!(
				"cannot write {byte_count} bytes out of a {}-byte buffer",
				source.size(),
			)));
		}
		let resource: Arc<dyn AsyncCloseable> = self.shared.clone();
		cancel::guard(resource, || {
			let mut remaining = byte_count;
			let mut state = self.shared.lock();
			while remaining > 0 {
				cancel::check()?;
				if state.writer_closed || state.reader_closed {
					return Err(Error::Closed);
				}
				let space = state.max_buffer_size - state.buffer.size();
				if space == 0 {
					state = self.shared.park(&self.shared.bytes_out, state);
					continue;
				}
				let n = space.min(remaining);
				state.buffer.write(source, n)?;
				remaining -= n;
				self.shared.bytes_in.notify_all();
			}
			Ok(())
		})
	}

	fn close(&mut self) -> Result {
		let mut state = self.shared.lock();
		if !state.writer_closed {
			state.writer_closed = true;
			self.shared.bytes_in.notify_all();
			self.shared.bytes_out.notify_all();
		}
		Ok(())
	}
}

impl Drop for PipeWriter {
	fn drop(&mut self) {
		let _ = RawWriter::close(self);
	}
}
