// SPDX-License-Identifier: Apache-2.0

use std::{io, result};
use thiserror::Error;

pub type Result<T = ()> = result::Result<T, Error>;

/// The error type for buffer and stream operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// The underlying source reached its end before the operation's contract
	/// could be satisfied.
	#[error("premature end of input")]
	EndOfInput,
	/// An operation on a closed stream, or on a closed side of a pipe.
	#[error("stream closed")]
	Closed,
	/// The enclosing scope's deadline elapsed before the operation completed.
	#[error("operation timed out")]
	Timeout,
	/// The enclosing scope was cancelled while the operation was blocked or
	/// about to block.
	#[error("interrupted")]
	Interrupted,
	/// Malformed data: bad digits, invalid base64, a strict decode failure.
	#[error("{0}")]
	Protocol(String),
	/// A host I/O failure.
	#[error("IO error")]
	Io(#[from] io::Error),
	/// An out-of-range count or offset passed to a fallible operation.
	#[error("illegal argument: {0}")]
	IllegalArgument(String),
}

impl Error {
	/// Returns `true` for cancellation failures, whether from an elapsed
	/// deadline or an explicit cancel.
	pub fn is_interruption(&self) -> bool {
		matches!(self, Self::Timeout | Self::Interrupted)
	}

	pub(crate) fn protocol(message: impl Into<String>) -> Self {
		Self::Protocol(message.into())
	}

	pub(crate) fn illegal(message: impl Into<String>) -> Self {
		Self::IllegalArgument(message.into())
	}
}

impl From<Error> for io::Error {
	fn from(value: Error) -> Self {
		match value {
			Error::EndOfInput => io::Error::new(io::ErrorKind::UnexpectedEof, value),
			Error::Timeout => io::Error::new(io::ErrorKind::TimedOut, value),
			Error::Interrupted => io::Error::new(io::ErrorKind::Interrupted, value),
			Error::Io(source) => source,
			_ => io::Error::new(io::ErrorKind::Other, value),
		}
	}
}
