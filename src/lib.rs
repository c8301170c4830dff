// SPDX-License-Identifier: Apache-2.0

//! Synchronous byte I/O with recycled buffer segments.
//!
//! ## How it works
//!
//! Bytes live in fixed-size *segments* claimed from a per-thread *pool* and
//! returned to it as they empty. A [`Buffer`] queues segments: reads consume
//! its head, writes fill its tail. Moving data between buffers relinks whole
//! segments instead of copying, and large partial transfers alias a
//! segment's block rather than duplicate it. An aliased block is read-only
//! until its other holders are gone, which is what makes [`ByteString`]
//! snapshots cheap and safe: the snapshot keeps the block alive, the buffer
//! moves on.
//!
//! ## Streams
//!
//! [`RawReader`] and [`RawWriter`] are the byte-producer and byte-consumer
//! contracts, implemented by buffers themselves, host streams and sockets
//! ([`IoReader`], [`IoWriter`], [`socket_streams`]), and the in-memory
//! [`pipe`]. The buffered [`Reader`] and [`Writer`] wrap any of them with
//! typed reads and writes: integers in either endianness, UTF-8 text and
//! code points, lines, decimal and hexadecimal numbers, byte strings.
//!
//! ```
//! use jayo::{Buffer, Reader, Writer};
//!
//! let mut transport = Buffer::new();
//! let mut writer = Writer::new(&mut transport);
//! writer.write_utf8("segments, pooled\n")?;
//! writer.flush()?;
//! drop(writer);
//!
//! let mut reader = Reader::new(&mut transport);
//! assert_eq!(reader.read_utf8_line()?, Some("segments, pooled".to_owned()));
//! # Ok::<(), jayo::Error>(())
//! ```
//!
//! ## Cancellation
//!
//! Blocking operations observe the ambient [`cancel`] scope: a deadline or
//! an explicit cancel aborts reads and writes in flight, closing blocked
//! sockets from a watchdog thread where needed.

mod buffer;
mod byte_str;
pub mod cancel;
mod error;
mod pipe;
pub mod pool;
mod reader;
mod segment;
pub mod streams;
mod std_io;
mod util;
mod writer;

pub use buffer::Buffer;
pub use byte_str::{Ascii, ByteString, Utf8};
pub use error::{Error, Result};
pub use pipe::{pipe, PipeReader, PipeWriter};
pub use reader::{Peek, Reader};
pub use std_io::{socket_streams, IoReader, IoWriter, SocketReader, SocketWriter};
pub use streams::{
	void_reader, void_writer, BufferedReaderExt, BufferedWriterExt, RawReader, RawWriter,
	VoidReader, VoidWriter,
};
pub use writer::{AsyncWriter, Writer};

/// The size of every buffer segment, in bytes.
pub const SEGMENT_SIZE: usize = segment::SIZE;
