// SPDX-License-Identifier: Apache-2.0

use std::thread;
use std::time::Duration;
use pretty_assertions::assert_eq;
use jayo::{pipe, Buffer, BufferedReaderExt, BufferedWriterExt, Error, RawReader, RawWriter};

#[test]
fn bytes_flow_across_threads() {
	let data: Vec<u8> = (0..256 * 1024).map(|i| (i % 241) as u8).collect();
	let (reader, writer) = pipe(8 * 1024);

	let producer = {
		let data = data.clone();
		thread::spawn(move || {
			let mut writer = writer.buffered();
			writer.write_from_slice(&data).unwrap();
			writer.close().unwrap();
		})
	};

	let mut collected = Buffer::new();
	let mut reader = reader.buffered();
	let copied = reader.read_all(&mut collected).unwrap();
	producer.join().unwrap();

	assert_eq!(copied, data.len());
	let mut out = vec![0; data.len()];
	collected.read_into_slice_exact(&mut out).unwrap();
	assert_eq!(out, data);
}

#[test]
fn a_full_pipe_blocks_until_drained() {
	let (mut reader, mut writer) = pipe(32);
	let mut source = Buffer::new();
	source.write_from_slice(&[9u8; 96]);

	let consumer = thread::spawn(move || {
		// Give the writer a chance to fill the pipe and park.
		thread::sleep(Duration::from_millis(50));
		let mut sink = Buffer::new();
		let mut drained = 0;
		while drained < 96 {
			if let Some(n) = reader.read_at_most_to(&mut sink, 96).unwrap() {
				drained += n;
			}
		}
		sink
	});

	writer.write(&mut source, 96).unwrap();
	let sink = consumer.join().unwrap();
	assert_eq!(sink.size(), 96);
	assert!(source.is_empty());
}

#[test]
fn closing_the_writer_signals_end_of_stream() {
	let (mut reader, mut writer) = pipe(1024);
	let mut source = Buffer::new();
	source.write_from_slice(b"last words");
	writer.write(&mut source, 10).unwrap();
	writer.close().unwrap();

	let mut sink = Buffer::new();
	assert_eq!(reader.read_at_most_to(&mut sink, 1024).unwrap(), Some(10));
	assert_eq!(reader.read_at_most_to(&mut sink, 1024).unwrap(), None);
	assert_eq!(sink.read_utf8_to_end().unwrap(), "last words");
}

#[test]
fn closing_the_reader_fails_the_writer() {
	let (mut reader, mut writer) = pipe(1024);
	RawReader::close(&mut reader).unwrap();

	let mut source = Buffer::new();
	source.write_from_slice(b"nowhere to go");
	let result = writer.write(&mut source, 13);
	assert!(matches!(result, Err(Error::Closed)), "got {result:?}");
}

#[test]
fn reads_on_a_closed_reader_fail() {
	let (mut reader, _writer) = pipe(1024);
	RawReader::close(&mut reader).unwrap();
	let mut sink = Buffer::new();
	let result = reader.read_at_most_to(&mut sink, 1);
	assert!(matches!(result, Err(Error::Closed)), "got {result:?}");
}

#[test]
fn writes_on_a_closed_writer_fail() {
	let (_reader, mut writer) = pipe(1024);
	RawWriter::close(&mut writer).unwrap();
	let mut source = Buffer::new();
	source.write_from_slice(b"x");
	let result = writer.write(&mut source, 1);
	assert!(matches!(result, Err(Error::Closed)), "got {result:?}");
}

#[test]
fn writers_wake_parked_readers() {
	let (mut reader, mut writer) = pipe(64);
	let consumer = thread::spawn(move || {
		let mut sink = Buffer::new();
		let n = reader.read_at_most_to(&mut sink, 64).unwrap();
		(n, sink.read_utf8_to_end().unwrap())
	});
	thread::sleep(Duration::from_millis(50));
	let mut source = Buffer::new();
	source.write_from_slice(b"wake up");
	writer.write(&mut source, 7).unwrap();
	let (n, text) = consumer.join().unwrap();
	assert_eq!(n, Some(7));
	assert_eq!(text, "wake up");
}
