// SPDX-License-Identifier: Apache-2.0

use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};
use jayo::{cancel, pipe, Buffer, Error, RawReader, RawWriter};

#[test]
fn timeout_aborts_a_starved_pipe_read() {
	let (mut reader, _writer) = pipe(64);
	let started = Instant::now();
	let result = cancel::with_timeout(Duration::from_millis(50), |_| {
		let mut sink = Buffer::new();
		reader.read_at_most_to(&mut sink, 1)
	});
	assert!(matches!(result, Err(Error::Timeout)), "got {result:?}");
	let elapsed = started.elapsed();
	assert!(elapsed >= Duration::from_millis(50), "returned early: {elapsed:?}");
	assert!(elapsed < Duration::from_millis(500), "returned late: {elapsed:?}");
}

#[test]
fn timeout_aborts_a_full_pipe_write() {
	let (_reader, mut writer) = pipe(16);
	let mut source = Buffer::new();
	source.write_from_slice(&[0u8; 64]);
	let result = cancel::with_timeout(Duration::from_millis(50), |_| {
		writer.write(&mut source, 64)
	});
	assert!(matches!(result, Err(Error::Timeout)), "got {result:?}");
}

#[test]
fn cancel_is_seen_across_threads() {
	let (mut reader, _writer) = pipe(64);
	cancel::scope(|scope| {
		let token = scope.token().clone();
		let blocked = thread::spawn(move || {
			token.attach(|| {
				let mut sink = Buffer::new();
				reader.read_at_most_to(&mut sink, 1)
			})
		});
		thread::sleep(Duration::from_millis(50));
		scope.cancel();
		let result = blocked.join().unwrap();
		assert!(matches!(result, Err(Error::Interrupted)), "got {result:?}");
	});
}

#[test]
fn cancelled_scopes_fail_fast_on_entry() {
	let (mut reader, _writer) = pipe(64);
	cancel::scope(|scope| {
		scope.cancel();
		let mut sink = Buffer::new();
		let result = reader.read_at_most_to(&mut sink, 1);
		assert!(matches!(result, Err(Error::Interrupted)), "got {result:?}");
	});
}

#[test]
fn deadline_closes_a_blocked_socket() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let address = listener.local_addr().unwrap();
	let client = TcpStream::connect(address).unwrap();
	let (server, _) = listener.accept().unwrap();

	let (mut reader, _writer) = jayo::socket_streams(client);
	let started = Instant::now();
	let result = cancel::with_timeout(Duration::from_millis(50), |_| {
		// The peer never writes; only the watchdog can end this read.
		let mut sink = Buffer::new();
		reader.read_at_most_to(&mut sink, 1)
	});
	assert!(matches!(result, Err(Error::Timeout)), "got {result:?}");
	assert!(started.elapsed() < Duration::from_millis(500));
	drop(server);
}

#[test]
fn attached_tokens_carry_the_deadline() {
	cancel::with_timeout(Duration::from_secs(60), |scope| {
		let deadline = scope.token().deadline().unwrap();
		let token = scope.token().clone();
		let observed = thread::spawn(move || {
			token.attach(|| cancel::CancelToken::current().and_then(|t| t.deadline()))
		});
		assert_eq!(observed.join().unwrap(), Some(deadline));
	});
}

#[test]
fn interruptions_are_a_family() {
	assert!(Error::Timeout.is_interruption());
	assert!(Error::Interrupted.is_interruption());
	assert!(!Error::EndOfInput.is_interruption());
}
