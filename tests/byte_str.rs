// SPDX-License-Identifier: Apache-2.0

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use pretty_assertions::assert_eq;
use jayo::{Ascii, Buffer, ByteString, Utf8, SEGMENT_SIZE};

/// Builds a segmented byte string spanning several blocks.
fn segmented(data: &[u8]) -> ByteString {
	let mut buf = Buffer::new();
	// Consume a prefix so the first chunk starts mid-block.
	buf.write_from_slice(b"padding");
	buf.write_from_slice(data);
	buf.skip(7).unwrap();
	buf.snapshot()
}

#[test]
fn hello_base64() {
	let bytes = ByteString::of(&[0x48, 0x65, 0x6C, 0x6C, 0x6F]);
	assert_eq!(bytes.base64(), "SGVsbG8=");
	assert_eq!(ByteString::decode_base64("SGVsbG8=").unwrap(), bytes);
	// Trailing whitespace and missing padding still decode.
	assert_eq!(ByteString::decode_base64("SGVsbG8 ").unwrap(), bytes);
	assert_eq!(ByteString::decode_base64("SGVsbG8").unwrap(), bytes);
	// Invalid characters decode to nothing at all.
	assert_eq!(ByteString::decode_base64("SGVsbG8*"), None);
}

#[test]
fn representations_compare_equal() {
	let data: Vec<u8> = (0..3 * SEGMENT_SIZE).map(|i| (i % 251) as u8).collect();
	let contiguous = ByteString::of(&data);
	let split = segmented(&data);
	assert_eq!(contiguous, split);
	assert_eq!(contiguous.cmp(&split), std::cmp::Ordering::Equal);

	let mut a = DefaultHasher::new();
	let mut b = DefaultHasher::new();
	contiguous.hash(&mut a);
	split.hash(&mut b);
	assert_eq!(a.finish(), b.finish());

	assert_eq!(split.base64(), contiguous.base64());
	assert_eq!(split.hex(), contiguous.hex());
}

#[test]
fn byte_at_uses_the_directory() {
	let data: Vec<u8> = (0..3 * SEGMENT_SIZE).map(|i| (i % 251) as u8).collect();
	let split = segmented(&data);
	for index in [0, 1, SEGMENT_SIZE - 1, SEGMENT_SIZE, 2 * SEGMENT_SIZE + 17, data.len() - 1] {
		assert_eq!(split.byte_at(index), data[index], "index {index}");
	}
	assert_eq!(split.get(data.len()), None);
}

#[test]
fn substring_and_affixes() {
	let bytes = ByteString::of(b"hello world");
	assert_eq!(bytes.substring(0, 5).to_vec(), b"hello");
	assert_eq!(bytes.substring(6, 11).to_vec(), b"world");
	assert_eq!(bytes.substring(0, bytes.len()), bytes);
	assert!(bytes.starts_with(b"hello"));
	assert!(!bytes.starts_with(b"world"));
	assert!(bytes.ends_with(b"world"));
	assert!(ByteString::empty().starts_with(b""));
}

#[test]
fn searches_cross_chunk_boundaries() {
	// The needle straddles the first chunk's end (the helper consumes a
	// 7-byte prefix, so the first chunk carries SEGMENT_SIZE - 7 bytes).
	let at = SEGMENT_SIZE - 10;
	let mut data = vec![b'.'; at];
	data.extend_from_slice(b"needle");
	data.extend_from_slice(&[b'.'; 64]);
	let split = segmented(&data);
	assert_eq!(split.index_of(b"needle", 0), Some(at));
	assert_eq!(split.index_of(b"needle", at + 1), None);
	assert_eq!(split.last_index_of(b"needle", split.len()), Some(at));
	assert_eq!(split.index_of(b"", 3), Some(3));
	assert_eq!(split.index_of(b"absent", 0), None);
}

#[test]
fn last_index_of_picks_the_latest() {
	let bytes = ByteString::of(b"abcabcabc");
	assert_eq!(bytes.last_index_of(b"abc", bytes.len()), Some(6));
	assert_eq!(bytes.last_index_of(b"abc", 5), Some(3));
	assert_eq!(bytes.last_index_of(b"abc", 0), Some(0));
}

#[test]
fn ascii_case_mapping() {
	let mixed = ByteString::of(b"Hello, World! 123");
	assert_eq!(mixed.to_ascii_lowercase().to_vec(), b"hello, world! 123");
	assert_eq!(mixed.to_ascii_uppercase().to_vec(), b"HELLO, WORLD! 123");
	let lower = ByteString::of(b"already lower 123");
	assert_eq!(lower.to_ascii_lowercase(), lower);
}

#[test]
fn string_decoding() {
	assert_eq!(ByteString::of(b"plain").decode_to_string(), "plain");
	assert_eq!(ByteString::of(&[0xFF, b'a']).decode_to_string(), "\u{FFFD}a");
	// ISO-8859-1 maps bytes straight to code points.
	assert_eq!(ByteString::of(&[0x63, 0x61, 0x66, 0xE9]).decode_latin1(), "café");
}

#[test]
fn utf8_refinement() {
	let text = Utf8::from_byte_string(ByteString::from("Café 🍩")).unwrap();
	assert_eq!(text.as_str(), "Café 🍩");
	assert_eq!(text.len(), 10);
	assert_eq!(text.len_utf16(), 7);

	assert!(Utf8::from_byte_string(ByteString::of(&[0xC3, 0x28])).is_err());

	// Validation sees sequences that straddle chunk boundaries.
	let mut buf = Buffer::new();
	buf.write_from_slice(&vec![b'x'; SEGMENT_SIZE - 1]);
	buf.write_utf8("é");
	let snapshot = buf.snapshot();
	let text = Utf8::from_byte_string(snapshot).unwrap();
	assert!(text.as_str().ends_with('é'));
}

#[test]
fn ascii_refinement() {
	let ascii = Ascii::try_from("plain text").unwrap();
	assert_eq!(ascii.as_str(), "plain text");
	assert_eq!(ascii.len_utf16(), ascii.len());
	assert!(Ascii::try_from("café").is_err());
}

#[test]
fn snapshot_of_an_empty_buffer() {
	let buf = Buffer::new();
	let snapshot = buf.snapshot();
	assert!(snapshot.is_empty());
	assert_eq!(snapshot, ByteString::empty());
}
