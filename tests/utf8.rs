// SPDX-License-Identifier: Apache-2.0

use pretty_assertions::assert_eq;
use jayo::{Buffer, Error, Utf8};

#[test]
fn cafe_donut_is_ten_bytes() {
	let text = "Café 🍩";
	let mut buf = Buffer::new();
	buf.write_utf8(text);
	assert_eq!(buf.size(), 10);
	assert_eq!(Utf8::size_of(text), 10);
	let mut bytes = [0; 10];
	let snapshot = buf.snapshot();
	assert_eq!(
		snapshot.to_vec(),
		[0x43, 0x61, 0x66, 0xC3, 0xA9, 0x20, 0xF0, 0x9F, 0x8D, 0xA9],
	);
	buf.read_into_slice_exact(&mut bytes).unwrap();
	assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), text);
}

#[test]
fn utf8_reads_round_trip() {
	let text = "The Answer to the Ultimate Question of Life is 42";
	let mut buf = Buffer::new();
	buf.write_utf8(text);
	assert_eq!(buf.read_utf8(text.len()).unwrap(), text);
	assert!(buf.is_empty());
}

#[test]
fn every_code_point_round_trips() {
	let mut buf = Buffer::new();
	for code_point in (0..=0x10_FFFFu32).filter(|cp| !(0xD800..=0xDFFF).contains(cp)) {
		buf.write_utf8_code_point(code_point);
		assert_eq!(
			buf.read_utf8_code_point().unwrap() as u32,
			code_point,
			"code point {code_point:#X}",
		);
	}
	assert!(buf.is_empty());
}

#[test]
fn unencodable_code_points_become_question_marks() {
	let mut buf = Buffer::new();
	buf.write_utf8_code_point(0xD800);
	buf.write_utf8_code_point(0xDFFF);
	buf.write_utf8_code_point(0x11_0000);
	assert_eq!(buf.read_utf8_to_end().unwrap(), "???");
}

#[test]
fn utf16_units_with_unpaired_surrogates() {
	let text = "Café 🍩";
	let units: Vec<u16> = text.encode_utf16().collect();
	assert_eq!(Utf8::size_of_utf16(&units), 10);
	let mut buf = Buffer::new();
	buf.write_utf16(&units);
	assert_eq!(buf.read_utf8(10).unwrap(), text);

	// A lone high surrogate maps to '?' and stays stable on a second pass.
	let broken = [0x0041, 0xD800, 0x0042];
	let mut buf = Buffer::new();
	buf.write_utf16(&broken);
	let decoded = buf.read_utf8_to_end().unwrap();
	assert_eq!(decoded, "A?B");
	let mut buf = Buffer::new();
	buf.write_utf16(&decoded.encode_utf16().collect::<Vec<u16>>());
	assert_eq!(buf.read_utf8_to_end().unwrap(), "A?B");
}

#[test]
fn malformed_sequences_decode_to_replacements() {
	// (input, code points consumed one byte at a time)
	let cases: &[(&[u8], usize)] = &[
		(&[0x80], 1),                   // unexpected continuation byte
		(&[0xC0, 0x80], 2),             // overlong two-byte NUL
		(&[0xE0, 0x80, 0x80], 3),       // overlong three-byte form
		(&[0xED, 0xA0, 0x80], 3),       // encoded surrogate U+D800
		(&[0xF4, 0x90, 0x80, 0x80], 4), // above U+10FFFF
		(&[0xE2, 0x28, 0xA1], 3),       // interrupted sequence
	];
	for &(input, _) in cases {
		let mut buf = Buffer::new();
		buf.write_from_slice(input);
		// The first read consumes exactly one byte.
		assert_eq!(buf.read_utf8_code_point().unwrap(), '\u{FFFD}', "input {input:02X?}");
		assert_eq!(buf.size(), input.len() - 1, "input {input:02X?}");
	}
}

#[test]
fn truncated_sequence_yields_a_replacement() {
	let mut buf = Buffer::new();
	buf.write_from_slice(&[0xF0, 0x9F]);
	assert_eq!(buf.read_utf8_code_point().unwrap(), '\u{FFFD}');
	assert_eq!(buf.size(), 1);
}

#[test]
fn code_point_read_at_end_of_buffer() {
	let mut buf = Buffer::new();
	assert!(matches!(buf.read_utf8_code_point(), Err(Error::EndOfInput)));
}

#[test]
fn lines_split_on_lf_and_crlf() {
	let mut buf = Buffer::new();
	buf.write_utf8("hello\r\nworld\nend");
	assert_eq!(buf.read_utf8_line_strict(usize::MAX).unwrap(), "hello");
	assert_eq!(buf.read_utf8_line().unwrap(), Some("world".to_owned()));
	assert_eq!(buf.read_utf8_line().unwrap(), Some("end".to_owned()));
	assert_eq!(buf.read_utf8_line().unwrap(), None);
}

#[test]
fn lone_trailing_cr_stays_in_the_line() {
	let mut buf = Buffer::new();
	buf.write_utf8("abc\r");
	assert_eq!(buf.read_utf8_line().unwrap(), Some("abc\r".to_owned()));
	assert_eq!(buf.read_utf8_line().unwrap(), None);
}

#[test]
fn carriage_return_inside_a_line_is_content() {
	let mut buf = Buffer::new();
	buf.write_utf8("a\rb\n");
	assert_eq!(buf.read_utf8_line().unwrap(), Some("a\rb".to_owned()));
}

#[test]
fn strict_lines_fail_without_a_delimiter() {
	let mut buf = Buffer::new();
	buf.write_utf8("no newline here");
	assert!(matches!(
		buf.read_utf8_line_strict(usize::MAX),
		Err(Error::EndOfInput),
	));
	// The content is still there for a lenient read.
	assert_eq!(buf.read_utf8_line().unwrap(), Some("no newline here".to_owned()));
}

#[test]
fn strict_lines_respect_the_limit() {
	let mut buf = Buffer::new();
	buf.write_utf8("123456\n");
	assert!(matches!(buf.read_utf8_line_strict(3), Err(Error::EndOfInput)));
	assert_eq!(buf.read_utf8_line_strict(6).unwrap(), "123456");

	// A '\r\n' straddling the limit still counts as a delimiter.
	let mut buf = Buffer::new();
	buf.write_utf8("123\r\nrest");
	assert_eq!(buf.read_utf8_line_strict(3).unwrap(), "123");
	assert_eq!(buf.read_utf8_to_end().unwrap(), "rest");
}

#[test]
fn lenient_reads_replace_malformed_bytes() {
	let mut buf = Buffer::new();
	buf.write_from_slice(b"ok \xFF\xFE ok");
	let text = buf.read_utf8_to_end().unwrap();
	assert_eq!(text, "ok \u{FFFD}\u{FFFD} ok");
}
