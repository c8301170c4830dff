// SPDX-License-Identifier: Apache-2.0

//! Base64 and hex transcoding for byte strings.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurposeConfig;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use base64::Engine;
use crate::{Error, Result};
use super::ByteString;

const CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
	.with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, CONFIG);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, CONFIG);

impl ByteString {
	/// Encodes into RFC 4648 base64, padded.
	pub fn base64(&self) -> String {
		STANDARD.encode(&*self.contiguous())
	}

	/// Encodes into the RFC 4648 URL-safe base64 alphabet, padded.
	pub fn base64_url(&self) -> String {
		URL_SAFE.encode(&*self.contiguous())
	}

	/// Encodes into lowercase hex.
	pub fn hex(&self) -> String {
		base16ct::lower::encode_string(&self.contiguous())
	}

	/// Decodes base64 in either the standard or URL-safe alphabet, ignoring
	/// ASCII whitespace and tolerating absent padding. Returns `None` when
	/// any other invalid character appears.
	pub fn decode_base64(input: &str) -> Option<ByteString> {
		let cleaned: Vec<u8> = input
			.bytes()
			.filter(|byte| !byte.is_ascii_whitespace())
			.collect();
		STANDARD.decode(&cleaned)
			.or_else(|_| URL_SAFE.decode(&cleaned))
			.ok()
			.map(ByteString::from)
	}

	/// Decodes hex, accepting either case. Fails with a protocol error on a
	/// non-hex character or an odd number of digits.
	pub fn decode_hex(input: &str) -> Result<ByteString> {
		base16ct::mixed::decode_vec(input)
			.map(ByteString::from)
			.map_err(|e| Error::protocol(format!("malformed hex input: {e}")))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn base64_known_vectors() {
		assert_eq!(ByteString::of(b"").base64(), "");
		assert_eq!(ByteString::of(b"f").base64(), "Zg==");
		assert_eq!(ByteString::of(b"fo").base64(), "Zm8=");
		assert_eq!(ByteString::of(b"foo").base64(), "Zm9v");
	}

	#[test]
	fn base64_url_replaces_specials() {
		let bytes = ByteString::of(&[0xFB, 0xEF, 0xFF]);
		assert_eq!(bytes.base64(), "++//");
		assert_eq!(bytes.base64_url(), "--__");
	}

	#[test]
	fn decode_tolerates_whitespace_and_no_padding() {
		let expected = ByteString::of(b"fo");
		assert_eq!(ByteString::decode_base64("Zm8=").as_ref(), Some(&expected));
		assert_eq!(ByteString::decode_base64("Zm8").as_ref(), Some(&expected));
		assert_eq!(ByteString::decode_base64(" Z\tm\r\n8 ").as_ref(), Some(&expected));
	}

	#[test]
	fn decode_rejects_invalid_characters() {
		assert_eq!(ByteString::decode_base64("Zm8!"), None);
		assert_eq!(ByteString::decode_base64("%%%%"), None);
	}

	#[test]
	fn hex_round_trip() {
		let bytes = ByteString::of(&[0x00, 0x7F, 0xA5, 0xFF]);
		assert_eq!(bytes.hex(), "007fa5ff");
		assert_eq!(ByteString::decode_hex("007fa5ff").unwrap(), bytes);
		assert_eq!(ByteString::decode_hex("007FA5FF").unwrap(), bytes);
		assert!(ByteString::decode_hex("007").is_err());
		assert!(ByteString::decode_hex("zz").is_err());
	}
}
