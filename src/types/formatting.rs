//! Checksummed textual encoding for keys, signatures, and block ids.
//!
//! Raw bytes are suffixed with the last four bytes of their SHA3-256 digest
//! and rendered in base-58. Decoding verifies the checksum, so a corrupted
//! or truncated string is always a recoverable error.

use sha3::{Digest, Sha3_256};
use thiserror::Error;

/// Number of trailing checksum bytes appended before encoding.
pub const CHECKSUM_LEN: usize = 4;

/// Errors produced while decoding checksummed text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("text is not valid base-58")]
    InvalidCharacter,

    #[error("decoded data is shorter than the {CHECKSUM_LEN}-byte checksum")]
    TooShort,

    #[error("checksum mismatch")]
    BadChecksum,
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest: [u8; 32] = Sha3_256::digest(data).into();
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[32 - CHECKSUM_LEN..]);
    out
}

/// Encodes `data` with a trailing 4-byte checksum.
pub fn encode(data: &[u8]) -> String {
    let mut buf = Vec::with_capacity(data.len() + CHECKSUM_LEN);
    buf.extend_from_slice(data);
    buf.extend_from_slice(&checksum(data));
    bs58::encode(buf).into_string()
}

/// Decodes checksummed text back into the raw bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, FormatError> {
    let decoded = bs58::decode(text)
        .into_vec()
        .map_err(|_| FormatError::InvalidCharacter)?;

    if decoded.len() < CHECKSUM_LEN {
        return Err(FormatError::TooShort);
    }

    let (data, suffix) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
    if suffix != checksum(data) {
        return Err(FormatError::BadChecksum);
    }

    Ok(data.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let data = b"some ledger bytes";
        let text = encode(data);
        assert_eq!(decode(&text).unwrap(), data);
    }

    #[test]
    fn roundtrip_empty() {
        let text = encode(b"");
        assert_eq!(decode(&text).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert_eq!(decode("not base58 0OIl"), Err(FormatError::InvalidCharacter));
    }

    #[test]
    fn rejects_truncated_text() {
        // A single base-58 digit decodes to fewer bytes than the checksum.
        assert_eq!(decode("2"), Err(FormatError::TooShort));
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let text = encode(b"payload");
        let mut chars: Vec<char> = text.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '2' { '3' } else { '2' };
        let tampered: String = chars.into_iter().collect();
        assert!(matches!(
            decode(&tampered),
            Err(FormatError::BadChecksum) | Err(FormatError::InvalidCharacter)
        ));
    }

    #[test]
    fn different_data_different_text() {
        assert_ne!(encode(b"a"), encode(b"b"));
    }
}
