//! Base58Check address derivation
//!
//! A Gaia bucket is addressed by the Bitcoin-style P2PKH address of its
//! owner's public key: SHA-256, then RIPEMD-160, a version byte, a 4-byte
//! double-SHA-256 checksum, Base58-encoded.

use crate::error::Result;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Version prefix for mainnet P2PKH addresses
pub const VERSION_BYTE_P2PKH: u8 = 0x00;

/// Derive the Base58Check address for a public key given as hex.
///
/// Pure function of the key bytes; the only failure path is malformed hex.
pub fn address_from_public_key(public_key_hex: &str) -> Result<String> {
    let key_bytes = hex::decode(public_key_hex)?;

    let sha = Sha256::digest(&key_bytes);
    let hash160 = Ripemd160::digest(sha);

    let mut payload = Vec::with_capacity(25);
    payload.push(VERSION_BYTE_P2PKH);
    payload.extend_from_slice(&hash160);

    let checksum = checksum(&payload);
    payload.extend_from_slice(&checksum);

    Ok(bs58::encode(payload).into_string())
}

/// First 4 bytes of SHA-256(SHA-256(payload)).
fn checksum(payload: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(payload));
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known pair: the compressed public key for secret exponent
    // 0x18e14a7b...527 and its documented P2PKH address.
    const KNOWN_PUB: &str = "0250863ad64a87ae8a2fe83c1af1a8403cb53f53e486d8511dad8a04887e5b2352";
    const KNOWN_ADDRESS: &str = "1PMycacnJaSqwwJqjawXBErnLsZ7RkXUAs";

    #[test]
    fn test_known_vector() {
        assert_eq!(address_from_public_key(KNOWN_PUB).unwrap(), KNOWN_ADDRESS);
    }

    #[test]
    fn test_deterministic() {
        let a = address_from_public_key(KNOWN_PUB).unwrap();
        let b = address_from_public_key(KNOWN_PUB).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_checksum_verifies() {
        let address = address_from_public_key(KNOWN_PUB).unwrap();
        let decoded = bs58::decode(address).into_vec().unwrap();
        assert_eq!(decoded.len(), 25);
        assert_eq!(decoded[0], VERSION_BYTE_P2PKH);

        let expected = checksum(&decoded[..21]);
        assert_eq!(&decoded[21..], &expected);
    }

    #[test]
    fn test_malformed_hex_rejected() {
        assert!(address_from_public_key("not-hex").is_err());
    }
}
