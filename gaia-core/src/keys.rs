//! secp256k1 key parsing helpers
//!
//! All identity in the Gaia protocol derives from a secp256k1 private key
//! supplied by the caller as a hex string. Keys are never persisted here.

use crate::error::{GaiaError, Result};
use secp256k1::{PublicKey, Secp256k1, SecretKey};

/// Length of a bare private key scalar in hex characters
const PRIVATE_KEY_HEX_LEN: usize = 64;

/// Length of a private key carrying the trailing `01` compressed-key marker
const PRIVATE_KEY_COMPRESSED_HEX_LEN: usize = 66;

/// Parse a private key from hex.
///
/// Accepts the bare 32-byte scalar (64 hex chars) and the 33-byte form with a
/// trailing `01` marker (66 hex chars) that other implementations of the
/// protocol emit for compressed-key derivation.
pub fn parse_private_key(private_key_hex: &str) -> Result<SecretKey> {
    let scalar_hex = match private_key_hex.len() {
        PRIVATE_KEY_HEX_LEN => private_key_hex,
        PRIVATE_KEY_COMPRESSED_HEX_LEN if private_key_hex.ends_with("01") => {
            &private_key_hex[..PRIVATE_KEY_HEX_LEN]
        }
        other => {
            return Err(GaiaError::InvalidEncoding(format!(
                "private key must be 64 or 66 hex chars, got {}",
                other
            )))
        }
    };

    let bytes = hex::decode(scalar_hex)?;
    SecretKey::from_slice(&bytes)
        .map_err(|e| GaiaError::InvalidEncoding(format!("invalid private key: {}", e)))
}

/// Parse a compressed or uncompressed public key from hex.
pub fn parse_public_key(public_key_hex: &str) -> Result<PublicKey> {
    let bytes = hex::decode(public_key_hex)?;
    PublicKey::from_slice(&bytes)
        .map_err(|e| GaiaError::InvalidEncoding(format!("invalid public key: {}", e)))
}

/// Derive the compressed public key (33 bytes, hex) for a private key.
pub fn public_key_hex(private_key_hex: &str) -> Result<String> {
    let secp = Secp256k1::new();
    let secret = parse_private_key(private_key_hex)?;
    let public = PublicKey::from_secret_key(&secp, &secret);
    Ok(hex::encode(public.serialize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // secp256k1 generator point: private key 1
    const ONE_KEY: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    const ONE_PUB: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn test_public_key_derivation() {
        assert_eq!(public_key_hex(ONE_KEY).unwrap(), ONE_PUB);
    }

    #[test]
    fn test_compressed_marker_accepted() {
        let marked = format!("{}01", ONE_KEY);
        assert_eq!(public_key_hex(&marked).unwrap(), ONE_PUB);
    }

    #[test]
    fn test_bad_length_rejected() {
        assert!(matches!(
            parse_private_key("abcd"),
            Err(GaiaError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_bad_hex_rejected() {
        let bad = "zz".repeat(32);
        assert!(parse_private_key(&bad).is_err());
    }

    #[test]
    fn test_zero_scalar_rejected() {
        let zero = "00".repeat(32);
        assert!(parse_private_key(&zero).is_err());
    }
}
