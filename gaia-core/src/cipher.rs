//! Content encryption for Gaia storage
//!
//! Implements the ephemeral-key ECIES scheme shared by all Gaia client
//! implementations so that ciphertexts written by one client decrypt in any
//! other:
//! - ephemeral secp256k1 key agreement with the recipient key
//! - SHA-512 of the shared x-coordinate, split into an AES-256-CBC key and
//!   an HMAC-SHA256 key
//! - MAC over `iv || ephemeralPK || cipherText || wasString`, verified
//!   before decryption
//!
//! Textual plaintext round-trips as UTF-8; binary plaintext is Base64-framed
//! before encryption, recorded in the MAC-covered `wasString` flag. A
//! receiver therefore rejects a flipped framing flag as an authentication
//! failure rather than re-interpreting the plaintext.

use crate::error::{GaiaError, Result};
use crate::keys::{parse_private_key, parse_public_key};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::ecdh::shared_secret_point;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// AES-CBC initialization vector size (16 bytes)
pub const IV_SIZE: usize = 16;

/// Wire/storage representation of encrypted content.
///
/// Field names are a compatibility contract with every other implementation
/// sharing the same storage; do not rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherObject {
    /// AES-CBC IV, hex
    pub iv: String,
    /// Compressed ephemeral public key, hex
    #[serde(rename = "ephemeralPK")]
    pub ephemeral_pk: String,
    /// Ciphertext, hex
    #[serde(rename = "cipherText")]
    pub cipher_text: String,
    /// HMAC-SHA256 over iv || ephemeralPK || cipherText || wasString, hex
    pub mac: String,
    /// Whether the plaintext was textual (UTF-8) or binary (Base64-framed)
    #[serde(rename = "wasString")]
    pub was_string: bool,
}

impl CipherObject {
    /// Parse a cipher object from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|_| decryption_error())
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Plaintext with its text/binary framing preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlainContent {
    Text(String),
    Binary(Vec<u8>),
}

impl PlainContent {
    /// Raw bytes regardless of framing.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PlainContent::Text(text) => text.as_bytes(),
            PlainContent::Binary(bytes) => bytes,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, PlainContent::Text(_))
    }
}

/// Encrypt content to a recipient public key.
pub fn encrypt_content(plain: &PlainContent, public_key_hex: &str) -> Result<CipherObject> {
    let secp = Secp256k1::new();
    let recipient = parse_public_key(public_key_hex)
        .map_err(|e| GaiaError::Encryption(format!("recipient key rejected: {}", e)))?;

    let ephemeral_secret = SecretKey::new(&mut OsRng);
    let ephemeral_public = PublicKey::from_secret_key(&secp, &ephemeral_secret);

    let (cipher_key, mac_key) = derive_shared_keys(&recipient, &ephemeral_secret);

    let framed = match plain {
        PlainContent::Text(text) => text.as_bytes().to_vec(),
        PlainContent::Binary(bytes) => BASE64_STANDARD.encode(bytes).into_bytes(),
    };

    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);

    let cipher_text = Aes256CbcEnc::new_from_slices(&cipher_key, &iv)
        .map_err(|e| GaiaError::Encryption(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(&framed);

    let ephemeral_bytes = ephemeral_public.serialize();
    let was_string = plain.is_text();
    let mac = compute_mac(&mac_key, &iv, &ephemeral_bytes, &cipher_text, was_string)?;

    Ok(CipherObject {
        iv: hex::encode(iv),
        ephemeral_pk: hex::encode(ephemeral_bytes),
        cipher_text: hex::encode(cipher_text),
        mac: hex::encode(mac),
        was_string,
    })
}

/// Decrypt a cipher object with the recipient's private key.
///
/// The MAC is verified (constant-time) before any decryption. All failures —
/// wrong key, tampered ciphertext, malformed object — surface as the same
/// `Decryption` error.
pub fn decrypt_content(cipher: &CipherObject, private_key_hex: &str) -> Result<PlainContent> {
    let secret = parse_private_key(private_key_hex).map_err(|_| decryption_error())?;

    let iv = decode_field(&cipher.iv)?;
    if iv.len() != IV_SIZE {
        return Err(decryption_error());
    }
    let ephemeral_bytes = decode_field(&cipher.ephemeral_pk)?;
    let cipher_text = decode_field(&cipher.cipher_text)?;
    let expected_mac = decode_field(&cipher.mac)?;

    let ephemeral_public = PublicKey::from_slice(&ephemeral_bytes).map_err(|_| decryption_error())?;
    let (cipher_key, mac_key) = derive_shared_keys(&ephemeral_public, &secret);

    let mut mac = HmacSha256::new_from_slice(&mac_key).map_err(|_| decryption_error())?;
    mac.update(&iv);
    mac.update(&ephemeral_bytes);
    mac.update(&cipher_text);
    mac.update(&[cipher.was_string as u8]);
    mac.verify_slice(&expected_mac).map_err(|_| decryption_error())?;

    let framed = Aes256CbcDec::new_from_slices(&cipher_key, &iv)
        .map_err(|_| decryption_error())?
        .decrypt_padded_vec_mut::<Pkcs7>(&cipher_text)
        .map_err(|_| decryption_error())?;

    if cipher.was_string {
        String::from_utf8(framed)
            .map(PlainContent::Text)
            .map_err(|_| decryption_error())
    } else {
        BASE64_STANDARD
            .decode(framed)
            .map(PlainContent::Binary)
            .map_err(|_| decryption_error())
    }
}

/// ECDH, then SHA-512 of the shared x-coordinate: first half is the AES key,
/// second half the MAC key.
fn derive_shared_keys(public: &PublicKey, secret: &SecretKey) -> ([u8; 32], [u8; 32]) {
    let point = shared_secret_point(public, secret);
    let digest = Sha512::digest(&point[..32]);

    let mut cipher_key = [0u8; 32];
    let mut mac_key = [0u8; 32];
    cipher_key.copy_from_slice(&digest[..32]);
    mac_key.copy_from_slice(&digest[32..]);
    (cipher_key, mac_key)
}

fn compute_mac(
    mac_key: &[u8; 32],
    iv: &[u8],
    ephemeral_bytes: &[u8],
    cipher_text: &[u8],
    was_string: bool,
) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(mac_key)
        .map_err(|e| GaiaError::Encryption(e.to_string()))?;
    mac.update(iv);
    mac.update(ephemeral_bytes);
    mac.update(cipher_text);
    mac.update(&[was_string as u8]);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn decode_field(field_hex: &str) -> Result<Vec<u8>> {
    hex::decode(field_hex).map_err(|_| decryption_error())
}

// One deliberately coarse message: distinguishing MAC failure from wrong-key
// or framing failure would give attackers an oracle.
fn decryption_error() -> GaiaError {
    GaiaError::Decryption("failed to decrypt content".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::public_key_hex;

    const KEY: &str = "a5c40c6fb06b068d308b9b88ca18b5bc923450d99f8e3eee1c1ca9ac7ea75db8";
    const OTHER_KEY: &str = "9a770b5a1f4b4aa6a127dd55bd3e573a2e1e6a9561e04b311fe93e0cf5c56cf1";

    fn recipient() -> String {
        public_key_hex(KEY).unwrap()
    }

    #[test]
    fn test_text_roundtrip() {
        let plain = PlainContent::Text("hello gaia".to_string());
        let cipher = encrypt_content(&plain, &recipient()).unwrap();
        assert!(cipher.was_string);

        let decrypted = decrypt_content(&cipher, KEY).unwrap();
        assert_eq!(decrypted, plain);
    }

    #[test]
    fn test_binary_roundtrip() {
        let plain = PlainContent::Binary(vec![0u8, 1, 2, 255, 128, 7]);
        let cipher = encrypt_content(&plain, &recipient()).unwrap();
        assert!(!cipher.was_string);

        let decrypted = decrypt_content(&cipher, KEY).unwrap();
        assert_eq!(decrypted, plain);
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let plain = PlainContent::Text(String::new());
        let cipher = encrypt_content(&plain, &recipient()).unwrap();
        assert_eq!(decrypt_content(&cipher, KEY).unwrap(), plain);
    }

    #[test]
    fn test_large_payload_roundtrip() {
        // > 1 MiB
        let plain = PlainContent::Binary((0..2 * 1024 * 1024).map(|i| (i % 251) as u8).collect());
        let cipher = encrypt_content(&plain, &recipient()).unwrap();
        assert_eq!(decrypt_content(&cipher, KEY).unwrap(), plain);
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher =
            encrypt_content(&PlainContent::Text("secret".to_string()), &recipient()).unwrap();
        assert!(matches!(
            decrypt_content(&cipher, OTHER_KEY),
            Err(GaiaError::Decryption(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut cipher =
            encrypt_content(&PlainContent::Text("secret".to_string()), &recipient()).unwrap();
        let mut bytes = hex::decode(&cipher.cipher_text).unwrap();
        bytes[0] ^= 0xff;
        cipher.cipher_text = hex::encode(bytes);

        assert!(matches!(
            decrypt_content(&cipher, KEY),
            Err(GaiaError::Decryption(_))
        ));
    }

    #[test]
    fn test_tampered_mac_fails() {
        let mut cipher =
            encrypt_content(&PlainContent::Text("secret".to_string()), &recipient()).unwrap();
        let mut bytes = hex::decode(&cipher.mac).unwrap();
        bytes[4] ^= 0x01;
        cipher.mac = hex::encode(bytes);

        assert!(decrypt_content(&cipher, KEY).is_err());
    }

    #[test]
    fn test_flipped_framing_flag_fails_authentication() {
        // wasString is covered by the MAC: flipping it is an authentication
        // failure, never a silently reinterpreted plaintext
        let mut cipher =
            encrypt_content(&PlainContent::Binary(vec![0xff, 0xfe]), &recipient()).unwrap();
        cipher.was_string = true;
        assert!(matches!(
            decrypt_content(&cipher, KEY),
            Err(GaiaError::Decryption(_))
        ));
    }

    #[test]
    fn test_wire_field_names() {
        let cipher =
            encrypt_content(&PlainContent::Text("x".to_string()), &recipient()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&cipher.to_json().unwrap()).unwrap();
        for field in ["iv", "ephemeralPK", "cipherText", "mac", "wasString"] {
            assert!(json.get(field).is_some(), "missing wire field {field}");
        }
    }

    #[test]
    fn test_malformed_object_fails() {
        let cipher = CipherObject {
            iv: "zz".to_string(),
            ephemeral_pk: "02".to_string(),
            cipher_text: String::new(),
            mac: String::new(),
            was_string: true,
        };
        assert!(matches!(
            decrypt_content(&cipher, KEY),
            Err(GaiaError::Decryption(_))
        ));
    }
}
