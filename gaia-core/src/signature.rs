//! ECDSA signing and strict-DER signature encoding
//!
//! Signatures produced here must interoperate with verifiers expecting
//! canonical low-S DER, so the encoder follows the DER rules exactly:
//! integers are minimal-length, a zero byte is prepended only when the high
//! bit would flip the sign, and long-form lengths carry no leading zero
//! octets.

use crate::error::{GaiaError, Result};
use crate::keys::{parse_private_key, parse_public_key};
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Output of a signing operation.
///
/// The public key is always derivable from the signing key and is included
/// for verification convenience. Field names are a wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureObject {
    /// DER-encoded signature, hex
    pub signature: String,
    /// Compressed public key of the signer, hex
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// Encode an (r, s) signature pair as strict DER, returned as hex.
pub fn to_der(r: &[u8], s: &[u8]) -> String {
    let r = minimal_integer(r);
    let s = minimal_integer(s);

    let mut body = Vec::with_capacity(r.len() + s.len() + 8);
    push_integer(&mut body, &r);
    push_integer(&mut body, &s);

    let mut out = Vec::with_capacity(body.len() + 4);
    out.push(0x30);
    push_length(&mut out, body.len());
    out.extend_from_slice(&body);

    hex::encode(out)
}

/// Decode a strict-DER signature (hex) back into its (r, s) pair.
///
/// Rejects trailing bytes, non-minimal lengths and non-minimal integers with
/// `InvalidEncoding`. The returned integers are minimal (no sign padding).
pub fn parse_der(der_hex: &str) -> Result<(Vec<u8>, Vec<u8>)> {
    let bytes = hex::decode(der_hex)?;
    let mut pos = 0usize;

    expect_byte(&bytes, &mut pos, 0x30)?;
    let seq_len = read_length(&bytes, &mut pos)?;
    if pos + seq_len != bytes.len() {
        return Err(GaiaError::InvalidEncoding(
            "DER sequence length does not match input".to_string(),
        ));
    }

    let r = read_integer(&bytes, &mut pos)?;
    let s = read_integer(&bytes, &mut pos)?;

    if pos != bytes.len() {
        return Err(GaiaError::InvalidEncoding(
            "trailing bytes after DER signature".to_string(),
        ));
    }

    Ok((r, s))
}

/// Sign `content` with the given private key.
///
/// The content is hashed with SHA-256 and signed with canonical (low-S)
/// ECDSA over secp256k1.
pub fn sign_content(content: &[u8], private_key_hex: &str) -> Result<SignatureObject> {
    let secp = Secp256k1::new();
    let secret = parse_private_key(private_key_hex)?;

    let signature = sign_digest(&secp, &secret, content);
    let compact = signature.serialize_compact();

    let public = PublicKey::from_secret_key(&secp, &secret);
    Ok(SignatureObject {
        signature: to_der(&compact[..32], &compact[32..]),
        public_key: hex::encode(public.serialize()),
    })
}

/// Verify a `SignatureObject` against `content`.
///
/// Returns `Ok(false)` for a well-formed signature that does not match;
/// malformed signature or key material is an `InvalidEncoding` error.
pub fn verify_content(content: &[u8], signature: &SignatureObject) -> Result<bool> {
    let secp = Secp256k1::new();
    let public = parse_public_key(&signature.public_key)?;

    let (r, s) = parse_der(&signature.signature)?;
    let compact = compact_from_pair(&r, &s)?;
    let sig = Signature::from_compact(&compact)
        .map_err(|e| GaiaError::InvalidEncoding(format!("invalid signature: {}", e)))?;

    let message = digest_message(content);
    Ok(secp.verify_ecdsa(&message, &sig, &public).is_ok())
}

fn sign_digest(secp: &Secp256k1<secp256k1::All>, secret: &SecretKey, content: &[u8]) -> Signature {
    secp.sign_ecdsa(&digest_message(content), secret)
}

fn digest_message(content: &[u8]) -> Message {
    let digest: [u8; 32] = Sha256::digest(content).into();
    Message::from_digest(digest)
}

/// Reduce an unsigned big-endian integer to its minimal DER form:
/// strip redundant leading zeros (stopping where stripping would flip the
/// sign), then prepend a zero byte if the high bit is set.
fn minimal_integer(bytes: &[u8]) -> Vec<u8> {
    let mut start = 0;
    while start + 1 < bytes.len() && bytes[start] == 0 && bytes[start + 1] & 0x80 == 0 {
        start += 1;
    }
    let mut out = if bytes.is_empty() {
        vec![0]
    } else {
        bytes[start..].to_vec()
    };
    // A leading zero kept above is already the sign pad
    if out[0] & 0x80 != 0 {
        out.insert(0, 0);
    }
    out
}

fn push_integer(out: &mut Vec<u8>, int: &[u8]) {
    out.push(0x02);
    push_length(out, int.len());
    out.extend_from_slice(int);
}

/// DER length: short form below 128, otherwise `0x80 | n` followed by the
/// n big-endian length octets with no leading zero.
fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let be = len.to_be_bytes();
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
    out.push(0x80 | (be.len() - first) as u8);
    out.extend_from_slice(&be[first..]);
}

fn expect_byte(bytes: &[u8], pos: &mut usize, expected: u8) -> Result<()> {
    match bytes.get(*pos) {
        Some(b) if *b == expected => {
            *pos += 1;
            Ok(())
        }
        Some(b) => Err(GaiaError::InvalidEncoding(format!(
            "expected DER tag {:#04x}, found {:#04x}",
            expected, b
        ))),
        None => Err(GaiaError::InvalidEncoding(
            "truncated DER signature".to_string(),
        )),
    }
}

fn read_length(bytes: &[u8], pos: &mut usize) -> Result<usize> {
    let first = *bytes
        .get(*pos)
        .ok_or_else(|| GaiaError::InvalidEncoding("truncated DER length".to_string()))?;
    *pos += 1;

    if first & 0x80 == 0 {
        return Ok(first as usize);
    }

    let octets = (first & 0x7f) as usize;
    if octets == 0 || octets > std::mem::size_of::<usize>() {
        return Err(GaiaError::InvalidEncoding(
            "unsupported DER length form".to_string(),
        ));
    }
    if bytes.len() < *pos + octets {
        return Err(GaiaError::InvalidEncoding("truncated DER length".to_string()));
    }

    let mut value = 0usize;
    for _ in 0..octets {
        value = (value << 8) | bytes[*pos] as usize;
        *pos += 1;
    }
    // Long form must be minimal: no leading zero octet, and not representable short
    if value < 0x80 || bytes[*pos - octets] == 0 {
        return Err(GaiaError::InvalidEncoding(
            "non-minimal DER length".to_string(),
        ));
    }
    Ok(value)
}

fn read_integer(bytes: &[u8], pos: &mut usize) -> Result<Vec<u8>> {
    expect_byte(bytes, pos, 0x02)?;
    let len = read_length(bytes, pos)?;
    if len == 0 {
        return Err(GaiaError::InvalidEncoding("empty DER integer".to_string()));
    }
    if bytes.len() < *pos + len {
        return Err(GaiaError::InvalidEncoding(
            "truncated DER integer".to_string(),
        ));
    }
    let int = bytes[*pos..*pos + len].to_vec();
    *pos += len;

    if int.len() > 1 && int[0] == 0 && int[1] & 0x80 == 0 {
        return Err(GaiaError::InvalidEncoding(
            "non-minimal DER integer".to_string(),
        ));
    }
    Ok(int)
}

/// Left-pad a minimal (r, s) pair back to the 64-byte compact layout.
fn compact_from_pair(r: &[u8], s: &[u8]) -> Result<[u8; 64]> {
    let mut compact = [0u8; 64];
    write_padded(&mut compact[..32], strip_sign_pad(r))?;
    write_padded(&mut compact[32..], strip_sign_pad(s))?;
    Ok(compact)
}

fn strip_sign_pad(int: &[u8]) -> &[u8] {
    if int.len() > 1 && int[0] == 0 {
        &int[1..]
    } else {
        int
    }
}

fn write_padded(slot: &mut [u8], int: &[u8]) -> Result<()> {
    if int.len() > slot.len() {
        return Err(GaiaError::InvalidEncoding(format!(
            "integer too large for curve scalar: {} bytes",
            int.len()
        )));
    }
    let start = slot.len() - int.len();
    slot[start..].copy_from_slice(int);
    Ok(())
}
