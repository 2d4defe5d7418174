//! v1 Gaia hub authorization tokens
//!
//! A hub challenge is answered with a signed JWS (ES256K over secp256k1)
//! carrying the challenge text, the hub URL, the signer's compressed public
//! key and a random salt, prefixed with `"v1:"`. The `jsonwebtoken` family of
//! crates stops at the NIST curves, so the compact JWS form is assembled
//! directly: base64url(header) `.` base64url(claims) `.` base64url(r || s).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use gaia_core::error::Result;
use gaia_core::keys::{parse_private_key, public_key_hex};
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{Message, Secp256k1};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Token prefix expected by v1 hubs
pub const TOKEN_VERSION_PREFIX: &str = "v1";

/// Bytes of random salt carried in the token claims
const SALT_SIZE: usize = 16;

/// A named permission granted inside the auth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthScope {
    pub scope: String,
    pub domain: String,
}

impl AuthScope {
    /// Archival-prefix write permission scoped to a collection.
    pub fn collection() -> Self {
        Self {
            scope: "putFileArchivalPrefix".to_string(),
            domain: "collection".to_string(),
        }
    }
}

#[derive(Serialize)]
struct TokenClaims<'a> {
    #[serde(rename = "gaiaChallenge")]
    gaia_challenge: &'a str,
    #[serde(rename = "hubUrl")]
    hub_url: &'a str,
    iss: &'a str,
    salt: String,
    #[serde(rename = "associationToken", skip_serializing_if = "Option::is_none")]
    association_token: Option<&'a str>,
    #[serde(skip_serializing_if = "<[AuthScope]>::is_empty")]
    scopes: &'a [AuthScope],
}

/// Whether a hub's advertised `latest_auth_version` covers v1 auth.
///
/// The value looks like `"v1"`; the numeric major version must be >= 1.
pub fn supports_v1_auth(latest_auth_version: &str) -> bool {
    latest_auth_version
        .strip_prefix('v')
        .map(|rest| {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u32>().map(|major| major >= 1).unwrap_or(false)
        })
        .unwrap_or(false)
}

/// Build the `"v1:..."` authorization token for a hub challenge.
pub fn make_v1_auth_token(
    challenge_text: &str,
    hub_url: &str,
    signer_key_hex: &str,
    association_token: Option<&str>,
    scopes: &[AuthScope],
) -> Result<String> {
    let iss = public_key_hex(signer_key_hex)?;

    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let claims = TokenClaims {
        gaia_challenge: challenge_text,
        hub_url,
        iss: &iss,
        salt: hex::encode(salt),
        association_token,
        scopes,
    };

    let header = URL_SAFE_NO_PAD.encode(r#"{"typ":"JWT","alg":"ES256K"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
    let signing_input = format!("{}.{}", header, payload);

    let secp = Secp256k1::new();
    let secret = parse_private_key(signer_key_hex)?;
    let digest: [u8; 32] = Sha256::digest(signing_input.as_bytes()).into();
    let signature = secp.sign_ecdsa(&Message::from_digest(digest), &secret);
    let encoded_signature = URL_SAFE_NO_PAD.encode(signature.serialize_compact());

    Ok(format!(
        "{}:{}.{}",
        TOKEN_VERSION_PREFIX, signing_input, encoded_signature
    ))
}
