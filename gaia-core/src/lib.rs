//! Gaia Core Library
//!
//! Cryptographic support layer for the Gaia storage protocol client.
//! This crate provides:
//! - Base58Check address derivation from secp256k1 public keys
//! - Strict-DER ECDSA signature encoding and content signing
//! - Ephemeral-key content encryption (ECIES-style, MAC-then-decrypt)
//! - Common error handling
//!
//! No I/O happens here; the protocol client lives in `gaia-client`.

pub mod address;
pub mod cipher;
pub mod error;
pub mod keys;
pub mod signature;

pub use address::address_from_public_key;
pub use cipher::{decrypt_content, encrypt_content, CipherObject, PlainContent};
pub use error::{GaiaError, Result};
pub use keys::{parse_private_key, parse_public_key, public_key_hex};
pub use signature::{sign_content, to_der, verify_content, SignatureObject};
