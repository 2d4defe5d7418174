//! Authorized storage session
//!
//! The session owns the only shared mutable state in the client: the cached
//! `GaiaHubConfig`/app-private-key pair. Both are replaced atomically (a
//! write-locked swap of an `Arc`/`String`, never in-place mutation), so
//! concurrent file operations observe either the old consistent config or
//! the new one. A hub 401/403 clears the cached config; reconnecting is the
//! caller's decision.

use crate::batch::{self, FileOps};
use crate::hub::{GaiaHubConfig, Hub};
use crate::listing::walk_listing;
use crate::token::AuthScope;
use bytes::Bytes;
use gaia_core::cipher::{decrypt_content, encrypt_content, CipherObject, PlainContent};
use gaia_core::error::{GaiaError, Result};
use gaia_core::keys::public_key_hex;
use gaia_core::signature::{sign_content, verify_content, SignatureObject};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Extension appended to the sidecar signature file of a signed upload
pub const SIGNATURE_FILE_SUFFIX: &str = ".sig";

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_TEXT: &str = "text/plain";
const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Persisted-session collaborator: a store for the opaque user-data blob.
///
/// Only the interface is specified here; hosts bring their own persistence.
pub trait SessionStore: Send + Sync {
    fn session_data(&self) -> Result<serde_json::Value>;
    fn set_session_data(&self, data: serde_json::Value) -> Result<()>;
}

/// In-memory `SessionStore` for tests and short-lived tools.
#[derive(Default)]
pub struct InMemorySessionStore {
    data: RwLock<serde_json::Value>,
}

impl InMemorySessionStore {
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn session_data(&self) -> Result<serde_json::Value> {
        Ok(self.data.read().clone())
    }

    fn set_session_data(&self, data: serde_json::Value) -> Result<()> {
        *self.data.write() = data;
        Ok(())
    }
}

/// Options for `put_file`.
#[derive(Debug, Clone)]
pub struct PutOptions {
    pub encrypt: bool,
    pub sign: bool,
    /// Overrides the content type inferred from the payload
    pub content_type: Option<String>,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            encrypt: true,
            sign: false,
            content_type: None,
        }
    }
}

/// Options for `get_file`.
#[derive(Debug, Clone)]
pub struct GetOptions {
    pub decrypt: bool,
    pub verify: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            decrypt: true,
            verify: false,
        }
    }
}

/// Options for `delete_file`.
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Also remove the `.sig` sidecar written by a signed upload
    pub was_signed: bool,
}

/// Wire form of signed-and-encrypted content: the signature covers the
/// serialized cipher object carried in `cipherText`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SignedCipherObject {
    signature: String,
    #[serde(rename = "publicKey")]
    public_key: String,
    #[serde(rename = "cipherText")]
    cipher_text: String,
}

/// An application's authorized storage session.
pub struct Session<S: SessionStore> {
    store: S,
    hub: Hub,
    app_private_key: RwLock<Option<String>>,
    hub_config: RwLock<Option<Arc<GaiaHubConfig>>>,
}

impl<S: SessionStore> Session<S> {
    /// Create a session over a store, adopting `userData.appPrivateKey`
    /// from the persisted blob when present.
    pub fn new(store: S) -> Self {
        Self::with_hub(store, Hub::new())
    }

    pub fn with_hub(store: S, hub: Hub) -> Self {
        let app_private_key = store
            .session_data()
            .ok()
            .and_then(|data| {
                data.get("userData")?
                    .get("appPrivateKey")?
                    .as_str()
                    .map(|s| s.to_string())
            });

        Self {
            store,
            hub,
            app_private_key: RwLock::new(app_private_key),
            hub_config: RwLock::new(None),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.app_private_key.read().is_some()
    }

    /// Replace the persisted user data and adopt its app private key.
    pub fn update_user_data(&self, user_data: serde_json::Value) -> Result<()> {
        let key = user_data
            .get("appPrivateKey")
            .and_then(|k| k.as_str())
            .map(|s| s.to_string());

        self.store
            .set_session_data(serde_json::json!({ "userData": user_data }))?;
        *self.app_private_key.write() = key;
        // The old hub config was authorized by the old key
        *self.hub_config.write() = None;
        Ok(())
    }

    pub fn load_user_data(&self) -> Result<serde_json::Value> {
        let data = self.store.session_data()?;
        data.get("userData")
            .cloned()
            .ok_or_else(|| GaiaError::Session("no user data in session store".to_string()))
    }

    pub fn sign_out(&self) -> Result<()> {
        self.store.set_session_data(serde_json::json!({}))?;
        *self.app_private_key.write() = None;
        *self.hub_config.write() = None;
        Ok(())
    }

    /// The hub config of the current connection, if any.
    pub fn hub_config(&self) -> Option<Arc<GaiaHubConfig>> {
        self.hub_config.read().clone()
    }

    /// Perform the challenge/token exchange and cache the resulting config.
    pub async fn connect(
        &self,
        hub_url: &str,
        association_token: Option<&str>,
        scopes: &[AuthScope],
    ) -> Result<Arc<GaiaHubConfig>> {
        let key = self.require_private_key()?;
        let config = Arc::new(
            self.hub
                .connect_to_gaia(hub_url, &key, association_token, scopes)
                .await?,
        );
        *self.hub_config.write() = Some(config.clone());
        Ok(config)
    }

    /// Upload a file, optionally encrypted to the session key and/or signed.
    ///
    /// Returns the public read URL of the stored file.
    pub async fn put_file(
        &self,
        path: &str,
        content: PlainContent,
        options: &PutOptions,
    ) -> Result<String> {
        let config = self.current_config()?;
        let key = self.require_private_key()?;

        let (body, content_type) = if options.encrypt {
            let cipher = encrypt_content(&content, &public_key_hex(&key)?)?;
            let payload = if options.sign {
                let cipher_json = cipher.to_json()?;
                let signature = sign_content(cipher_json.as_bytes(), &key)?;
                serde_json::to_string(&SignedCipherObject {
                    signature: signature.signature,
                    public_key: signature.public_key,
                    cipher_text: cipher_json,
                })?
            } else {
                cipher.to_json()?
            };
            (Bytes::from(payload), CONTENT_TYPE_JSON.to_string())
        } else {
            if options.sign {
                let signature = sign_content(content.as_bytes(), &key)?;
                let sidecar = format!("{}{}", path, SIGNATURE_FILE_SUFFIX);
                let result = self
                    .hub
                    .upload(
                        &sidecar,
                        Bytes::from(serde_json::to_string(&signature)?),
                        CONTENT_TYPE_JSON,
                        &config,
                    )
                    .await;
                self.surface(result)?;
            }

            let content_type = options.content_type.clone().unwrap_or_else(|| {
                if content.is_text() {
                    CONTENT_TYPE_TEXT.to_string()
                } else {
                    CONTENT_TYPE_BINARY.to_string()
                }
            });
            (Bytes::from(content.as_bytes().to_vec()), content_type)
        };

        debug!(path, encrypted = options.encrypt, signed = options.sign, "put file");
        let result = self.hub.upload(path, body, &content_type, &config).await;
        self.surface(result)
    }

    /// Fetch a file, decrypting and/or verifying per `options`.
    pub async fn get_file(&self, path: &str, options: &GetOptions) -> Result<PlainContent> {
        let config = self.current_config()?;
        let url = config.full_read_url(path);
        let response = self.surface(self.hub.get(&url).await)?;

        if options.decrypt {
            let key = self.require_private_key()?;
            let text = String::from_utf8(response.content.to_vec())
                .map_err(|_| GaiaError::Decryption("failed to decrypt content".to_string()))?;

            let cipher = if options.verify {
                let wrapper: SignedCipherObject = serde_json::from_str(&text)?;
                let signature = SignatureObject {
                    signature: wrapper.signature,
                    public_key: wrapper.public_key,
                };
                if !verify_content(wrapper.cipher_text.as_bytes(), &signature)? {
                    return Err(GaiaError::SignatureVerification(path.to_string()));
                }
                CipherObject::from_json(&wrapper.cipher_text)?
            } else {
                CipherObject::from_json(&text)?
            };

            return decrypt_content(&cipher, &key);
        }

        if options.verify {
            let sidecar_url = config.full_read_url(&format!("{}{}", path, SIGNATURE_FILE_SUFFIX));
            let sidecar = self.surface(self.hub.get(&sidecar_url).await)?;
            let signature: SignatureObject = serde_json::from_slice(&sidecar.content)?;
            if !verify_content(&response.content, &signature)? {
                return Err(GaiaError::SignatureVerification(path.to_string()));
            }
        }

        Ok(frame_response(response.content, response.content_type))
    }

    /// Delete a file (and its `.sig` sidecar for signed uploads).
    pub async fn delete_file(&self, path: &str, options: &DeleteOptions) -> Result<()> {
        let config = self.current_config()?;

        if options.was_signed {
            let sidecar = format!("{}{}", path, SIGNATURE_FILE_SUFFIX);
            match self.hub.delete(&sidecar, &config).await {
                Ok(()) | Err(GaiaError::NotFound(_)) => {}
                Err(err) => return self.surface(Err(err)),
            }
        }

        self.surface(self.hub.delete(path, &config).await)
    }

    /// Execute a batch descriptor against this session's hub.
    pub async fn perform_files(&self, descriptor: &str, base_dir: &Path) -> Result<u64> {
        let config = self.current_config()?;
        let ops = SessionFileOps {
            hub: &self.hub,
            config: &config,
        };
        batch::perform_files(&ops, descriptor, base_dir).await
    }

    /// Walk the bucket's file listing; see `listing::walk_listing`.
    pub async fn list_files<C: FnMut(&str) -> bool>(&self, on_entry: C) -> Result<u64> {
        let config = self.current_config()?;
        walk_listing(
            |page| self.hub.fetch_list_page(&config, page),
            on_entry,
        )
        .await
    }

    fn require_private_key(&self) -> Result<String> {
        self.app_private_key
            .read()
            .clone()
            .ok_or_else(|| GaiaError::Session("no app private key loaded".to_string()))
    }

    fn current_config(&self) -> Result<Arc<GaiaHubConfig>> {
        self.hub_config
            .read()
            .clone()
            .ok_or_else(|| GaiaError::Session("not connected to a hub".to_string()))
    }

    /// Pass a hub result through, dropping the cached config when the hub
    /// rejected our token.
    fn surface<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            let status = match err {
                GaiaError::Upload { status, .. } | GaiaError::Download { status, .. } => *status,
                _ => 0,
            };
            if status == 401 || status == 403 {
                debug!("hub rejected token, dropping cached config");
                *self.hub_config.write() = None;
            }
        }
        result
    }
}

/// Text for textual content types, bytes for everything else.
fn frame_response(content: Bytes, content_type: Option<String>) -> PlainContent {
    let textual = content_type
        .as_deref()
        .map(|ct| ct.starts_with("text/") || ct.starts_with(CONTENT_TYPE_JSON))
        .unwrap_or(false);

    if textual {
        match String::from_utf8(content.to_vec()) {
            Ok(text) => PlainContent::Text(text),
            Err(_) => PlainContent::Binary(content.to_vec()),
        }
    } else {
        PlainContent::Binary(content.to_vec())
    }
}

/// Adapter giving the batch executor this session's hub operations.
struct SessionFileOps<'s> {
    hub: &'s Hub,
    config: &'s GaiaHubConfig,
}

impl FileOps for SessionFileOps<'_> {
    fn put<'a>(
        &'a self,
        path: &'a str,
        content: Bytes,
        content_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.hub.upload(path, content, content_type, self.config))
    }

    fn delete<'a>(&'a self, path: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.hub.delete(path, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "a5c40c6fb06b068d308b9b88ca18b5bc923450d99f8e3eee1c1ca9ac7ea75db8";

    fn store_with_key() -> InMemorySessionStore {
        InMemorySessionStore::new(serde_json::json!({
            "userData": { "appPrivateKey": KEY }
        }))
    }

    #[test]
    fn test_session_adopts_key_from_store() {
        let session = Session::new(store_with_key());
        assert!(session.is_signed_in());
    }

    #[test]
    fn test_session_without_key() {
        let session = Session::new(InMemorySessionStore::default());
        assert!(!session.is_signed_in());
        assert!(matches!(
            session.require_private_key(),
            Err(GaiaError::Session(_))
        ));
    }

    #[test]
    fn test_update_user_data_swaps_key_and_drops_config() {
        let session = Session::new(store_with_key());
        *session.hub_config.write() = Some(Arc::new(GaiaHubConfig {
            url_prefix: "https://read.example/".to_string(),
            address: "1abc".to_string(),
            token: "v1:x".to_string(),
            server: "https://hub.example".to_string(),
        }));

        session
            .update_user_data(serde_json::json!({ "appPrivateKey": KEY }))
            .unwrap();
        assert!(session.hub_config().is_none());
        assert!(session.is_signed_in());
    }

    #[test]
    fn test_sign_out_clears_everything() {
        let session = Session::new(store_with_key());
        session.sign_out().unwrap();
        assert!(!session.is_signed_in());
        assert!(session.hub_config().is_none());
        assert!(session.load_user_data().is_err());
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let session = Session::new(store_with_key());
        let result = session
            .get_file("file.json", &GetOptions::default())
            .await;
        assert!(matches!(result, Err(GaiaError::Session(_))));
    }

    #[test]
    fn test_frame_response_by_content_type() {
        let text = frame_response(Bytes::from_static(b"hello"), Some("text/plain".to_string()));
        assert!(matches!(text, PlainContent::Text(_)));

        let json = frame_response(
            Bytes::from_static(b"{}"),
            Some("application/json".to_string()),
        );
        assert!(matches!(json, PlainContent::Text(_)));

        let binary = frame_response(Bytes::from_static(b"\xff\xfe"), None);
        assert!(matches!(binary, PlainContent::Binary(_)));
    }

    #[test]
    fn test_auth_failure_drops_config() {
        let session = Session::new(store_with_key());
        *session.hub_config.write() = Some(Arc::new(GaiaHubConfig {
            url_prefix: "https://read.example/".to_string(),
            address: "1abc".to_string(),
            token: "v1:x".to_string(),
            server: "https://hub.example".to_string(),
        }));

        let result: Result<()> = session.surface(Err(GaiaError::Upload {
            status: 401,
            message: "expired".to_string(),
        }));
        assert!(result.is_err());
        assert!(session.hub_config().is_none());
    }

    #[test]
    fn test_non_auth_failure_keeps_config() {
        let session = Session::new(store_with_key());
        *session.hub_config.write() = Some(Arc::new(GaiaHubConfig {
            url_prefix: "https://read.example/".to_string(),
            address: "1abc".to_string(),
            token: "v1:x".to_string(),
            server: "https://hub.example".to_string(),
        }));

        let result: Result<()> = session.surface(Err(GaiaError::Upload {
            status: 503,
            message: "unavailable".to_string(),
        }));
        assert!(result.is_err());
        assert!(session.hub_config().is_some());
    }
}
