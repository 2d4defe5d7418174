//! Gaia hub client
//!
//! Negotiates the challenge/token exchange with a storage hub and issues the
//! authorized PUT/GET/DELETE/list-page requests. The hub owns no retry
//! policy: transport failures and non-2xx statuses are surfaced to the
//! caller as typed errors.

use crate::listing::ListPage;
use crate::token::{make_v1_auth_token, supports_v1_auth, AuthScope};
use bytes::Bytes;
use gaia_core::address::address_from_public_key;
use gaia_core::error::{GaiaError, Result};
use gaia_core::keys::public_key_hex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hub connection settings produced by `connect_to_gaia`.
///
/// Immutable once constructed and only valid for the hub/address pair that
/// produced it; shared by cheap clone across concurrent operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaiaHubConfig {
    /// Prefix for public read URLs (`read_url_prefix` from hub_info)
    pub url_prefix: String,
    /// Base58Check address of the bucket owner
    pub address: String,
    /// `"v1:..."` bearer token
    pub token: String,
    /// Hub base URL for writes and deletes
    pub server: String,
}

impl GaiaHubConfig {
    /// Public read URL for a file in this bucket.
    pub fn full_read_url(&self, filename: &str) -> String {
        format!("{}{}/{}", self.url_prefix, self.address, filename)
    }
}

/// `GET {hub}/hub_info` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct HubInfo {
    pub read_url_prefix: String,
    pub challenge_text: String,
    #[serde(default)]
    pub latest_auth_version: String,
}

/// A downloaded file with the content type the hub reported.
#[derive(Debug, Clone)]
pub struct FileResponse {
    pub content: Bytes,
    pub content_type: Option<String>,
}

#[derive(Serialize)]
struct ListPageRequest<'a> {
    page: Option<&'a str>,
}

/// HTTP client for a Gaia storage hub.
pub struct Hub {
    http: reqwest::Client,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Use a caller-supplied client (timeouts, proxies, TLS roots).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetch the hub's challenge and build an authorized `GaiaHubConfig`.
    ///
    /// Fails with `UnsupportedHubVersion` when the hub does not advertise a
    /// v1-compatible `latest_auth_version`; no retry can fix that.
    pub async fn connect_to_gaia(
        &self,
        hub_url: &str,
        signer_key_hex: &str,
        association_token: Option<&str>,
        scopes: &[AuthScope],
    ) -> Result<GaiaHubConfig> {
        let server = hub_url.trim_end_matches('/');
        let hub_info = self.fetch_hub_info(server).await?;

        if !supports_v1_auth(&hub_info.latest_auth_version) {
            return Err(GaiaError::UnsupportedHubVersion(format!(
                "hub advertises '{}', v1 required",
                hub_info.latest_auth_version
            )));
        }

        let token = make_v1_auth_token(
            &hub_info.challenge_text,
            server,
            signer_key_hex,
            association_token,
            scopes,
        )?;
        let address = address_from_public_key(&public_key_hex(signer_key_hex)?)?;

        debug!(server, %address, "connected to gaia hub");

        Ok(GaiaHubConfig {
            url_prefix: hub_info.read_url_prefix,
            address,
            token,
            server: server.to_string(),
        })
    }

    async fn fetch_hub_info(&self, server: &str) -> Result<HubInfo> {
        let url = format!("{}/hub_info", server);
        let response = self
            .http
            .get(&url)
            .header("Referrer-Policy", "no-referrer")
            .send()
            .await
            .map_err(net_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GaiaError::Download {
                status: status.as_u16(),
                message: format!("hub_info request to {} failed", url),
            });
        }

        response
            .json::<HubInfo>()
            .await
            .map_err(|e| GaiaError::Serialization(format!("invalid hub_info: {}", e)))
    }

    /// Upload raw content to `{server}/store/{address}/{path}`.
    ///
    /// Returns the public read URL of the stored file.
    pub async fn upload(
        &self,
        path: &str,
        content: Bytes,
        content_type: &str,
        config: &GaiaHubConfig,
    ) -> Result<String> {
        let url = format!("{}/store/{}/{}", config.server, config.address, path);
        debug!(%url, content_type, bytes = content.len(), "uploading to gaia hub");

        let response = self
            .http
            .post(&url)
            .header("Content-Type", content_type)
            .header("Authorization", bearer(&config.token))
            .header("Referrer-Policy", "no-referrer")
            .body(content)
            .send()
            .await
            .map_err(net_err)?;

        let status = response.status();
        if status.is_success() {
            Ok(config.full_read_url(path))
        } else {
            Err(GaiaError::Upload {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }

    /// Download a file from its read URL.
    pub async fn get(&self, url: &str) -> Result<FileResponse> {
        let response = self
            .http
            .get(url)
            .header("Referrer-Policy", "no-referrer")
            .send()
            .await
            .map_err(net_err)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GaiaError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(GaiaError::Download {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let content = response.bytes().await.map_err(net_err)?;

        Ok(FileResponse {
            content,
            content_type,
        })
    }

    /// Delete `{server}/delete/{address}/{path}`.
    ///
    /// A missing file is a distinguishable `NotFound`; callers decide whether
    /// to tolerate it.
    pub async fn delete(&self, path: &str, config: &GaiaHubConfig) -> Result<()> {
        let url = format!("{}/delete/{}/{}", config.server, config.address, path);
        debug!(%url, "deleting from gaia hub");

        let response = self
            .http
            .delete(&url)
            .header("Authorization", bearer(&config.token))
            .send()
            .await
            .map_err(net_err)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GaiaError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(GaiaError::Upload {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Fetch one page of the bucket's file listing.
    pub async fn fetch_list_page(
        &self,
        config: &GaiaHubConfig,
        page: Option<String>,
    ) -> Result<ListPage> {
        let url = format!("{}/list-files/{}", config.server, config.address);

        let response = self
            .http
            .post(&url)
            .header("Authorization", bearer(&config.token))
            .header("Referrer-Policy", "no-referrer")
            .json(&ListPageRequest {
                page: page.as_deref(),
            })
            .send()
            .await
            .map_err(|e| GaiaError::Listing(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GaiaError::Listing(format!(
                "list-files returned {}",
                status.as_u16()
            )));
        }

        response
            .json::<ListPage>()
            .await
            .map_err(|e| GaiaError::Listing(format!("invalid listing page: {}", e)))
    }
}

fn bearer(token: &str) -> String {
    format!("bearer {}", token)
}

fn net_err(err: reqwest::Error) -> GaiaError {
    GaiaError::Network(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_read_url() {
        let config = GaiaHubConfig {
            url_prefix: "https://read.example/".to_string(),
            address: "1abc".to_string(),
            token: "v1:jws".to_string(),
            server: "https://hub.example".to_string(),
        };
        assert_eq!(
            config.full_read_url("dir/file.json"),
            "https://read.example/1abc/dir/file.json"
        );
    }

    #[test]
    fn test_bearer_header_is_lowercase() {
        assert_eq!(bearer("v1:x"), "bearer v1:x");
    }
}
