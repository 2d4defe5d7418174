//! Hub file-listing pagination
//!
//! The walker is generic over a page-fetch function so the pagination logic
//! is testable without a live hub; `Session::list_files` wires it to
//! `Hub::fetch_list_page`.

use gaia_core::error::{GaiaError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Upper bound on page requests per walk, matching the reference client.
pub const MAX_PAGE_REQUESTS: u32 = 65536;

/// One page of a hub's file listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPage {
    /// Filenames in this page; a hub may send null for an empty bucket
    #[serde(default)]
    pub entries: Option<Vec<String>>,
    /// Continuation token; absent or empty on the last page
    #[serde(default)]
    pub page: Option<String>,
}

/// Walk a paginated listing, invoking `on_entry` per filename.
///
/// Stops as soon as `on_entry` returns `false`, a page comes back empty, or
/// the hub reports no continuation token. Returns the number of entries
/// actually delivered to the callback; entries delivered before a
/// mid-pagination failure are not rolled back.
pub async fn walk_listing<F, Fut, C>(mut fetch_page: F, mut on_entry: C) -> Result<u64>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<ListPage>>,
    C: FnMut(&str) -> bool,
{
    let mut page_token: Option<String> = None;
    let mut delivered = 0u64;
    let mut requests = 0u32;

    loop {
        requests += 1;
        if requests > MAX_PAGE_REQUESTS {
            return Err(GaiaError::Listing(format!(
                "more than {} listing pages",
                MAX_PAGE_REQUESTS
            )));
        }

        let page = fetch_page(page_token.take()).await?;
        let entries = page.entries.unwrap_or_default();
        if entries.is_empty() {
            return Ok(delivered);
        }

        for entry in &entries {
            delivered += 1;
            if !on_entry(entry) {
                return Ok(delivered);
            }
        }

        match page.page {
            Some(next) if !next.is_empty() => page_token = Some(next),
            _ => return Ok(delivered),
        }
    }
}
