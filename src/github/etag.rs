use std::{collections::HashMap, future::Future};

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::StatusCode;
use tokio::sync::Mutex;

/// The slice of a response the cache needs: status, validator and body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub etag: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    etag: String,
    body: Bytes,
}

/// Conditional-request cache keyed by request fingerprint (the full URL).
///
/// A hit attaches the stored validator to the outgoing request; a 304 reply
/// is replaced by the cached body so callers always see the last fresh 200.
/// Entries never expire on their own; [`EtagCache::clear`] marks a session
/// boundary.
#[derive(Debug, Default)]
pub struct EtagCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl EtagCache {
    /// Performs `call` with the validator cached for `fingerprint`, if any.
    ///
    /// Every fresh success replaces the entry for the fingerprint. A 304
    /// without a cached body is a transport contract violation. Statuses
    /// other than 304 pass through untouched so the caller can enforce its
    /// own contract.
    pub async fn fetch<F, Fut>(&self, fingerprint: &str, call: F) -> Result<RawResponse>
    where
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = Result<RawResponse>>,
    {
        let validator = {
            let entries = self.entries.lock().await;
            entries.get(fingerprint).map(|entry| entry.etag.clone())
        };

        let response = call(validator).await?;
        match response.status {
            StatusCode::NOT_MODIFIED => {
                let entries = self.entries.lock().await;
                let entry = entries
                    .get(fingerprint)
                    .context("Received 304 without a cached response")?;
                Ok(RawResponse {
                    status: StatusCode::OK,
                    etag: Some(entry.etag.clone()),
                    body: entry.body.clone(),
                })
            }
            status if status.is_success() => {
                let mut entries = self.entries.lock().await;
                match &response.etag {
                    Some(etag) => {
                        entries.insert(
                            fingerprint.to_string(),
                            CacheEntry { etag: etag.clone(), body: response.body.clone() },
                        );
                    }
                    // A response without a validator cannot be replayed.
                    None => {
                        entries.remove(fingerprint);
                    }
                }
                Ok(response)
            }
            _ => Ok(response),
        }
    }

    /// Drops every entry. Affects all fingerprints at once.
    pub async fn clear(&self) { self.entries.lock().await.clear(); }
}
