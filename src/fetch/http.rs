//! HTTP document fetcher.
//!
//! Uses `ureq` for synchronous HTTP requests on tokio's blocking pool. Enforces
//! a timeout and a maximum response size so one slow or huge document cannot
//! stall or exhaust the process.

use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;

use super::DocumentFetcher;
use super::parse::{ACCEPT, format_for_content_type, parse_document};
use crate::error::{FetchError, FetchResult};
use crate::fact::Fact;

/// Default maximum response body size (8 MB).
pub const DEFAULT_MAX_BYTES: u64 = 8 * 1024 * 1024;

/// Dereferences document URIs over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), DEFAULT_MAX_BYTES)
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("tree-complete/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent, max_bytes }
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, uri: &str) -> FetchResult<Vec<Fact>> {
        if !uri.starts_with("http://") && !uri.starts_with("https://") {
            return Err(FetchError::Transport {
                uri: uri.to_string(),
                message: "only http:// and https:// URIs can be fetched".into(),
            });
        }

        let agent = self.agent.clone();
        let max_bytes = self.max_bytes;
        let owned = uri.to_string();
        tokio::task::spawn_blocking(move || fetch_blocking(&agent, &owned, max_bytes))
            .await
            .map_err(|e| FetchError::Join {
                uri: uri.to_string(),
                message: e.to_string(),
            })?
    }
}

fn fetch_blocking(agent: &ureq::Agent, uri: &str, max_bytes: u64) -> FetchResult<Vec<Fact>> {
    tracing::debug!(uri, "fetching document");

    let response = match agent.get(uri).set("Accept", ACCEPT).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status,
            });
        }
        Err(ureq::Error::Transport(transport)) => {
            return Err(FetchError::Transport {
                uri: uri.to_string(),
                message: transport.to_string(),
            });
        }
    };

    // Relative IRIs resolve against the final URL after redirects.
    let base = response.get_url().to_string();
    let content_type = response.content_type().to_string();
    let format = format_for_content_type(&content_type).ok_or_else(|| {
        FetchError::UnsupportedFormat {
            uri: uri.to_string(),
            content_type: content_type.clone(),
        }
    })?;

    let body = read_limited(response.into_reader(), uri, max_bytes)?;
    let facts = parse_document(&body, format, &base)?;
    tracing::debug!(uri, bytes = body.len(), facts = facts.len(), "document parsed");
    Ok(facts)
}

/// Read a whole body, refusing anything longer than `max_bytes`.
///
/// One byte past the limit is read so an oversized body is rejected rather
/// than parsed as a truncated document.
fn read_limited(reader: impl Read, uri: &str, max_bytes: u64) -> FetchResult<Vec<u8>> {
    let mut body = Vec::new();
    reader
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|source| FetchError::Io {
            uri: uri.to_string(),
            source,
        })?;
    if body.len() as u64 > max_bytes {
        return Err(FetchError::TooLarge {
            uri: uri.to_string(),
            limit: max_bytes,
        });
    }
    Ok(body)
}
