//! Document fetch capability.
//!
//! The traversal engine only needs `fetch(uri) -> facts`. [`MemoryFetcher`]
//! serves pre-registered documents (tests, offline indexes); [`HttpFetcher`]
//! dereferences URIs over HTTP and parses the RDF response.

#[cfg(feature = "http")]
pub mod http;
pub mod parse;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use crate::error::{FetchError, FetchResult};
use crate::fact::Fact;

#[cfg(feature = "http")]
pub use http::HttpFetcher;
pub use parse::parse_document;

/// Asynchronously fetch and parse one document of a hypermedia tree.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// All facts of the document at `uri`, in no particular order.
    async fn fetch(&self, uri: &str) -> FetchResult<Vec<Fact>>;
}

/// Serves documents from memory and counts how often each one is fetched.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: DashMap<String, Arc<Vec<Fact>>>,
    failing: DashSet<String>,
    fetches: DashMap<String, usize>,
    latency: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate network latency on every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Register (or replace) a document.
    pub fn insert(&self, uri: impl Into<String>, facts: Vec<Fact>) {
        self.documents.insert(uri.into(), Arc::new(facts));
    }

    /// Make every fetch of `uri` fail with a transport error.
    pub fn fail(&self, uri: impl Into<String>) {
        self.failing.insert(uri.into());
    }

    /// Number of fetch attempts for `uri`, failed ones included.
    pub fn fetch_count(&self, uri: &str) -> usize {
        self.fetches.get(uri).map(|n| *n).unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.iter().map(|e| *e.value()).sum()
    }
}

#[async_trait]
impl DocumentFetcher for MemoryFetcher {
    async fn fetch(&self, uri: &str) -> FetchResult<Vec<Fact>> {
        *self.fetches.entry(uri.to_string()).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.contains(uri) {
            return Err(FetchError::Transport {
                uri: uri.to_string(),
                message: "simulated failure".into(),
            });
        }

        let facts = self
            .documents
            .get(uri)
            .map(|doc| doc.value().clone())
            .ok_or_else(|| FetchError::Missing {
                uri: uri.to_string(),
            })?;
        Ok(facts.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_fetcher_serves_and_counts() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert(
            "https://ex.org/p1",
            vec![Fact::text("https://ex.org/a", "http://schema.org/name", "Anne")],
        );

        let facts = fetcher.fetch("https://ex.org/p1").await.unwrap();
        assert_eq!(facts.len(), 1);
        fetcher.fetch("https://ex.org/p1").await.unwrap();
        assert_eq!(fetcher.fetch_count("https://ex.org/p1"), 2);
        assert_eq!(fetcher.total_fetches(), 2);
    }

    #[tokio::test]
    async fn unknown_document_is_missing() {
        let fetcher = MemoryFetcher::new();
        let err = fetcher.fetch("https://ex.org/nope").await.unwrap_err();
        assert!(matches!(err, FetchError::Missing { .. }));
        assert_eq!(fetcher.fetch_count("https://ex.org/nope"), 1);
    }

    #[tokio::test]
    async fn injected_failure_is_transport_error() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("https://ex.org/p1", Vec::new());
        fetcher.fail("https://ex.org/p1");
        let err = fetcher.fetch("https://ex.org/p1").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
