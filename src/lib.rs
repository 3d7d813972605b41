// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # tree-complete
//!
//! Typeahead search over data published as a TREE hypermedia index: many
//! small linked RDF documents, each covering a range of values and pointing
//! at child documents. As the user types, only the documents relevant to the
//! current prefix are fetched, work made obsolete by further keystrokes is
//! abandoned, and a bounded top-K list is re-announced on every change.
//!
//! ## Architecture
//!
//! - **Traversal** (`agent`): best-first walk of one tree with cooperative cancellation
//! - **Fan-in** (`aggregator`): one query over many trees, a single `End` per invocation
//! - **Deduplication** (`unique`): one emission per (subject, value) and query
//! - **Result index** (`store`): oxigraph store answering `resolve_subject`
//! - **Ranking** (`ranking`): incremental top-K with pruning and match highlighting
//! - **Scoring** (`similarity`, `normalize`): comparison vectors over normalized strings
//! - **Documents** (`fetch`): HTTP + RDF parsing, or in-memory for tests
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tree_complete::autocomplete::{AutoComplete, AutoCompleteConfig};
//! use tree_complete::event::{ChannelSink, QueryEmitter, SearchEvent};
//! use tree_complete::fetch::HttpFetcher;
//!
//! # #[tokio::main] async fn main() -> miette::Result<()> {
//! let config = AutoCompleteConfig::fuzzy(vec!["https://example.org/streets/root".into()], 5);
//! let search = AutoComplete::new(config, Arc::new(HttpFetcher::default()))?;
//! let (sink, mut events) = ChannelSink::new();
//! let _sub = search.subscribe(sink);
//!
//! search.query("kerk").await;
//! while let Ok(event) = events.try_recv() {
//!     if let SearchEvent::Data { fact, .. } = event {
//!         println!("{}", fact.object.value());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod aggregator;
pub mod autocomplete;
pub mod config;
pub mod error;
pub mod event;
pub mod fact;
pub mod fetch;
pub mod normalize;
pub mod ranking;
pub mod similarity;
pub mod store;
pub mod unique;
