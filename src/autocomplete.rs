//! The assembled search pipeline.
//!
//! ```text
//! query ─▶ ResultRanking ─▶ [ResultStore] ─▶ ResultUniqueFilter ─▶ QueryAggregator ─▶ QueryAgent × N
//!                  ◀─────── events flow back down the same chain ◀────────
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//! use tree_complete::autocomplete::{AutoComplete, AutoCompleteConfig};
//! use tree_complete::event::{QueryEmitter, VecSink};
//! use tree_complete::fetch::HttpFetcher;
//!
//! # async fn run() -> tree_complete::error::SearchResult<()> {
//! let config = AutoCompleteConfig::strict(vec!["https://example.org/tree/root".into()], 10);
//! let search = AutoComplete::new(config, Arc::new(HttpFetcher::default()))?;
//! let sink = Arc::new(VecSink::new());
//! let _sub = search.subscribe(sink.clone());
//! search.query("ann").await;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::agent::QueryAgent;
use crate::aggregator::QueryAggregator;
use crate::error::{ConfigError, SearchResult};
use crate::event::{EventSink, QueryEmitter, Subscription};
use crate::fact::Fact;
use crate::fetch::DocumentFetcher;
use crate::normalize::{Nfkd, Normalizer};
use crate::ranking::{RankedEntry, ResultRanking};
use crate::similarity::SimilarityConfiguration;
use crate::similarity::presets::{self, Preset};
use crate::store::ResultStore;
use crate::unique::ResultUniqueFilter;

/// Everything needed to build an [`AutoComplete`] pipeline.
#[derive(Clone)]
pub struct AutoCompleteConfig {
    /// Root document URIs, one per tree.
    pub sources: Vec<String>,
    /// Number of results kept by the ranking stage.
    pub size: usize,
    /// Decides which relations to follow, and in which order.
    pub relation_similarity: Vec<SimilarityConfiguration>,
    /// Decides which results to keep, and in which order.
    pub result_similarity: Vec<SimilarityConfiguration>,
    pub normalizer: Arc<dyn Normalizer>,
    /// Index every fetched fact so `resolve_subject` can answer.
    pub use_store: bool,
}

impl AutoCompleteConfig {
    pub fn from_preset(sources: Vec<String>, size: usize, preset: Preset) -> Self {
        Self {
            sources,
            size,
            relation_similarity: preset.relations,
            result_similarity: preset.results,
            normalizer: Arc::new(Nfkd),
            use_store: true,
        }
    }

    /// Prefix relations, results containing every query token.
    pub fn strict(sources: Vec<String>, size: usize) -> Self {
        Self::from_preset(sources, size, presets::strict())
    }

    /// Character-overlap relations, results ranked by prefix then bigrams.
    pub fn fuzzy(sources: Vec<String>, size: usize) -> Self {
        Self::from_preset(sources, size, presets::fuzzy())
    }

    pub fn with_normalizer(mut self, normalizer: impl Normalizer + 'static) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };
        if self.size == 0 {
            return invalid("size must be at least 1");
        }
        if self.sources.is_empty() {
            return invalid("at least one source is required");
        }
        if self.result_similarity.is_empty() {
            return invalid("result_similarity must contain at least one configuration");
        }
        Ok(())
    }
}

impl fmt::Debug for AutoCompleteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoCompleteConfig")
            .field("sources", &self.sources)
            .field("size", &self.size)
            .field("relation_similarity", &self.relation_similarity)
            .field("result_similarity", &self.result_similarity)
            .field("use_store", &self.use_store)
            .finish_non_exhaustive()
    }
}

/// Typeahead search over one or more trees.
pub struct AutoComplete {
    agents: Vec<Arc<QueryAgent>>,
    store: Option<Arc<ResultStore>>,
    ranking: Arc<ResultRanking>,
}

impl AutoComplete {
    pub fn new(config: AutoCompleteConfig, fetcher: Arc<dyn DocumentFetcher>) -> SearchResult<Self> {
        config.validate()?;

        let agents: Vec<Arc<QueryAgent>> = config
            .sources
            .iter()
            .map(|source| {
                Arc::new(
                    QueryAgent::new(
                        source.clone(),
                        fetcher.clone(),
                        config.relation_similarity.clone(),
                    )
                    .with_normalizer(config.normalizer.clone()),
                )
            })
            .collect();
        let children = agents
            .iter()
            .map(|agent| agent.clone() as Arc<dyn QueryEmitter>)
            .collect();

        let aggregator = QueryAggregator::new(children);
        let unique: Arc<dyn QueryEmitter> = ResultUniqueFilter::new(aggregator);
        let (store, upstream) = if config.use_store {
            let store = ResultStore::new(unique)?;
            (Some(store.clone()), store as Arc<dyn QueryEmitter>)
        } else {
            (None, unique)
        };
        let ranking = ResultRanking::new(
            upstream,
            config.size,
            config.result_similarity,
            config.normalizer,
        );

        tracing::info!(
            sources = agents.len(),
            size = config.size,
            use_store = config.use_store,
            "search pipeline ready"
        );
        Ok(Self {
            agents,
            store,
            ranking,
        })
    }

    /// Load every tree's root relations ahead of the first query.
    ///
    /// Unreachable roots are logged and skipped; their agent fetches the root
    /// again on the first query. Returns the number of relations loaded.
    pub async fn prefetch(&self) -> usize {
        let outcomes = join_all(self.agents.iter().map(|agent| agent.prefetch())).await;
        outcomes
            .into_iter()
            .zip(&self.agents)
            .map(|(outcome, agent)| match outcome {
                Ok(count) => count,
                Err(error) => {
                    tracing::warn!(source = agent.source(), %error, "prefetch failed");
                    0
                }
            })
            .sum()
    }

    /// The current top-K, best first.
    pub fn results(&self) -> Vec<RankedEntry> {
        self.ranking.results()
    }

    /// The query the current results belong to.
    pub fn current_query(&self) -> Option<String> {
        self.ranking.current_query()
    }

    pub fn agents(&self) -> &[Arc<QueryAgent>] {
        &self.agents
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }
}

#[async_trait]
impl QueryEmitter for AutoComplete {
    async fn query(&self, input: &str) {
        self.ranking.query(input).await;
    }

    fn subscribe(&self, sink: Arc<dyn EventSink>) -> Subscription {
        self.ranking.subscribe(sink)
    }

    fn resolve_subject(&self, uri: &str) -> Vec<Fact> {
        self.ranking.resolve_subject(uri)
    }
}
