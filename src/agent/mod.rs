//! Traversal agent: best-first search over one lazily discovered TREE index.
//!
//! Each query starts from the relations discovered so far (or from the root
//! document when nothing is known yet), scores every relation key against the
//! query, and repeatedly fetches the most promising unvisited document. Every
//! textual literal in a fetched document is emitted as data; every new
//! relation is remembered for later queries and queued when its key is
//! eligible.
//!
//! Relation keys are scored against the normalized query, while events stay
//! tagged with the query as submitted.
//!
//! Cancellation is cooperative: a newer query that extends or shortens this
//! one cancels its token, and the loop notices at its next check (at the loop
//! head and after each fetch). An in-flight fetch always completes; its
//! result is discarded.

pub mod active;

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::FetchResult;
use crate::event::{Emitter, EventSink, QueryEmitter, SearchEvent, Subscription};
use crate::fact::{Fact, Term};
use crate::fetch::DocumentFetcher;
use crate::normalize::{Nfkd, Normalizer};
use crate::similarity::{ScoreVector, SimilarityConfiguration};

use self::active::ActiveQuerySet;

/// A document queued for traversal.
#[derive(Debug, Clone)]
struct Candidate {
    uri: String,
    scores: ScoreVector,
}

// Max-heap order: better scores first, then the smaller URI.
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.scores
            .compare(&other.scores)
            .then_with(|| other.uri.cmp(&self.uri))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// A fetched document split into its relations and its result literals.
#[derive(Debug, Default)]
struct Page {
    /// Child document URI → relation keys.
    links: Vec<(String, Vec<String>)>,
    results: Vec<Fact>,
}

fn split_page(facts: Vec<Fact>) -> Page {
    let mut nodes: HashMap<Term, String> = HashMap::new();
    let mut values: HashMap<Term, Vec<String>> = HashMap::new();
    let mut results = Vec::new();

    for fact in facts {
        if fact.is_link() {
            nodes.insert(fact.subject, fact.object.value().to_string());
        } else if fact.is_relation_value() {
            values
                .entry(fact.subject)
                .or_default()
                .push(fact.object.value().to_string());
        } else if fact.is_result_candidate() {
            results.push(fact);
        }
    }

    let links = nodes
        .into_iter()
        .map(|(relation, child)| {
            let keys = values.remove(&relation).unwrap_or_default();
            (child, keys)
        })
        .collect();

    Page { links, results }
}

/// Traverses a single hypermedia tree.
pub struct QueryAgent {
    source: String,
    fetcher: Arc<dyn DocumentFetcher>,
    similarity: Vec<SimilarityConfiguration>,
    normalizer: Arc<dyn Normalizer>,
    /// Child document URI → relation keys, shared by all queries.
    known_relations: DashMap<String, Vec<String>>,
    active: Mutex<ActiveQuerySet>,
    emitter: Emitter,
}

impl QueryAgent {
    /// Create an agent for the tree rooted at `source`, prioritizing relations
    /// with the `similarity` comparison vector.
    pub fn new(
        source: impl Into<String>,
        fetcher: Arc<dyn DocumentFetcher>,
        similarity: Vec<SimilarityConfiguration>,
    ) -> Self {
        Self {
            source: source.into(),
            fetcher,
            similarity,
            normalizer: Arc::new(Nfkd),
            known_relations: DashMap::new(),
            active: Mutex::new(ActiveQuerySet::new()),
            emitter: Emitter::new(),
        }
    }

    /// Replace the default [`Nfkd`] query normalizer.
    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn known_relation_count(&self) -> usize {
        self.known_relations.len()
    }

    pub fn active_query_count(&self) -> usize {
        self.lock_active().len()
    }

    /// Whether `input`, once normalized, is currently being traversed.
    pub fn is_active(&self, input: &str) -> bool {
        let normalized = self.normalizer.normalize(input);
        self.lock_active().contains(&normalized)
    }

    /// Load the root document's relations so the first query can skip it.
    ///
    /// Emits nothing. Returns the number of relations discovered.
    pub async fn prefetch(&self) -> FetchResult<usize> {
        let facts = self.fetcher.fetch(&self.source).await?;
        let page = split_page(facts);
        let count = page.links.len();
        for (child, keys) in page.links {
            self.known_relations.insert(child, keys);
        }
        tracing::debug!(source = %self.source, relations = count, "prefetched root");
        Ok(count)
    }

    fn lock_active(&self) -> MutexGuard<'_, ActiveQuerySet> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn score(&self, input: &str, keys: &[String]) -> Option<ScoreVector> {
        ScoreVector::best_of(&self.similarity, input, keys.iter().map(String::as_str))
    }

    fn seed(&self, input: &str) -> BinaryHeap<Candidate> {
        let mut queue = BinaryHeap::new();
        if self.known_relations.is_empty() {
            queue.push(Candidate {
                uri: self.source.clone(),
                scores: ScoreVector::default(),
            });
            return queue;
        }
        for entry in self.known_relations.iter() {
            if let Some(scores) = self.score(input, entry.value()) {
                queue.push(Candidate {
                    uri: entry.key().clone(),
                    scores,
                });
            }
        }
        queue
    }

    async fn traverse(&self, input: &str) {
        self.emitter.emit(&SearchEvent::reset(input));
        let normalized = self.normalizer.normalize(input);
        let (id, token) = self.lock_active().admit(&normalized);

        let mut queue = self.seed(&normalized);
        let mut visited: HashSet<String> = HashSet::new();
        let mut fetched = 0usize;
        tracing::info!(source = %self.source, query = input, seeds = queue.len(), "traversal started");

        while !token.is_cancelled() {
            let Some(candidate) = queue.pop() else {
                break;
            };
            if !visited.insert(candidate.uri.clone()) {
                continue;
            }

            let facts = match self.fetcher.fetch(&candidate.uri).await {
                Ok(facts) => facts,
                Err(error) => {
                    tracing::warn!(uri = %candidate.uri, %error, "skipping unreachable document");
                    continue;
                }
            };
            fetched += 1;
            if token.is_cancelled() {
                break;
            }

            let page = split_page(facts);
            tracing::debug!(
                uri = %candidate.uri,
                results = page.results.len(),
                links = page.links.len(),
                "document traversed"
            );
            for fact in page.results {
                self.emitter.emit(&SearchEvent::data(Arc::new(fact), input));
            }
            for (child, keys) in page.links {
                if visited.contains(&child) {
                    continue;
                }
                let scores = self.score(&normalized, &keys);
                self.known_relations.insert(child.clone(), keys);
                if let Some(scores) = scores {
                    queue.push(Candidate { uri: child, scores });
                }
            }
        }

        let cancelled = token.is_cancelled();
        self.lock_active().remove(id);
        tracing::info!(source = %self.source, query = input, fetched, cancelled, "traversal finished");
        self.emitter.emit(&SearchEvent::end(input));
    }
}

#[async_trait]
impl QueryEmitter for QueryAgent {
    async fn query(&self, input: &str) {
        self.traverse(input).await;
    }

    fn subscribe(&self, sink: Arc<dyn EventSink>) -> Subscription {
        self.emitter.subscribe(sink)
    }
}

impl std::fmt::Debug for QueryAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryAgent")
            .field("source", &self.source)
            .field("known_relations", &self.known_relations.len())
            .finish()
    }
}
