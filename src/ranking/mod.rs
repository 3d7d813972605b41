//! Incremental top-K ranking with reset + redraw bursts.
//!
//! Every accepted result re-announces the whole list: a `Reset` followed by
//! one `Data` per entry, best first. Listeners can therefore redraw from
//! scratch on every `Reset` without keeping their own state.
//!
//! Candidates are pruned as early as possible: once the list is full, the
//! last entry is the threshold, and scoring stops at the first comparison
//! stage where the candidate falls below it (as long as all earlier stages
//! tied).

pub mod overlap;
pub mod topk;

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;

use crate::event::{
    Emitter, EventSink, QueryEmitter, ResultMetadata, SearchEvent, Subscription, UpstreamHandler,
    relay_from,
};
use crate::fact::Fact;
use crate::normalize::Normalizer;
use crate::similarity::{ScoreVector, SimilarityConfiguration};

pub use self::topk::{RankedEntry, TopK};

#[derive(Debug)]
struct RankingState {
    /// The query as submitted; upstream data is tagged with it.
    raw: Option<String>,
    normalized: Option<String>,
    top: TopK,
    /// Bumped for every query forwarded upstream.
    generation: u64,
    /// Set while the upstream invocation of the current query is running.
    in_flight: bool,
}

/// Final pipeline stage: keeps the K best results of the current query.
///
/// Bursts are built under the state lock and delivered after it is released,
/// so listeners may read [`results`](Self::results) from `on_event`.
pub struct ResultRanking {
    upstream: Arc<dyn QueryEmitter>,
    similarity: Vec<SimilarityConfiguration>,
    normalizer: Arc<dyn Normalizer>,
    state: Mutex<RankingState>,
    /// Held while delivering, so bursts never interleave.
    emitting: Mutex<()>,
    emitter: Emitter,
    _upstream: Subscription,
}

impl ResultRanking {
    pub fn new(
        upstream: Arc<dyn QueryEmitter>,
        size: usize,
        similarity: Vec<SimilarityConfiguration>,
        normalizer: Arc<dyn Normalizer>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| Self {
            _upstream: relay_from(upstream.as_ref(), weak),
            upstream,
            similarity,
            normalizer,
            state: Mutex::new(RankingState {
                raw: None,
                normalized: None,
                top: TopK::new(size),
                generation: 0,
                in_flight: false,
            }),
            emitting: Mutex::new(()),
            emitter: Emitter::new(),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, RankingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_emitting(&self) -> MutexGuard<'_, ()> {
        self.emitting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, events: &[SearchEvent]) {
        for event in events {
            self.emitter.emit(event);
        }
    }

    /// Snapshot of the current top-K.
    pub fn results(&self) -> Vec<RankedEntry> {
        self.lock_state().top.entries().to_vec()
    }

    /// The query currently being ranked, as submitted.
    pub fn current_query(&self) -> Option<String> {
        self.lock_state().raw.clone()
    }

    /// Score `value` stage by stage. `None` when a stage is ineligible, or
    /// when the candidate drops below `threshold` while every earlier stage
    /// tied it.
    fn score(&self, query: &str, value: &str, threshold: Option<&ScoreVector>) -> Option<ScoreVector> {
        let mut scores = Vec::with_capacity(self.similarity.len());
        let mut tied = threshold.is_some();
        for (stage, config) in self.similarity.iter().enumerate() {
            let score = config.evaluate(query, value)?;
            if tied {
                match threshold.and_then(|t| t.as_slice().get(stage)) {
                    Some(bound) => match score.total_cmp(bound) {
                        Ordering::Less => return None,
                        Ordering::Greater => tied = false,
                        Ordering::Equal => {}
                    },
                    None => tied = false,
                }
            }
            scores.push(score);
        }
        Some(ScoreVector::new(scores))
    }

    fn rank(&self, state: &RankingState, fact: &Arc<Fact>) -> Option<RankedEntry> {
        let raw_value = fact.object.as_literal()?.value.as_str();
        let query = state.normalized.as_deref()?;
        let value = self.normalizer.normalize(raw_value);
        let threshold = state.top.threshold().map(|t| &t.scores);

        let Some(scores) = self.score(query, &value, threshold) else {
            tracing::trace!(value = raw_value, "pruned");
            return None;
        };
        Some(RankedEntry {
            scores,
            overlap: overlap::overlap(self.normalizer.as_ref(), query, raw_value),
            value,
            fact: fact.clone(),
        })
    }

    /// The events announcing the current list.
    fn burst(state: &RankingState) -> Vec<SearchEvent> {
        let query = state.raw.as_deref().unwrap_or_default();
        let mut events = Vec::with_capacity(state.top.len() + 1);
        events.push(SearchEvent::reset(query));
        events.extend(state.top.entries().iter().map(|entry| SearchEvent::Data {
            fact: entry.fact.clone(),
            metadata: ResultMetadata::ranked(query, &entry.scores, entry.overlap.clone()),
        }));
        events
    }
}

impl UpstreamHandler for ResultRanking {
    fn handle_upstream(&self, event: &SearchEvent) {
        match event {
            // Our own reset was already announced when the query started.
            SearchEvent::Reset { .. } => {}
            SearchEvent::Data { fact, metadata } => {
                let _emitting = self.lock_emitting();
                let burst = {
                    let mut state = self.lock_state();
                    if state.raw.as_deref() != Some(metadata.query.as_str()) {
                        tracing::trace!(query = %metadata.query, "stale result dropped");
                        return;
                    }
                    let Some(entry) = self.rank(&state, fact) else {
                        return;
                    };
                    if !state.top.insert(entry) {
                        return;
                    }
                    Self::burst(&state)
                };
                self.deliver(&burst);
            }
            SearchEvent::End { .. } => {
                let _emitting = self.lock_emitting();
                self.emitter.emit(event);
            }
        }
    }
}

#[async_trait]
impl QueryEmitter for ResultRanking {
    /// Rank `input`, or replay the current list when `input` normalizes to
    /// the current query.
    ///
    /// A replay is tagged with the query as first submitted. It ends with
    /// `End` only when that query's traversal has finished; otherwise the
    /// traversal's own `End` follows later.
    async fn query(&self, input: &str) {
        let normalized = self.normalizer.normalize(input);
        let generation = {
            let _emitting = self.lock_emitting();
            let mut events = Vec::new();
            let generation = {
                let mut state = self.lock_state();
                if state.normalized.as_deref() == Some(normalized.as_str()) {
                    tracing::debug!(query = input, results = state.top.len(), "replaying results");
                    events = Self::burst(&state);
                    if !state.in_flight {
                        events.push(SearchEvent::end(state.raw.as_deref().unwrap_or_default()));
                    }
                    None
                } else {
                    state.top.clear();
                    state.raw = Some(input.to_string());
                    state.normalized = Some(normalized);
                    state.generation += 1;
                    state.in_flight = true;
                    events.push(SearchEvent::reset(input));
                    Some(state.generation)
                }
            };
            self.deliver(&events);
            generation
        };
        let Some(generation) = generation else {
            return;
        };

        self.upstream.query(input).await;

        let mut state = self.lock_state();
        if state.generation == generation {
            state.in_flight = false;
        }
    }

    fn subscribe(&self, sink: Arc<dyn EventSink>) -> Subscription {
        self.emitter.subscribe(sink)
    }

    fn resolve_subject(&self, uri: &str) -> Vec<Fact> {
        self.upstream.resolve_subject(uri)
    }
}
