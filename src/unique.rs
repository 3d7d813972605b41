//! Per-query deduplication of results.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;

use crate::event::{
    Emitter, EventSink, QueryEmitter, SearchEvent, Subscription, UpstreamHandler, relay_from,
};
use crate::fact::{Fact, Term};

#[derive(Debug, Default)]
struct SeenState {
    query: String,
    seen: HashSet<(Term, String)>,
}

/// Drops data whose (subject, value) pair was already emitted for the
/// current query.
pub struct ResultUniqueFilter {
    upstream: Arc<dyn QueryEmitter>,
    state: Mutex<SeenState>,
    emitter: Emitter,
    _upstream: Subscription,
}

impl ResultUniqueFilter {
    pub fn new(upstream: Arc<dyn QueryEmitter>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| Self {
            _upstream: relay_from(upstream.as_ref(), weak),
            upstream,
            state: Mutex::new(SeenState::default()),
            emitter: Emitter::new(),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, SeenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `fact` has not been seen yet for `query`. Records it if so.
    fn admit(&self, fact: &Fact, query: &str) -> bool {
        let mut state = self.lock_state();
        if state.query != query {
            // Stale or foreign query: nothing to dedup against.
            return true;
        }
        state
            .seen
            .insert((fact.subject.clone(), fact.object.value().to_string()))
    }
}

impl UpstreamHandler for ResultUniqueFilter {
    fn handle_upstream(&self, event: &SearchEvent) {
        match event {
            SearchEvent::Reset { metadata } => {
                {
                    let mut state = self.lock_state();
                    state.query.clone_from(&metadata.query);
                    state.seen.clear();
                }
                self.emitter.emit(event);
            }
            SearchEvent::Data { fact, metadata } => {
                if self.admit(fact, &metadata.query) {
                    self.emitter.emit(event);
                } else {
                    tracing::trace!(subject = %fact.subject, value = fact.object.value(), "duplicate dropped");
                }
            }
            SearchEvent::End { .. } => self.emitter.emit(event),
        }
    }
}

#[async_trait]
impl QueryEmitter for ResultUniqueFilter {
    async fn query(&self, input: &str) {
        self.upstream.query(input).await;
    }

    fn subscribe(&self, sink: Arc<dyn EventSink>) -> Subscription {
        self.emitter.subscribe(sink)
    }

    fn resolve_subject(&self, uri: &str) -> Vec<Fact> {
        self.upstream.resolve_subject(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VecSink;

    /// Replays a scripted event sequence on every query.
    struct Script {
        events: Vec<SearchEvent>,
        emitter: Emitter,
    }

    #[async_trait]
    impl QueryEmitter for Script {
        async fn query(&self, _input: &str) {
            for event in &self.events {
                self.emitter.emit(event);
            }
        }

        fn subscribe(&self, sink: Arc<dyn EventSink>) -> Subscription {
            self.emitter.subscribe(sink)
        }
    }

    fn anne(subject: &str) -> Arc<Fact> {
        Arc::new(Fact::text(subject, "http://schema.org/name", "Anne"))
    }

    async fn filtered(events: Vec<SearchEvent>) -> Vec<SearchEvent> {
        let script = Arc::new(Script {
            events,
            emitter: Emitter::new(),
        });
        let filter = ResultUniqueFilter::new(script.clone());
        let sink = Arc::new(VecSink::new());
        let _sub = filter.subscribe(sink.clone());
        filter.query("ann").await;
        sink.events()
    }

    fn data_count(events: &[SearchEvent]) -> usize {
        events.iter().filter(|e| matches!(e, SearchEvent::Data { .. })).count()
    }

    #[tokio::test]
    async fn duplicate_subject_value_is_dropped() {
        let events = filtered(vec![
            SearchEvent::reset("ann"),
            SearchEvent::data(anne("https://ex.org/anne"), "ann"),
            SearchEvent::data(anne("https://ex.org/anne"), "ann"),
            SearchEvent::data(anne("https://ex.org/anne-2"), "ann"),
            SearchEvent::end("ann"),
        ])
        .await;
        assert_eq!(data_count(&events), 2);
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn reset_clears_seen_set() {
        let events = filtered(vec![
            SearchEvent::reset("ann"),
            SearchEvent::data(anne("https://ex.org/anne"), "ann"),
            SearchEvent::reset("ann"),
            SearchEvent::data(anne("https://ex.org/anne"), "ann"),
        ])
        .await;
        assert_eq!(data_count(&events), 2);
    }

    #[tokio::test]
    async fn stale_query_data_passes_unrecorded() {
        let events = filtered(vec![
            SearchEvent::reset("ann"),
            SearchEvent::data(anne("https://ex.org/anne"), "an"),
            SearchEvent::data(anne("https://ex.org/anne"), "an"),
            SearchEvent::data(anne("https://ex.org/anne"), "ann"),
        ])
        .await;
        assert_eq!(data_count(&events), 3);
    }
}
