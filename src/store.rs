//! In-memory index of everything the current query has seen.
//!
//! Backed by an oxigraph [`Store`], cleared on every upstream reset. The
//! index lets a caller look up all facts about a result subject (for example
//! to show a label next to the matched value) without fetching again.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use oxigraph::model::{NamedNode, Quad};
use oxigraph::store::Store;

use crate::error::StoreError;
use crate::event::{
    Emitter, EventSink, QueryEmitter, SearchEvent, Subscription, UpstreamHandler, relay_from,
};
use crate::fact::Fact;

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend {
        message: e.to_string(),
    }
}

/// Indexes upstream facts and forwards only result candidates.
pub struct ResultStore {
    upstream: Arc<dyn QueryEmitter>,
    store: Store,
    emitter: Emitter,
    _upstream: Subscription,
}

impl ResultStore {
    pub fn new(upstream: Arc<dyn QueryEmitter>) -> Result<Arc<Self>, StoreError> {
        let store = Store::new().map_err(backend)?;
        Ok(Arc::new_cyclic(|weak: &Weak<Self>| Self {
            _upstream: relay_from(upstream.as_ref(), weak),
            upstream,
            store,
            emitter: Emitter::new(),
        }))
    }

    /// Number of indexed facts.
    pub fn len(&self) -> Result<usize, StoreError> {
        self.store.len().map_err(backend)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        self.store.is_empty().map_err(backend)
    }

    fn index(&self, fact: &Fact) -> Result<(), StoreError> {
        let quad = Quad::try_from(fact)?;
        self.store.insert(&quad).map_err(backend)?;
        Ok(())
    }
}

impl UpstreamHandler for ResultStore {
    fn handle_upstream(&self, event: &SearchEvent) {
        match event {
            SearchEvent::Reset { .. } => {
                if let Err(error) = self.store.clear() {
                    tracing::warn!(%error, "failed to clear result store");
                }
                self.emitter.emit(event);
            }
            SearchEvent::Data { fact, .. } => {
                if let Err(error) = self.index(fact) {
                    tracing::warn!(%error, fact = %fact, "fact not indexed");
                }
                if fact.is_result_candidate() {
                    self.emitter.emit(event);
                }
            }
            SearchEvent::End { .. } => self.emitter.emit(event),
        }
    }
}

#[async_trait]
impl QueryEmitter for ResultStore {
    async fn query(&self, input: &str) {
        self.upstream.query(input).await;
    }

    fn subscribe(&self, sink: Arc<dyn EventSink>) -> Subscription {
        self.emitter.subscribe(sink)
    }

    /// All indexed facts with `uri` as subject, sorted.
    fn resolve_subject(&self, uri: &str) -> Vec<Fact> {
        let Ok(subject) = NamedNode::new(uri) else {
            return Vec::new();
        };
        let mut facts: Vec<Fact> = self
            .store
            .quads_for_pattern(Some(subject.as_ref().into()), None, None, None)
            .filter_map(|quad| match quad {
                Ok(quad) => Some(Fact::from(quad)),
                Err(error) => {
                    tracing::warn!(%error, uri, "store read failed");
                    None
                }
            })
            .collect();
        facts.sort();
        facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VecSink;
    use crate::fact::{Literal, Term};

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

    const ANNE: &str = "https://ex.org/anne";

    fn scripted(events: Vec<SearchEvent>) -> Arc<ResultStore> {
        ResultStore::new(Arc::new(Script {
            events,
            emitter: Emitter::new(),
        }))
        .unwrap()
    }

    fn anne_facts() -> Vec<SearchEvent> {
        let birth = Fact::new(
            Term::named(ANNE),
            "http://schema.org/birthDate",
            Term::Literal(Literal::typed("1929-06-12", "http://www.w3.org/2001/XMLSchema#date")),
        );
        vec![
            SearchEvent::reset("ann"),
            SearchEvent::data(Arc::new(Fact::text(ANNE, "http://schema.org/name", "Anne")), "ann"),
            SearchEvent::data(Arc::new(birth), "ann"),
            SearchEvent::end("ann"),
        ]
    }

    #[tokio::test]
    async fn forwards_only_result_candidates() {
        let store = scripted(anne_facts());
        let sink = Arc::new(VecSink::new());
        let _sub = store.subscribe(sink.clone());

        store.query("ann").await;

        let data: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, SearchEvent::Data { .. }))
            .collect();
        assert_eq!(data.len(), 1);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn resolve_subject_returns_every_indexed_fact() {
        let store = scripted(anne_facts());
        store.query("ann").await;

        let facts = store.resolve_subject(ANNE);
        assert_eq!(facts.len(), 2);
        assert!(facts.iter().any(|f| f.object.value() == "1929-06-12"));
        assert!(store.resolve_subject("https://ex.org/nobody").is_empty());
        assert!(store.resolve_subject("not an iri").is_empty());
    }

    #[tokio::test]
    async fn reset_clears_index() {
        let mut events = anne_facts();
        events.push(SearchEvent::reset("bo"));
        let store = scripted(events);
        store.query("ann").await;
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn unconvertible_fact_is_skipped() {
        let bad = Fact::new(
            Term::named(ANNE),
            "not a predicate iri",
            Term::Literal(Literal::string("Anne")),
        );
        let store = scripted(vec![SearchEvent::data(Arc::new(bad), "ann")]);
        let sink = Arc::new(VecSink::new());
        let _sub = store.subscribe(sink.clone());

        store.query("ann").await;

        assert!(store.is_empty().unwrap());
        // Still a result candidate, so still forwarded.
        assert_eq!(sink.len(), 1);
    }
}
