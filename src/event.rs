//! Typed events and the stage protocol of the search pipeline.
//!
//! Every stage implements [`QueryEmitter`]: it accepts queries and produces an
//! ordered stream of [`SearchEvent`]s delivered to subscribed [`EventSink`]s.
//! Stages compose by explicit construction: a downstream stage owns an `Arc`
//! of its upstream and subscribes to it. Subscribing returns a
//! [`Subscription`] token; dropping it unsubscribes.
//!
//! Delivery is synchronous, in the task that emits. Sinks must not block.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::fact::Fact;
use crate::similarity::ScoreVector;

// ── Events ──────────────────────────────────────────────────────────────

/// Auxiliary data accompanying an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// The query this event belongs to, as submitted by the caller.
    pub query: String,
    /// Score vector of a ranked result; empty upstream of ranking.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub similarity: Vec<f64>,
    /// Inclusive character ranges of the raw value that matched the query.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub overlap: Vec<(usize, usize)>,
}

impl ResultMetadata {
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn ranked(query: impl Into<String>, similarity: &ScoreVector, overlap: Vec<(usize, usize)>) -> Self {
        Self {
            query: query.into(),
            similarity: similarity.as_slice().to_vec(),
            overlap,
        }
    }
}

/// An event produced by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SearchEvent {
    /// The stage reset its state; listeners should clear derived state.
    Reset { metadata: ResultMetadata },
    /// A fact was found (upstream) or is part of the current top-K (ranking).
    Data {
        fact: Arc<Fact>,
        metadata: ResultMetadata,
    },
    /// The query finished or was abandoned.
    End { metadata: ResultMetadata },
}

impl SearchEvent {
    pub fn reset(query: impl Into<String>) -> Self {
        SearchEvent::Reset {
            metadata: ResultMetadata::for_query(query),
        }
    }

    pub fn data(fact: Arc<Fact>, query: impl Into<String>) -> Self {
        SearchEvent::Data {
            fact,
            metadata: ResultMetadata::for_query(query),
        }
    }

    pub fn end(query: impl Into<String>) -> Self {
        SearchEvent::End {
            metadata: ResultMetadata::for_query(query),
        }
    }

    pub fn metadata(&self) -> &ResultMetadata {
        match self {
            SearchEvent::Reset { metadata }
            | SearchEvent::Data { metadata, .. }
            | SearchEvent::End { metadata } => metadata,
        }
    }

    /// The query this event belongs to.
    pub fn query(&self) -> &str {
        &self.metadata().query
    }

    pub fn is_end(&self) -> bool {
        matches!(self, SearchEvent::End { .. })
    }
}

// ── Sinks ───────────────────────────────────────────────────────────────

/// A destination for pipeline events.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &SearchEvent);
}

type ListenerList = Mutex<Vec<(u64, Arc<dyn EventSink>)>>;

/// Listener registry owned by each stage.
#[derive(Default)]
pub struct Emitter {
    listeners: Arc<ListenerList>,
    next_id: AtomicU64,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, sink: Arc<dyn EventSink>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, sink));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver an event to every listener registered at the time of the call.
    pub fn emit(&self, event: &SearchEvent) {
        let snapshot: Vec<Arc<dyn EventSink>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, sink)| sink.clone())
            .collect();
        for sink in snapshot {
            sink.on_event(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Unsubscribes its listener when dropped or cancelled.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl Subscription {
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

/// Collects events into a `Vec` for testing.
#[derive(Default)]
pub struct VecSink {
    events: Mutex<Vec<SearchEvent>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SearchEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl EventSink for VecSink {
    fn on_event(&self, event: &SearchEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Forwards events into an unbounded tokio channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SearchEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving half of its channel.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SearchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: &SearchEvent) {
        // A closed receiver just means nobody is listening any more.
        let _ = self.tx.send(event.clone());
    }
}

// ── Stage protocol ──────────────────────────────────────────────────────

/// A pipeline stage: accepts queries, emits events.
#[async_trait]
pub trait QueryEmitter: Send + Sync {
    /// Run `input` through this stage. Resolves when the stage has finished
    /// (or abandoned) the query; results arrive as events, not as a value.
    async fn query(&self, input: &str);

    fn subscribe(&self, sink: Arc<dyn EventSink>) -> Subscription;

    /// Everything known locally about `uri`. Stages without a store know nothing.
    fn resolve_subject(&self, _uri: &str) -> Vec<Fact> {
        Vec::new()
    }
}

/// Handler for events coming from a stage's upstream.
pub(crate) trait UpstreamHandler: Send + Sync {
    fn handle_upstream(&self, event: &SearchEvent);
}

/// Weak relay from an upstream emitter to a downstream stage, so the upstream
/// never keeps its downstream alive.
pub(crate) struct Relay<T>(pub(crate) Weak<T>);

impl<T: UpstreamHandler> EventSink for Relay<T> {
    fn on_event(&self, event: &SearchEvent) {
        if let Some(stage) = self.0.upgrade() {
            stage.handle_upstream(event);
        }
    }
}

/// Subscribe a stage under construction to `upstream` through a [`Relay`].
pub(crate) fn relay_from<T: UpstreamHandler + 'static>(
    upstream: &dyn QueryEmitter,
    stage: &Weak<T>,
) -> Subscription {
    upstream.subscribe(Arc::new(Relay(stage.clone())))
}
