//! Fan-out of one query to several stages, fan-in of their data.
//!
//! Every invocation gets its own completion counter, so two concurrent
//! invocations with the same input each end exactly once.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::event::{
    Emitter, EventSink, QueryEmitter, SearchEvent, Subscription, UpstreamHandler, relay_from,
};
use crate::fact::Fact;

/// Merges the event streams of several child stages.
pub struct QueryAggregator {
    children: Vec<Arc<dyn QueryEmitter>>,
    emitter: Emitter,
    next_invocation: AtomicU64,
    _upstream: Vec<Subscription>,
}

impl QueryAggregator {
    pub fn new(children: Vec<Arc<dyn QueryEmitter>>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let upstream = children
                .iter()
                .map(|child| relay_from(child.as_ref(), weak))
                .collect();
            Self {
                children,
                emitter: Emitter::new(),
                next_invocation: AtomicU64::new(0),
                _upstream: upstream,
            }
        })
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

impl UpstreamHandler for QueryAggregator {
    fn handle_upstream(&self, event: &SearchEvent) {
        // Children announce their own resets and ends; only ours count.
        if let SearchEvent::Data { .. } = event {
            self.emitter.emit(event);
        }
    }
}

#[async_trait]
impl QueryEmitter for QueryAggregator {
    async fn query(&self, input: &str) {
        let invocation = self.next_invocation.fetch_add(1, Ordering::Relaxed);
        let remaining = AtomicUsize::new(self.children.len());
        self.emitter.emit(&SearchEvent::reset(input));

        if self.children.is_empty() {
            self.emitter.emit(&SearchEvent::end(input));
            return;
        }

        let remaining = &remaining;
        join_all(self.children.iter().map(|child| async move {
            child.query(input).await;
            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                tracing::debug!(invocation, query = input, "all sources finished");
                self.emitter.emit(&SearchEvent::end(input));
            }
        }))
        .await;
    }

    fn subscribe(&self, sink: Arc<dyn EventSink>) -> Subscription {
        self.emitter.subscribe(sink)
    }

    fn resolve_subject(&self, uri: &str) -> Vec<Fact> {
        self.children
            .iter()
            .flat_map(|child| child.resolve_subject(uri))
            .collect()
    }
}
