//! Active query bookkeeping and the supersede policy.
//!
//! Typing one more character (or deleting one) turns the running query into
//! a prefix or an extension of the new one. Such a query is obsolete: its
//! token is cancelled and the traversal loop stops at its next check.

use tokio_util::sync::CancellationToken;

/// Whether a new query `input` makes the running query `running` obsolete.
///
/// True when either string is a prefix of the other, identical strings included.
pub fn supersedes(input: &str, running: &str) -> bool {
    input.starts_with(running) || running.starts_with(input)
}

#[derive(Debug)]
struct ActiveQuery {
    id: u64,
    input: String,
    token: CancellationToken,
}

/// The queries an agent is currently traversing.
#[derive(Debug, Default)]
pub struct ActiveQuerySet {
    queries: Vec<ActiveQuery>,
    next_id: u64,
}

impl ActiveQuerySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and evict every query superseded by `input`, then register
    /// `input`. Returns the invocation id and its cancellation token.
    pub fn admit(&mut self, input: &str) -> (u64, CancellationToken) {
        self.queries.retain(|q| {
            if supersedes(input, &q.input) {
                tracing::debug!(superseded = %q.input, by = input, "cancelling obsolete query");
                q.token.cancel();
                false
            } else {
                true
            }
        });

        let id = self.next_id;
        self.next_id += 1;
        let token = CancellationToken::new();
        self.queries.push(ActiveQuery {
            id,
            input: input.to_string(),
            token: token.clone(),
        });
        (id, token)
    }

    /// Remove a finished invocation. Other invocations with the same input
    /// are left alone.
    pub fn remove(&mut self, id: u64) {
        self.queries.retain(|q| q.id != id);
    }

    pub fn contains(&self, input: &str) -> bool {
        self.queries.iter().any(|q| q.input == input)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
