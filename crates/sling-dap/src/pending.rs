//! Outstanding-request table keyed by request `seq`.

use std::collections::HashMap;

use tokio::sync::oneshot;

use crate::dispatcher::FollowUp;
use crate::error::DapError;
use crate::protocol::Response;

/// Completion side of a host command.
pub type Responder = oneshot::Sender<Result<Response, DapError>>;

/// Who is waiting on an outstanding request.
#[derive(Debug)]
pub enum PendingItem {
    /// A host command awaiting its response.
    Command {
        /// Command name, for diagnostics.
        command: String,
        /// Resolves the caller's future.
        responder: Responder,
    },
    /// A request the client issued on its own behalf.
    FollowUp(FollowUp),
}

/// Requests sent to the adapter and not yet answered.
///
/// Each entry is removed exactly once: by its response, by a timeout, by a
/// send failure, or by [`drain`](PendingRequests::drain) when the transport
/// closes.
#[derive(Debug, Default)]
pub struct PendingRequests {
    items: HashMap<i64, PendingItem>,
}

impl PendingRequests {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a request.
    pub fn insert(&mut self, seq: i64, item: PendingItem) {
        if self.items.insert(seq, item).is_some() {
            tracing::warn!(seq, "replaced a pending request with the same seq");
        }
    }

    /// Remove and return the entry for `seq`.
    pub fn take(&mut self, seq: i64) -> Option<PendingItem> {
        self.items.remove(&seq)
    }

    /// Whether `seq` is still outstanding.
    pub fn contains(&self, seq: i64) -> bool {
        self.items.contains_key(&seq)
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every entry, in ascending `seq` order.
    pub fn drain(&mut self) -> Vec<(i64, PendingItem)> {
        let mut all: Vec<_> = self.items.drain().collect();
        all.sort_by_key(|(seq, _)| *seq);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(name: &str) -> (PendingItem, oneshot::Receiver<Result<Response, DapError>>) {
        let (tx, rx) = oneshot::channel();
        (
            PendingItem::Command {
                command: name.into(),
                responder: tx,
            },
            rx,
        )
    }

    #[test]
    fn pending_take_removes_once() {
        let mut table = PendingRequests::new();
        let (item, _rx) = command("threads");
        table.insert(3, item);
        assert!(table.contains(3));
        assert!(matches!(table.take(3), Some(PendingItem::Command { .. })));
        assert!(table.take(3).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn pending_unknown_seq_is_none() {
        let mut table = PendingRequests::new();
        assert!(table.take(42).is_none());
    }

    #[test]
    fn pending_drain_is_ordered_and_empties() {
        let mut table = PendingRequests::new();
        for seq in [5, 1, 3] {
            let (item, _rx) = command("next");
            table.insert(seq, item);
        }
        table.insert(2, PendingItem::FollowUp(FollowUp::RefreshThreads));
        let seqs: Vec<i64> = table.drain().into_iter().map(|(s, _)| s).collect();
        assert_eq!(seqs, vec![1, 2, 3, 5]);
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn pending_responder_reaches_receiver() {
        let mut table = PendingRequests::new();
        let (item, rx) = command("pause");
        table.insert(1, item);
        if let Some(PendingItem::Command { responder, .. }) = table.take(1) {
            let _ = responder.send(Err(DapError::Transport("gone".into())));
        }
        assert!(matches!(rx.await, Ok(Err(DapError::Transport(_)))));
    }
}
