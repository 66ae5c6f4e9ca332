//! The pending-request table.
//!
//! Every outbound request owns one entry from the moment it is sent until
//! it completes. Whoever removes the entry decides the outcome: the reader
//! task when a response arrives, or the waiting caller on timeout,
//! cancellation or disconnect. Removal happens under one lock, so exactly
//! one of them wins.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use mcplink_core::error::McpError;
use mcplink_core::protocol::{RequestId, Response};
use tokio::sync::oneshot;
use tracing::trace;

#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: Mutex<HashMap<RequestId, oneshot::Sender<Response>>>,
}

impl PendingTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, oneshot::Sender<Response>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `id` and return the slot its response will be delivered to.
    pub(crate) fn insert(&self, id: RequestId) -> Result<oneshot::Receiver<Response>, McpError> {
        let mut entries = self.lock();
        if entries.contains_key(&id) {
            return Err(McpError::DuplicateRequestId { id: id.to_string() });
        }
        let (tx, rx) = oneshot::channel();
        entries.insert(id, tx);
        Ok(rx)
    }

    /// Deliver a response. Returns `false` if no entry matched.
    pub(crate) fn complete(&self, response: Response) -> bool {
        let Some(slot) = self.lock().remove(&response.id) else {
            return false;
        };
        let id = response.id.clone();
        if slot.send(response).is_err() {
            trace!(%id, "waiter went away before its response was delivered");
        }
        true
    }

    /// Remove an entry without completing it. Returns `true` if this call
    /// removed it.
    pub(crate) fn remove(&self, id: &RequestId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Drop every entry; their waiters observe a closed slot.
    pub(crate) fn drain(&self) -> usize {
        let mut entries = self.lock();
        let n = entries.len();
        entries.clear();
        n
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Removes an entry when the owning request future is dropped early.
pub(crate) struct PendingGuard<'a> {
    table: &'a PendingTable,
    id: Option<RequestId>,
}

impl<'a> PendingGuard<'a> {
    pub(crate) const fn new(table: &'a PendingTable, id: RequestId) -> Self {
        Self {
            table,
            id: Some(id),
        }
    }

    /// The entry has been removed by someone else; nothing left to do.
    pub(crate) fn disarm(&mut self) {
        self.id = None;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.table.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_complete_delivers_once() {
        let table = PendingTable::default();
        let rx = table.insert(RequestId::Number(1)).unwrap();

        assert!(table.complete(Response::success(RequestId::Number(1), json!("first"))));
        assert!(!table.complete(Response::success(RequestId::Number(1), json!("second"))));

        let response = rx.await.unwrap();
        assert_eq!(response.result, Some(json!("first")));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_remove_beats_late_response() {
        let table = PendingTable::default();
        let _rx = table.insert(RequestId::Number(5)).unwrap();

        assert!(table.remove(&RequestId::Number(5)));
        assert!(!table.remove(&RequestId::Number(5)));
        assert!(!table.complete(Response::success(RequestId::Number(5), json!(null))));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let table = PendingTable::default();
        let _rx = table.insert(RequestId::from("a")).unwrap();
        let err = table.insert(RequestId::from("a")).unwrap_err();
        assert!(matches!(err, McpError::DuplicateRequestId { .. }));
    }

    #[test]
    fn test_guard_removes_on_drop() {
        let table = PendingTable::default();
        let _rx = table.insert(RequestId::Number(9)).unwrap();
        {
            let _guard = PendingGuard::new(&table, RequestId::Number(9));
        }
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_drain_closes_waiters() {
        let table = PendingTable::default();
        let rx = table.insert(RequestId::Number(1)).unwrap();

        assert_eq!(table.drain(), 1);
        assert!(rx.await.is_err());
    }
}
