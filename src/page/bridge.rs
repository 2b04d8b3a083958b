use anyhow::{anyhow, Result};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};
use tauri::{Runtime, WebviewWindow};
use tokio::{sync::oneshot, time::Duration};

use super::query::PageQuery;

const QUERY_TIMEOUT_SECS: u64 = 5;

/// Correlates page queries with their responses.
///
/// A query evaluates a script on the webview; the script invokes the
/// `page_response` command with the allocated request id, which routes back
/// here through [`PageBridge::resolve`]. While a page is loading the script
/// never runs and the query times out, which the sync loop treats as a
/// skipped tick.
pub struct PageBridge {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
}

impl PageBridge {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub async fn query<R: Runtime>(
        &self,
        webview: &WebviewWindow<R>,
        query: PageQuery,
    ) -> Result<Value> {
        let mut pending = self.register();

        let script = query.script(pending.id);
        if let Err(err) = webview.eval(&script) {
            return Err(anyhow!("failed to evaluate {query} query: {err}"));
        }

        match tokio::time::timeout(Duration::from_secs(QUERY_TIMEOUT_SECS), &mut pending.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(anyhow!("{query} query responder dropped")),
            Err(_) => Err(anyhow!("{query} query timed out (> {QUERY_TIMEOUT_SECS}s)")),
        }
    }

    /// Hand the value delivered by the page to the waiting query, if any.
    /// Unknown ids (late answers from a timed-out cycle) are dropped.
    pub fn resolve(&self, id: u64, value: Value) {
        if let Some(tx) = self.pending.lock().unwrap().remove(&id) {
            let _ = tx.send(value);
        }
    }

    fn register(&self) -> PendingQuery<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);
        PendingQuery { bridge: self, id, rx }
    }

    fn discard(&self, id: u64) {
        self.pending.lock().unwrap().remove(&id);
    }
}

/// An allocated request id with its response channel. Dropping it discards
/// the map entry, so a query that is cancelled mid-flight (the sync loop
/// times whole ticks out) cannot leave a sender behind.
struct PendingQuery<'a> {
    bridge: &'a PageBridge,
    id: u64,
    rx: oneshot::Receiver<Value>,
}

impl Drop for PendingQuery<'_> {
    fn drop(&mut self) {
        self.bridge.discard(self.id);
    }
}

impl Default for PageBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn resolve_delivers_to_registered_query() {
        let bridge = PageBridge::new();
        let mut pending = bridge.register();
        bridge.resolve(pending.id, json!(true));
        assert_eq!((&mut pending.rx).await.unwrap(), json!(true));
    }

    #[tokio::test]
    async fn resolve_with_unknown_id_is_a_no_op() {
        let bridge = PageBridge::new();
        bridge.resolve(999, json!("late"));
        assert!(bridge.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_query_discards_its_entry() {
        let bridge = PageBridge::new();
        let id = {
            let pending = bridge.register();
            pending.id
        };

        // A tick timeout drops the query future before its own deadline;
        // the entry must not linger until the page answers.
        assert!(bridge.pending.lock().unwrap().is_empty());

        // A late answer for the dropped query is silently ignored.
        bridge.resolve(id, json!("late"));
        assert!(bridge.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn discard_drops_the_responder() {
        let bridge = PageBridge::new();
        let mut pending = bridge.register();
        bridge.discard(pending.id);
        assert!((&mut pending.rx).await.is_err());
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let bridge = PageBridge::new();
        let a = bridge.register().id;
        let b = bridge.register().id;
        assert!(b > a);
    }
}
