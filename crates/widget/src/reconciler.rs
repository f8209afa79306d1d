//! Client reconciler
//!
//! Holds the widget's cached cart and applies two kinds of events to it:
//! tool-call deltas (merged by name, incoming fields win) and direct user
//! edits (published optimistically, then pushed to the backend as a full
//! replacement). Each event runs to completion through `&mut self`, so the
//! reconciler itself needs no locking.
//!
//! Backend pushes go through a single worker task. Snapshots are sent in
//! edit order, and a snapshot still queued when a newer one arrives is
//! never sent, so the backend always ends on the latest local view.

use std::sync::Arc;

use cartsync_core::domain::cart::{CartId, CartItem};
use cartsync_core::domain::sync::{CartToolOutput, SyncRequest};
use cartsync_core::fingerprint::DeltaFingerprint;
use cartsync_core::merge::overwrite_items;
use serde_json::Value;
use thiserror::Error;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::client::CartSyncClient;

const SESSION_META_KEY: &str = "openai/widgetSessionId";

/// The widget's local view of one cart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CartSnapshot {
    pub cart_id: Option<CartId>,
    pub items: Vec<CartItem>,
}

impl CartSnapshot {
    pub fn quantity_of(&self, name: &str) -> u32 {
        self.items.iter().find(|item| item.name == name).map_or(0, |item| item.quantity)
    }
}

/// A tool result as delivered to the widget host.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutputDelta {
    pub tool_output: Value,
    pub metadata: Option<Value>,
}

impl ToolOutputDelta {
    pub fn new(tool_output: Value, metadata: Option<Value>) -> Self {
        Self { tool_output, metadata }
    }

    fn session_cart_id(&self) -> Option<CartId> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.get(SESSION_META_KEY))
            .and_then(Value::as_str)
            .map(CartId::from)
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("tool output is not a cart payload: {0}")]
    MalformedDelta(#[from] serde_json::Error),

    #[error("local edits need a running tokio runtime for the sync worker: {0}")]
    NoRuntime(#[from] TryCurrentError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Same fingerprint as the previous delta. Nothing changed.
    Skipped,
    Applied(CartSnapshot),
}

/// A direct user interaction on the rendered cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEdit {
    /// Increments an existing line by one, or appends it at quantity 1.
    Add { name: String },
    /// Increments by `by`, appending the line if it is absent.
    Increment { name: String, by: u32 },
    /// Decrements by `by`; the line is removed once it reaches zero.
    Decrement { name: String, by: u32 },
}

impl LocalEdit {
    pub fn add(name: impl Into<String>) -> Self {
        LocalEdit::Add { name: name.into() }
    }

    pub fn increment(name: impl Into<String>, by: u32) -> Self {
        LocalEdit::Increment { name: name.into(), by }
    }

    pub fn decrement(name: impl Into<String>, by: u32) -> Self {
        LocalEdit::Decrement { name: name.into(), by }
    }

    fn apply(&self, items: &mut Vec<CartItem>) -> bool {
        match self {
            LocalEdit::Add { name } => increment_line(items, name, 1),
            LocalEdit::Increment { name, by } => increment_line(items, name, *by),
            LocalEdit::Decrement { name, by } => {
                let Some(position) = items.iter().position(|item| &item.name == name) else {
                    return false;
                };
                if *by == 0 {
                    return false;
                }
                let remaining = items[position].quantity.saturating_sub(*by);
                if remaining == 0 {
                    items.remove(position);
                } else {
                    items[position].quantity = remaining;
                }
                true
            }
        }
    }
}

fn increment_line(items: &mut Vec<CartItem>, name: &str, by: u32) -> bool {
    if by == 0 || name.trim().is_empty() {
        return false;
    }
    match items.iter_mut().find(|item| item.name == name) {
        Some(item) => item.quantity = item.quantity.saturating_add(by),
        None => items.push(CartItem::new(name, by)),
    }
    true
}

/// Result of a local edit. `push` tracks the backend write, absent when
/// the edit changed nothing.
#[derive(Debug)]
pub struct LocalEditOutcome {
    pub snapshot: CartSnapshot,
    pub push: Option<PendingPush>,
}

/// Handle on one queued backend write.
#[derive(Debug, Clone)]
pub struct PendingPush {
    generation: u64,
    settled: watch::Receiver<u64>,
}

impl PendingPush {
    /// Resolves once this snapshot, or a newer one that replaced it in the
    /// queue, has been pushed. Failed pushes count as settled.
    pub async fn settled(mut self) {
        let generation = self.generation;
        // An error means the worker is gone and nothing more will be sent.
        let _ = self.settled.wait_for(|done| *done >= generation).await;
    }
}

struct PushJob {
    generation: u64,
    request: SyncRequest,
}

struct PushWorker {
    jobs: mpsc::UnboundedSender<PushJob>,
    settled: watch::Receiver<u64>,
}

impl PushWorker {
    fn spawn(handle: &Handle, client: Arc<dyn CartSyncClient>) -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel::<PushJob>();
        let (settle, settled) = watch::channel(0);
        handle.spawn(async move {
            while let Some(mut job) = queue.recv().await {
                while let Ok(newer) = queue.try_recv() {
                    debug!(event_name = "widget.sync.superseded", generation = job.generation, "queued snapshot replaced");
                    job = newer;
                }
                push_snapshot(client.as_ref(), job.request).await;
                settle.send_replace(job.generation);
            }
        });
        Self { jobs, settled }
    }
}

async fn push_snapshot(client: &dyn CartSyncClient, request: SyncRequest) {
    let cart_id = request.cart_id.clone();
    match client.push(request).await {
        Ok(response) => {
            debug!(event_name = "widget.sync.pushed", cart_id = %response.cart_id, "backend accepted snapshot")
        }
        Err(error) => {
            warn!(event_name = "widget.sync.failed", cart_id = ?cart_id, error = %error, "backend sync failed")
        }
    }
}

pub struct CartReconciler {
    snapshot: CartSnapshot,
    last_fingerprint: Option<DeltaFingerprint>,
    publisher: watch::Sender<CartSnapshot>,
    client: Arc<dyn CartSyncClient>,
    worker: Option<PushWorker>,
    generation: u64,
}

impl CartReconciler {
    pub fn new(client: Arc<dyn CartSyncClient>) -> Self {
        Self::with_snapshot(client, CartSnapshot::default())
    }

    pub fn with_snapshot(client: Arc<dyn CartSyncClient>, snapshot: CartSnapshot) -> Self {
        let (publisher, _) = watch::channel(snapshot.clone());
        Self { snapshot, last_fingerprint: None, publisher, client, worker: None, generation: 0 }
    }

    pub fn snapshot(&self) -> &CartSnapshot {
        &self.snapshot
    }

    /// Presentation layers watch this for every published view.
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.publisher.subscribe()
    }

    /// Merges a tool-call delta into the local view. Re-delivery of the
    /// delta processed last is a no-op.
    pub fn apply_tool_output(
        &mut self,
        delta: &ToolOutputDelta,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let fingerprint = DeltaFingerprint::of(&delta.tool_output, delta.metadata.as_ref());
        if self.last_fingerprint == Some(fingerprint) {
            debug!(event_name = "widget.delta.skipped", fingerprint = %fingerprint.to_hex(), "delta already applied");
            return Ok(ReconcileOutcome::Skipped);
        }

        let output: CartToolOutput = serde_json::from_value(delta.tool_output.clone())?;
        self.last_fingerprint = Some(fingerprint);

        let mut next = self.snapshot.clone();
        if output.checkout {
            next.items.clear();
        } else {
            overwrite_items(&mut next.items, output.items);
        }
        if next.cart_id.is_none() {
            next.cart_id = output.cart_id.or_else(|| delta.session_cart_id());
        }

        info!(
            event_name = "widget.delta.applied",
            cart_id = ?next.cart_id,
            checkout = output.checkout,
            line_count = next.items.len(),
            "tool output reconciled"
        );
        self.publish(next.clone());
        Ok(ReconcileOutcome::Applied(next))
    }

    /// Applies a user edit, publishes it immediately and queues the full
    /// list for the backend. A failed push is logged and never rolls the
    /// local view back.
    ///
    /// Must be called from within a tokio runtime, which hosts the sync
    /// worker. Outside one the edit is not applied and `NoRuntime` is
    /// returned.
    pub fn apply_local_edit(&mut self, edit: LocalEdit) -> Result<LocalEditOutcome, ReconcileError> {
        let mut next = self.snapshot.clone();
        if !edit.apply(&mut next.items) {
            return Ok(LocalEditOutcome { snapshot: next, push: None });
        }
        self.ensure_worker()?;
        let cart_id = next.cart_id.get_or_insert_with(CartId::generate).clone();

        debug!(event_name = "widget.edit.applied", cart_id = %cart_id, edit = ?edit, "local edit published");
        self.publish(next.clone());

        self.generation += 1;
        let job = PushJob {
            generation: self.generation,
            request: SyncRequest { cart_id: Some(cart_id.clone()), items: next.items.clone() },
        };
        let push = self.worker.as_ref().and_then(|worker| match worker.jobs.send(job) {
            Ok(()) => Some(PendingPush { generation: self.generation, settled: worker.settled.clone() }),
            Err(_) => {
                warn!(event_name = "widget.sync.worker_closed", cart_id = %cart_id, "sync worker stopped, snapshot not queued");
                None
            }
        });

        Ok(LocalEditOutcome { snapshot: next, push })
    }

    fn ensure_worker(&mut self) -> Result<(), ReconcileError> {
        if self.worker.as_ref().is_some_and(|worker| !worker.jobs.is_closed()) {
            return Ok(());
        }
        let handle = Handle::try_current()?;
        self.worker = Some(PushWorker::spawn(&handle, Arc::clone(&self.client)));
        Ok(())
    }

    fn publish(&mut self, next: CartSnapshot) {
        self.snapshot = next.clone();
        self.publisher.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use cartsync_core::domain::cart::{CartId, CartItem};
    use cartsync_core::domain::sync::{SyncRequest, SyncResponse, SyncStatus};
    use cartsync_store::{CartRepository, InMemoryCartStore};
    use serde_json::json;

    use super::*;
    use crate::client::{CartSyncClient, StoreCartSync, SyncError};

    #[derive(Default)]
    struct RecordingClient {
        pushes: Mutex<Vec<SyncRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl CartSyncClient for RecordingClient {
        async fn push(&self, request: SyncRequest) -> Result<SyncResponse, SyncError> {
            let cart_id = request.cart_id.clone().unwrap_or_else(CartId::generate);
            self.pushes.lock().expect("lock").push(request);
            if self.fail {
                return Err(SyncError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
            }
            Ok(SyncResponse { status: SyncStatus::Updated, cart_id })
        }
    }

    /// Holds back the single-unit snapshot so a later snapshot could
    /// overtake it if pushes were not ordered.
    struct SlowSingleUnitPush {
        inner: StoreCartSync,
    }

    #[async_trait]
    impl CartSyncClient for SlowSingleUnitPush {
        async fn push(&self, request: SyncRequest) -> Result<SyncResponse, SyncError> {
            if request.items.iter().map(|item| item.quantity).sum::<u32>() == 1 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.inner.push(request).await
        }
    }

    fn delta(items: serde_json::Value) -> ToolOutputDelta {
        ToolOutputDelta::new(
            json!({ "cartId": "C1", "items": items }),
            Some(json!({ "openai/widgetSessionId": "C1" })),
        )
    }

    fn lines(snapshot: &CartSnapshot) -> Vec<(&str, u32)> {
        snapshot.items.iter().map(|item| (item.name.as_str(), item.quantity)).collect()
    }

    #[tokio::test]
    async fn identical_delta_is_applied_once() {
        let client = Arc::new(RecordingClient::default());
        let mut reconciler = CartReconciler::new(client.clone());
        let mut updates = reconciler.subscribe();
        let incoming = delta(json!([{ "name": "Eggs", "quantity": 2 }]));

        let first = reconciler.apply_tool_output(&incoming).expect("first");
        assert!(matches!(first, ReconcileOutcome::Applied(_)));
        assert!(updates.has_changed().expect("open"));
        let _ = updates.borrow_and_update();

        let second = reconciler.apply_tool_output(&incoming).expect("second");
        assert_eq!(second, ReconcileOutcome::Skipped);
        assert!(!updates.has_changed().expect("open"));
        assert!(client.pushes.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn delta_overwrites_quantities_instead_of_summing() {
        let mut reconciler = CartReconciler::new(Arc::new(RecordingClient::default()));
        reconciler.apply_tool_output(&delta(json!([{ "name": "Eggs", "quantity": 2 }]))).expect("a");
        let later = delta(json!([{ "name": "Eggs", "quantity": 4 }, { "name": "Milk", "quantity": 1 }]));
        reconciler.apply_tool_output(&later).expect("b");

        assert_eq!(lines(reconciler.snapshot()), vec![("Eggs", 4), ("Milk", 1)]);
        assert_eq!(reconciler.snapshot().cart_id, Some(CartId::from("C1")));
    }

    #[tokio::test]
    async fn checkout_delta_discards_local_edits() {
        let client = Arc::new(RecordingClient::default());
        let mut reconciler = CartReconciler::new(client);
        reconciler.apply_tool_output(&delta(json!([{ "name": "Eggs", "quantity": 2 }]))).expect("a");
        let outcome = reconciler.apply_local_edit(LocalEdit::add("Bread")).expect("edit");
        outcome.push.expect("push").settled().await;

        let checkout = ToolOutputDelta::new(
            json!({ "cartId": "C1", "items": [{ "name": "Eggs", "quantity": 2 }], "checkout": true }),
            None,
        );
        reconciler.apply_tool_output(&checkout).expect("checkout");

        assert!(reconciler.snapshot().items.is_empty());
        assert_eq!(reconciler.snapshot().cart_id, Some(CartId::from("C1")));
    }

    #[tokio::test]
    async fn first_edit_generates_cart_id_and_pushes_full_list() {
        let client = Arc::new(RecordingClient::default());
        let mut reconciler = CartReconciler::new(client.clone());

        let first = reconciler.apply_local_edit(LocalEdit::add("Eggs")).expect("edit");
        first.push.expect("push").settled().await;
        let outcome = reconciler.apply_local_edit(LocalEdit::increment("Eggs", 2)).expect("edit");
        outcome.push.expect("push").settled().await;

        let cart_id = reconciler.snapshot().cart_id.clone().expect("generated id");
        let pushes = client.pushes.lock().expect("lock");
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[1].cart_id, Some(cart_id));
        assert_eq!(pushes[1].items, vec![CartItem::new("Eggs", 3)]);
    }

    #[tokio::test]
    async fn decrement_to_zero_removes_the_line() {
        let mut reconciler = CartReconciler::new(Arc::new(RecordingClient::default()));
        let seed = delta(json!([{ "name": "Eggs", "quantity": 2 }, { "name": "Milk", "quantity": 1 }]));
        reconciler.apply_tool_output(&seed).expect("seed");

        let outcome = reconciler.apply_local_edit(LocalEdit::decrement("Milk", 1)).expect("edit");
        assert_eq!(lines(&outcome.snapshot), vec![("Eggs", 2)]);

        let noop = reconciler.apply_local_edit(LocalEdit::decrement("Bread", 1)).expect("edit");
        assert!(noop.push.is_none());
    }

    #[tokio::test]
    async fn failed_push_keeps_optimistic_view() {
        let client = Arc::new(RecordingClient { fail: true, ..Default::default() });
        let mut reconciler = CartReconciler::new(client.clone());

        let outcome = reconciler.apply_local_edit(LocalEdit::increment("Avocados", 2)).expect("edit");
        outcome.push.expect("push").settled().await;

        assert_eq!(lines(reconciler.snapshot()), vec![("Avocados", 2)]);
        assert_eq!(reconciler.subscribe().borrow().quantity_of("Avocados"), 2);
        assert_eq!(client.pushes.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn malformed_delta_is_rejected_and_not_remembered() {
        let mut reconciler = CartReconciler::new(Arc::new(RecordingClient::default()));
        let bad = ToolOutputDelta::new(json!({ "items": "Eggs" }), None);

        assert!(reconciler.apply_tool_output(&bad).is_err());
        assert!(reconciler.apply_tool_output(&bad).is_err());
        assert_eq!(reconciler.snapshot(), &CartSnapshot::default());
    }

    #[tokio::test]
    async fn slow_earlier_push_does_not_overwrite_a_later_edit() {
        let store = Arc::new(InMemoryCartStore::new());
        let client = Arc::new(SlowSingleUnitPush { inner: StoreCartSync::new(store.clone()) });
        let mut reconciler = CartReconciler::new(client);

        let first = reconciler.apply_local_edit(LocalEdit::add("Eggs")).expect("edit");
        // Let the worker start the slow push before the next edit lands.
        tokio::task::yield_now().await;
        let second = reconciler.apply_local_edit(LocalEdit::increment("Eggs", 2)).expect("edit");
        second.push.expect("push").settled().await;
        first.push.expect("push").settled().await;

        let cart_id = reconciler.snapshot().cart_id.clone().expect("generated id");
        assert_eq!(lines(reconciler.snapshot()), vec![("Eggs", 3)]);
        assert_eq!(store.get(&cart_id).await.expect("get"), reconciler.snapshot().items);
    }

    #[tokio::test]
    async fn queued_snapshots_collapse_to_the_latest() {
        let client = Arc::new(RecordingClient::default());
        let mut reconciler = CartReconciler::new(client.clone());

        reconciler.apply_local_edit(LocalEdit::add("Eggs")).expect("edit");
        reconciler.apply_local_edit(LocalEdit::add("Milk")).expect("edit");
        let last = reconciler.apply_local_edit(LocalEdit::increment("Eggs", 1)).expect("edit");
        last.push.expect("push").settled().await;

        let pushes = client.pushes.lock().expect("lock");
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].items, vec![CartItem::new("Eggs", 2), CartItem::new("Milk", 1)]);
    }

    #[test]
    fn local_edit_outside_a_runtime_is_reported() {
        let mut reconciler = CartReconciler::new(Arc::new(RecordingClient::default()));

        let result = reconciler.apply_local_edit(LocalEdit::add("Eggs"));
        assert!(matches!(result, Err(ReconcileError::NoRuntime(_))));
        assert_eq!(reconciler.snapshot(), &CartSnapshot::default());
    }
}
