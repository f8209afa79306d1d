//! Widget-side cart state: a cached snapshot reconciled against tool-call
//! deltas and pushed back to the backend after local edits.

pub mod client;
pub mod reconciler;

pub use client::{CartSyncClient, HttpCartSync, StoreCartSync, SyncError};
pub use reconciler::{
    CartReconciler, CartSnapshot, LocalEdit, LocalEditOutcome, PendingPush, ReconcileError,
    ReconcileOutcome, ToolOutputDelta,
};
