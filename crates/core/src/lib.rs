pub mod config;
pub mod domain;
pub mod errors;
pub mod fingerprint;
pub mod merge;

pub use domain::cart::{Cart, CartId, CartItem};
pub use domain::sync::{CartToolOutput, SyncRequest, SyncResponse, SyncStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use fingerprint::DeltaFingerprint;
pub use merge::{aggregate_items, format_item_summary, overwrite_items};
