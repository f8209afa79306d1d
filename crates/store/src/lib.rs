pub mod repositories;

pub use repositories::{CartRepository, InMemoryCartStore, StoreError};
