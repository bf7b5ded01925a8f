pub mod store;

pub use store::{InMemoryStateStore, StateStore, StoreError};
