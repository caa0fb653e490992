// Adapters layer: concrete implementations of the domain ports.

pub mod cache;
pub mod cardmarket;
pub mod storage;

pub use cache::{CachedLookup, JsonFileCache};
pub use cardmarket::{CardmarketConfig, CardmarketLookup};
pub use storage::LocalStorage;
