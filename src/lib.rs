pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod report;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{CachedLookup, CardmarketConfig, CardmarketLookup, JsonFileCache, LocalStorage};
pub use app::DeckPricePipeline;
pub use config::Settings;
pub use core::engine::PriceCheckEngine;
pub use domain::ports::{PriceCache, PriceLookup};
pub use utils::error::{LookupError, PriceCheckError, Result};
