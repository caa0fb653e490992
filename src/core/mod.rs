pub mod aggregator;
pub mod engine;
pub mod normalizer;

pub use crate::domain::model::{Decklist, PricedDecklist, Report};
pub use crate::domain::ports::{ConfigProvider, Pipeline, PriceLookup, Storage};
pub use crate::utils::error::Result;
