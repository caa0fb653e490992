pub mod pipelines;

pub use pipelines::DeckPricePipeline;
