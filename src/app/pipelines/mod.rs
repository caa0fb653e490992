pub mod deck_pipeline;

pub use deck_pipeline::DeckPricePipeline;
