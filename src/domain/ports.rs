use crate::domain::model::{CardEntry, Decklist, Language, LanguageSelector, PriceRecord, PricedDecklist, PriceThresholds};
use crate::utils::error::{LookupError, Result};
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn languages(&self) -> LanguageSelector;
    fn workers(&self) -> usize;
    fn thresholds(&self) -> PriceThresholds;
    fn output_dir(&self) -> &str;
    fn output_name(&self) -> String;
    fn output_formats(&self) -> &[String];
}

/// Source of card prices. One call covers one card in one language.
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn lookup(
        &self,
        card: &CardEntry,
        language: Language,
    ) -> std::result::Result<PriceRecord, LookupError>;

    /// Names of the sellers this lookup compares, for report columns.
    fn sources(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called once after the last lookup of a run.
    async fn finish(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedPrice {
    pub record: PriceRecord,
    pub age: Duration,
}

/// Key-value store for lookup results, keyed by normalized card name and language.
#[async_trait]
pub trait PriceCache: Send + Sync {
    async fn get(&self, card_name: &str, language: Language) -> Option<CachedPrice>;
    async fn put(&self, record: &PriceRecord) -> Result<()>;
    async fn persist(&self) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Decklist>;
    async fn transform(&self, deck: Decklist) -> Result<PricedDecklist>;
    async fn load(&self, result: PricedDecklist) -> Result<Vec<String>>;
}
