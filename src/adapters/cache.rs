use crate::domain::model::{CardEntry, Language, PriceRecord, SellerOffer};
use crate::domain::ports::{CachedPrice, PriceCache, PriceLookup};
use crate::utils::error::{LookupError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_CACHE_FILE: &str = "cardmarket_cache.json";

const CACHE_VERSION: u32 = 1;

/// `sol ring|en`. Case and inner whitespace do not matter.
pub fn cache_key(card_name: &str, language: Language) -> String {
    let name = card_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    format!("{}|{}", name, language.code())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    name: String,
    language: Language,
    price: Option<f64>,
    seller: Option<String>,
    url: Option<String>,
    #[serde(default)]
    offers: Vec<SellerOffer>,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    /// Identifies the price source the entries came from, e.g. the seller list.
    #[serde(default)]
    scope: String,
    entries: HashMap<String, CacheEntry>,
}

/// Lookup results stored as a JSON file, each entry valid for `ttl`.
///
/// Entries belong to one `scope`; a file written for another scope is ignored.
pub struct JsonFileCache {
    path: PathBuf,
    ttl: chrono::Duration,
    scope: String,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl JsonFileCache {
    /// Loads the cache file. A missing or unreadable file starts an empty cache.
    pub async fn open(
        path: impl Into<PathBuf>,
        ttl: Duration,
        scope: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let scope = scope.into();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<CacheFile>(&content) {
                Ok(file) if file.version == CACHE_VERSION && file.scope == scope => {
                    tracing::info!("💾 Loaded {} cached results", file.entries.len());
                    file.entries
                }
                Ok(file) if file.version == CACHE_VERSION => {
                    tracing::warn!(
                        "Discarding cache {}: it was built for another seller list",
                        path.display()
                    );
                    HashMap::new()
                }
                Ok(file) => {
                    tracing::warn!(
                        "Ignoring cache {} with unsupported version {}",
                        path.display(),
                        file.version
                    );
                    HashMap::new()
                }
                Err(e) => {
                    tracing::warn!("Ignoring unreadable cache {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No cache file found, starting fresh");
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!("Could not read cache {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self {
            path,
            ttl,
            scope,
            entries: Mutex::new(entries),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.fetched_at) <= self.ttl
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PriceCache for JsonFileCache {
    async fn get(&self, card_name: &str, language: Language) -> Option<CachedPrice> {
        let entries = self.entries.lock().await;
        let entry = entries.get(&cache_key(card_name, language))?;
        let now = Utc::now();
        if !self.is_fresh(entry, now) {
            return None;
        }

        let record = PriceRecord {
            card: CardEntry::new(entry.name.clone(), 0),
            language: entry.language,
            price: entry.price,
            seller: entry.seller.clone(),
            url: entry.url.clone(),
            offers: entry.offers.clone(),
            failure: None,
        };
        let age = now
            .signed_duration_since(entry.fetched_at)
            .to_std()
            .unwrap_or_default();
        Some(CachedPrice { record, age })
    }

    async fn put(&self, record: &PriceRecord) -> Result<()> {
        let entry = CacheEntry {
            name: record.card.name.clone(),
            language: record.language,
            price: record.price,
            seller: record.seller.clone(),
            url: record.url.clone(),
            offers: record.offers.clone(),
            fetched_at: Utc::now(),
        };
        self.entries
            .lock()
            .await
            .insert(cache_key(&record.card.name, record.language), entry);
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| self.is_fresh(e, now));

        let file = CacheFile {
            version: CACHE_VERSION,
            scope: self.scope.clone(),
            entries: entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json).await?;

        tracing::info!("💾 Saved {} results to cache", entries.len());
        Ok(())
    }
}

/// Serves lookups from a cache and stores every successful answer of the inner lookup.
pub struct CachedLookup<L: PriceLookup, C: PriceCache> {
    inner: L,
    cache: C,
}

impl<L: PriceLookup, C: PriceCache> CachedLookup<L, C> {
    pub fn new(inner: L, cache: C) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

#[async_trait]
impl<L: PriceLookup, C: PriceCache> PriceLookup for CachedLookup<L, C> {
    async fn lookup(
        &self,
        card: &CardEntry,
        language: Language,
    ) -> std::result::Result<PriceRecord, LookupError> {
        if let Some(hit) = self.cache.get(&card.name, language).await {
            tracing::debug!(
                "Using cached result for {} ({}), {}s old",
                card.name,
                language,
                hit.age.as_secs()
            );
            return Ok(PriceRecord {
                card: card.clone(),
                ..hit.record
            });
        }

        let record = self.inner.lookup(card, language).await?;
        if let Err(e) = self.cache.put(&record).await {
            tracing::warn!("Could not cache result for {}: {}", card.name, e);
        }
        Ok(record)
    }

    fn sources(&self) -> Vec<String> {
        self.inner.sources()
    }

    async fn finish(&self) -> Result<()> {
        self.inner.finish().await?;
        self.cache.persist().await
    }
}
