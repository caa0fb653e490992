use crate::core::aggregator::aggregate;
use crate::core::normalizer::{normalize, render_normalized};
use crate::core::{ConfigProvider, Pipeline, PriceLookup, Storage};
use crate::domain::model::{Decklist, PriceRecord, PricedDecklist, RunSummary};
use crate::report::{render_artifact, render_text};
use crate::utils::error::{LookupError, PriceCheckError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Cleans the decklist in place, prices every card and writes the reports.
pub struct DeckPricePipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) lookup: Arc<dyn PriceLookup>,
}

impl<S: Storage, C: ConfigProvider> DeckPricePipeline<S, C> {
    pub fn new(storage: S, config: C, lookup: Arc<dyn PriceLookup>) -> Self {
        Self {
            storage,
            config,
            lookup,
        }
    }

    fn artifact_path(&self, format: &str) -> String {
        let name = self.config.output_name();
        match self.config.output_dir().trim_end_matches('/') {
            "" => format!("{}.{}", name, format),
            dir => format!("{}/{}.{}", dir, name, format),
        }
    }

    /// One lookup per (card, language), at most `workers` in flight.
    async fn run_lookups(
        &self,
        deck: &Decklist,
    ) -> Result<Vec<std::result::Result<PriceRecord, (PriceRecord, LookupError)>>> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers().max(1)));
        let languages = self.config.languages().languages();
        let mut tasks = JoinSet::new();

        for card in &deck.cards {
            for language in &languages {
                let semaphore = semaphore.clone();
                let lookup = self.lookup.clone();
                let card = card.clone();
                let language = *language;

                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| {
                        PriceCheckError::ProcessingError {
                            message: format!("lookup pool closed: {}", e),
                        }
                    })?;
                    tracing::debug!("Looking up '{}' ({})", card.name, language);

                    let outcome = match lookup.lookup(&card, language).await {
                        Ok(record) => Ok(record),
                        Err(e) => {
                            tracing::warn!("⚠️ '{}' ({}): {}", card.name, language, e);
                            Err((PriceRecord::failed(card, language, e.to_string()), e))
                        }
                    };
                    Ok::<_, PriceCheckError>(outcome)
                });
            }
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| PriceCheckError::ProcessingError {
                message: format!("lookup task failed: {}", e),
            })??;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for DeckPricePipeline<S, C> {
    async fn extract(&self) -> Result<Decklist> {
        let input_path = self.config.input_path();
        tracing::debug!("Reading decklist from {}", input_path);

        let raw = self.storage.read_file(input_path).await?;
        let content = String::from_utf8(raw).map_err(|e| PriceCheckError::ProcessingError {
            message: format!("{} is not valid UTF-8: {}", input_path, e),
        })?;

        let original_lines: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        let cards = normalize(&original_lines);

        // 覆寫原始檔案，只保留卡名
        self.storage
            .write_file(input_path, render_normalized(&cards).as_bytes())
            .await?;
        tracing::debug!("Rewrote {} with {} card names", input_path, cards.len());

        Ok(Decklist {
            original_lines,
            cards,
        })
    }

    async fn transform(&self, deck: Decklist) -> Result<PricedDecklist> {
        let outcomes = self.run_lookups(&deck).await?;

        let unavailable = outcomes
            .iter()
            .filter(|o| matches!(o, Err((_, e)) if e.is_unavailable()))
            .count();
        if !outcomes.is_empty() && unavailable == outcomes.len() {
            return Err(PriceCheckError::LookupUnavailableError {
                message: format!("all {} lookups failed to reach the price source", unavailable),
            });
        }

        // 快取寫入失敗不影響報表
        if let Err(e) = self.lookup.finish().await {
            tracing::warn!("⚠️ Could not finalize price lookups: {}", e);
        }

        let records: Vec<PriceRecord> = outcomes
            .into_iter()
            .map(|o| match o {
                Ok(record) => record,
                Err((record, _)) => record,
            })
            .collect();
        let report = aggregate(records, self.config.thresholds());

        Ok(PricedDecklist {
            report,
            summary: RunSummary {
                languages: self.config.languages(),
                original_lines: deck.original_lines,
                sellers: self.lookup.sources(),
                execution_time: Duration::ZERO,
            },
        })
    }

    async fn load(&self, result: PricedDecklist) -> Result<Vec<String>> {
        println!("{}", render_text(&result.report, &result.summary));

        let mut paths = Vec::new();
        for format in self.config.output_formats() {
            let content = render_artifact(format, &result.report, &result.summary)?;
            let path = self.artifact_path(format);
            tracing::debug!("Writing {} report ({} bytes) to {}", format, content.len(), path);
            self.storage.write_file(&path, content.as_bytes()).await?;
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::model::{CardEntry, Language, LanguageSelector, SellerOffer};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn with_file(path: &str, content: &str) -> Self {
            let mut files = HashMap::new();
            files.insert(path.to_string(), content.as_bytes().to_vec());
            Self {
                files: Arc::new(Mutex::new(files)),
            }
        }

        async fn get_file(&self, path: &str) -> Option<String> {
            let files = self.files.lock().await;
            files
                .get(path)
                .map(|data| String::from_utf8_lossy(data).into_owned())
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                PriceCheckError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    /// Fixed prices per (card, language); unknown cards have no offers.
    #[derive(Default)]
    struct StubLookup {
        prices: HashMap<(String, Language), f64>,
        failing: HashMap<String, LookupError>,
        calls: AtomicUsize,
        finished: AtomicBool,
        finish_fails: bool,
    }

    impl StubLookup {
        fn price(mut self, name: &str, language: Language, price: f64) -> Self {
            self.prices.insert((name.to_string(), language), price);
            self
        }

        fn failing(mut self, name: &str, error: LookupError) -> Self {
            self.failing.insert(name.to_string(), error);
            self
        }
    }

    #[async_trait::async_trait]
    impl PriceLookup for StubLookup {
        async fn lookup(
            &self,
            card: &CardEntry,
            language: Language,
        ) -> std::result::Result<PriceRecord, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = self.failing.get(&card.name) {
                return Err(e.clone());
            }
            let offers = self
                .prices
                .get(&(card.name.clone(), language))
                .map(|p| {
                    vec![SellerOffer {
                        seller: "Itaca".to_string(),
                        price: Some(*p),
                        url: None,
                    }]
                })
                .unwrap_or_default();
            Ok(PriceRecord::from_offers(card.clone(), language, offers))
        }

        fn sources(&self) -> Vec<String> {
            vec!["Itaca".to_string()]
        }

        async fn finish(&self) -> Result<()> {
            self.finished.store(true, Ordering::SeqCst);
            if self.finish_fails {
                return Err(PriceCheckError::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "cache file is read-only",
                )));
            }
            Ok(())
        }
    }

    fn settings(languages: LanguageSelector) -> Settings {
        let mut settings = Settings::new("deck.txt");
        settings.languages = languages;
        settings.output_dir = "out".to_string();
        settings.output_formats = vec!["html".to_string(), "csv".to_string()];
        settings
    }

    #[tokio::test]
    async fn test_extract_overwrites_input_with_names() {
        let storage = MockStorage::with_file(
            "deck.txt",
            "1 Arcane Signet (OTC) 252\n\n2 Sol Ring\n1 Kros, Defense Contractor (MOM) 123\n",
        );
        let pipeline = DeckPricePipeline::new(
            storage.clone(),
            settings(LanguageSelector::En),
            Arc::new(StubLookup::default()),
        );

        let deck = pipeline.extract().await.unwrap();

        assert_eq!(deck.cards.len(), 3);
        assert_eq!(deck.original_lines[0], "1 Arcane Signet (OTC) 252");
        assert_eq!(
            storage.get_file("deck.txt").await.unwrap(),
            "Arcane Signet\nSol Ring\nKros, Defense Contractor\n"
        );
    }

    #[tokio::test]
    async fn test_end_to_end_buckets() {
        let storage = MockStorage::with_file("deck.txt", "1 Arcane Signet (OTC) 252\n2 Sol Ring\n");
        let lookup = Arc::new(StubLookup::default().price("Arcane Signet", Language::En, 1.50));
        let pipeline =
            DeckPricePipeline::new(storage.clone(), settings(LanguageSelector::En), lookup.clone());

        let deck = pipeline.extract().await.unwrap();
        let priced = pipeline.transform(deck).await.unwrap();

        let names = |records: &[PriceRecord]| -> Vec<String> {
            records.iter().map(|r| r.card.name.clone()).collect()
        };
        assert_eq!(names(&priced.report.decklist), vec!["Arcane Signet"]);
        assert_eq!(names(&priced.report.not_found), vec!["Sol Ring"]);
        assert!(priced.report.expansion.is_empty());
        assert!(lookup.finished.load(Ordering::SeqCst));

        let paths = pipeline.load(priced).await.unwrap();
        assert_eq!(
            paths,
            vec!["out/cardmarket_results_en.html", "out/cardmarket_results_en.csv"]
        );
        let html = storage.get_file("out/cardmarket_results_en.html").await.unwrap();
        assert!(html.contains("Arcane Signet"));
        let csv = storage.get_file("out/cardmarket_results_en.csv").await.unwrap();
        assert!(csv.contains("2,Sol Ring,Not Found,,,en,No results from any seller"));
    }

    #[tokio::test]
    async fn test_both_languages_take_cheapest() {
        let storage = MockStorage::with_file("deck.txt", "Urza's Saga\n");
        let lookup = Arc::new(
            StubLookup::default()
                .price("Urza's Saga", Language::En, 3.50)
                .price("Urza's Saga", Language::Es, 1.80),
        );
        let pipeline =
            DeckPricePipeline::new(storage, settings(LanguageSelector::Both), lookup.clone());

        let deck = pipeline.extract().await.unwrap();
        let priced = pipeline.transform(deck).await.unwrap();

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
        assert_eq!(priced.report.decklist.len(), 1);
        assert_eq!(priced.report.decklist[0].price, Some(1.80));
        assert_eq!(priced.report.decklist[0].language, Language::Es);
        assert_eq!(priced.summary.sellers, vec!["Itaca"]);
    }

    #[tokio::test]
    async fn test_order_is_preserved_with_many_workers() {
        let lines: Vec<String> = (0..20).map(|i| format!("1 Card Number {}", i)).collect();
        let storage = MockStorage::with_file("deck.txt", &lines.join("\n"));
        let mut lookup = StubLookup::default();
        for i in 0..20 {
            lookup = lookup.price(&format!("Card Number {}", i), Language::En, 0.10 * i as f64);
        }
        let mut config = settings(LanguageSelector::En);
        config.workers = 8;
        let pipeline = DeckPricePipeline::new(storage, config, Arc::new(lookup));

        let deck = pipeline.extract().await.unwrap();
        let priced = pipeline.transform(deck).await.unwrap();

        let indexes: Vec<usize> = priced
            .report
            .decklist
            .iter()
            .map(|r| r.card.original_index)
            .collect();
        assert_eq!(indexes, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failed_lookup_is_not_found() {
        let storage = MockStorage::with_file("deck.txt", "Sol Ring\nMana Crypt\n");
        let lookup = StubLookup::default()
            .price("Sol Ring", Language::En, 1.0)
            .failing("Mana Crypt", LookupError::Failed("HTTP status 500".to_string()));
        let pipeline = DeckPricePipeline::new(storage, settings(LanguageSelector::En), Arc::new(lookup));

        let deck = pipeline.extract().await.unwrap();
        let priced = pipeline.transform(deck).await.unwrap();

        assert_eq!(priced.report.decklist.len(), 1);
        assert_eq!(priced.report.not_found.len(), 1);
        assert!(priced.report.not_found[0]
            .failure
            .as_deref()
            .unwrap()
            .contains("HTTP status 500"));
    }

    #[tokio::test]
    async fn test_finish_error_keeps_report() {
        let storage = MockStorage::with_file("deck.txt", "Sol Ring\n");
        let lookup = StubLookup {
            finish_fails: true,
            ..StubLookup::default().price("Sol Ring", Language::En, 1.0)
        };
        let lookup = Arc::new(lookup);
        let pipeline =
            DeckPricePipeline::new(storage.clone(), settings(LanguageSelector::En), lookup.clone());

        let deck = pipeline.extract().await.unwrap();
        let priced = pipeline.transform(deck).await.unwrap();

        assert!(lookup.finished.load(Ordering::SeqCst));
        assert_eq!(priced.report.decklist.len(), 1);
        pipeline.load(priced).await.unwrap();
        assert!(storage.get_file("out/cardmarket_results_en.html").await.is_some());
    }

    #[tokio::test]
    async fn test_total_unavailability_fails_the_run() {
        let storage = MockStorage::with_file("deck.txt", "Sol Ring\nMana Crypt\n");
        let down = LookupError::Unavailable("connection refused".to_string());
        let lookup = StubLookup::default()
            .failing("Sol Ring", down.clone())
            .failing("Mana Crypt", down);
        let pipeline = DeckPricePipeline::new(storage, settings(LanguageSelector::En), Arc::new(lookup));

        let deck = pipeline.extract().await.unwrap();
        let err = pipeline.transform(deck).await.unwrap_err();

        assert!(matches!(err, PriceCheckError::LookupUnavailableError { .. }));
    }

    #[tokio::test]
    async fn test_partial_unavailability_keeps_report() {
        let storage = MockStorage::with_file("deck.txt", "Sol Ring\nMana Crypt\n");
        let lookup = StubLookup::default()
            .price("Sol Ring", Language::En, 1.0)
            .failing("Mana Crypt", LookupError::Unavailable("timeout".to_string()));
        let pipeline = DeckPricePipeline::new(storage, settings(LanguageSelector::En), Arc::new(lookup));

        let deck = pipeline.extract().await.unwrap();
        let priced = pipeline.transform(deck).await.unwrap();

        assert_eq!(priced.report.card_count(), 2);
        assert_eq!(priced.report.not_found[0].card.name, "Mana Crypt");
    }

    #[tokio::test]
    async fn test_empty_decklist_writes_empty_report() {
        let storage = MockStorage::with_file("deck.txt", "\n\n");
        let pipeline = DeckPricePipeline::new(
            storage.clone(),
            settings(LanguageSelector::En),
            Arc::new(StubLookup::default()),
        );

        let deck = pipeline.extract().await.unwrap();
        let priced = pipeline.transform(deck).await.unwrap();
        assert_eq!(priced.report.card_count(), 0);

        pipeline.load(priced).await.unwrap();
        assert_eq!(storage.get_file("deck.txt").await.unwrap(), "");
        assert!(storage.get_file("out/cardmarket_results_en.html").await.is_some());
    }

    #[tokio::test]
    async fn test_missing_input_is_io_error() {
        let storage = MockStorage::with_file("other.txt", "Sol Ring");
        let pipeline = DeckPricePipeline::new(
            storage,
            settings(LanguageSelector::En),
            Arc::new(StubLookup::default()),
        );

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, PriceCheckError::IoError(_)));
    }
}
