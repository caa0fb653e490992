use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One card of the decklist, after the quantity and printing details were stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntry {
    pub name: String,
    /// Zero-based position among the non-blank input lines.
    pub original_index: usize,
}

impl CardEntry {
    pub fn new(name: impl Into<String>, original_index: usize) -> Self {
        Self {
            name: name.into(),
            original_index,
        }
    }

    /// 1-based position, as shown in reports.
    pub fn position(&self) -> usize {
        self.original_index + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }

    /// Cardmarket's `idLanguage` query value.
    pub fn cardmarket_id(&self) -> u8 {
        match self {
            Language::En => 1,
            Language::Es => 4,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code().to_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageSelector {
    #[default]
    En,
    Es,
    Both,
}

impl LanguageSelector {
    pub fn languages(&self) -> Vec<Language> {
        match self {
            LanguageSelector::En => vec![Language::En],
            LanguageSelector::Es => vec![Language::Es],
            LanguageSelector::Both => vec![Language::En, Language::Es],
        }
    }

    /// Suffix used by the default report file name.
    pub fn file_tag(&self) -> &'static str {
        match self {
            LanguageSelector::En => "en",
            LanguageSelector::Es => "es",
            LanguageSelector::Both => "all",
        }
    }

    /// `EN`, `ES` or `EN+ES`.
    pub fn label(&self) -> String {
        self.languages()
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl std::str::FromStr for LanguageSelector {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(LanguageSelector::En),
            "es" => Ok(LanguageSelector::Es),
            "both" | "all" => Ok(LanguageSelector::Both),
            other => Err(format!(
                "unknown language '{}', expected en, es or both",
                other
            )),
        }
    }
}

/// Lowest price one seller offers for a card, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerOffer {
    pub seller: String,
    pub price: Option<f64>,
    pub url: Option<String>,
}

/// Result of looking up one card in one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub card: CardEntry,
    pub language: Language,
    pub price: Option<f64>,
    pub seller: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub offers: Vec<SellerOffer>,
    /// Set when the lookup itself failed rather than returning no offers.
    #[serde(default)]
    pub failure: Option<String>,
}

impl PriceRecord {
    pub fn not_found(card: CardEntry, language: Language) -> Self {
        Self {
            card,
            language,
            price: None,
            seller: None,
            url: None,
            offers: Vec::new(),
            failure: None,
        }
    }

    pub fn failed(card: CardEntry, language: Language, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::not_found(card, language)
        }
    }

    /// Builds a record from per-seller offers; the cheapest one becomes the best price.
    pub fn from_offers(card: CardEntry, language: Language, offers: Vec<SellerOffer>) -> Self {
        let best = offers
            .iter()
            .filter_map(|o| o.price.map(|p| (p, o)))
            .fold(None::<(f64, &SellerOffer)>, |acc, (p, o)| match acc {
                Some((best, _)) if best <= p => acc,
                _ => Some((p, o)),
            });

        let (price, seller, url) = match best {
            Some((p, o)) => (Some(p), Some(o.seller.clone()), o.url.clone()),
            None => (None, None, None),
        };

        Self {
            card,
            language,
            price,
            seller,
            url,
            offers,
            failure: None,
        }
    }

    pub fn offer_for(&self, seller: &str) -> Option<f64> {
        self.offers
            .iter()
            .find(|o| o.seller == seller)
            .and_then(|o| o.price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Decklist,
    Expansion,
    NotFound,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Decklist, Bucket::Expansion, Bucket::NotFound];

    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Decklist => "Decklist",
            Bucket::Expansion => "Expansion",
            Bucket::NotFound => "Not Found",
        }
    }
}

/// Price limits separating the buckets. Both bounds are inclusive to the lower bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceThresholds {
    pub deck_max: f64,
    pub expansion_max: f64,
}

impl Default for PriceThresholds {
    fn default() -> Self {
        Self {
            deck_max: 2.0,
            expansion_max: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotFoundReason {
    NoResults,
    LookupFailed(String),
    AboveMaximum { price: f64, maximum: f64 },
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::NoResults => f.write_str("No results from any seller"),
            NotFoundReason::LookupFailed(msg) => write!(f, "Lookup failed: {}", msg),
            NotFoundReason::AboveMaximum { price, maximum } => {
                write!(f, "Price above {:.2} € ({:.2} €)", maximum, price)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerTotal {
    pub seller: String,
    pub count: usize,
    pub total: f64,
}

/// Cards grouped per bucket, each bucket in decklist order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub decklist: Vec<PriceRecord>,
    pub expansion: Vec<PriceRecord>,
    pub not_found: Vec<PriceRecord>,
    pub thresholds: PriceThresholds,
}

impl Report {
    pub fn bucket(&self, bucket: Bucket) -> &[PriceRecord] {
        match bucket {
            Bucket::Decklist => &self.decklist,
            Bucket::Expansion => &self.expansion,
            Bucket::NotFound => &self.not_found,
        }
    }

    pub fn card_count(&self) -> usize {
        self.decklist.len() + self.expansion.len() + self.not_found.len()
    }

    /// Sum of the prices in a bucket. Cards without a price add nothing.
    pub fn total(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::NotFound => 0.0,
            b => self.bucket(b).iter().filter_map(|r| r.price).sum(),
        }
    }

    pub fn total_price(&self) -> f64 {
        self.total(Bucket::Decklist) + self.total(Bucket::Expansion)
    }

    pub fn not_found_reason(&self, record: &PriceRecord) -> NotFoundReason {
        match (record.price, &record.failure) {
            (Some(price), _) if price > self.thresholds.expansion_max => {
                NotFoundReason::AboveMaximum {
                    price,
                    maximum: self.thresholds.expansion_max,
                }
            }
            (None, Some(msg)) => NotFoundReason::LookupFailed(msg.clone()),
            _ => NotFoundReason::NoResults,
        }
    }

    /// Count and sum per best seller, in order of first appearance.
    pub fn seller_breakdown(&self, bucket: Bucket) -> Vec<SellerTotal> {
        if bucket == Bucket::NotFound {
            return Vec::new();
        }
        let mut totals: Vec<SellerTotal> = Vec::new();
        for record in self.bucket(bucket) {
            let (Some(seller), Some(price)) = (&record.seller, record.price) else {
                continue;
            };
            match totals.iter_mut().find(|t| &t.seller == seller) {
                Some(t) => {
                    t.count += 1;
                    t.total += price;
                }
                None => totals.push(SellerTotal {
                    seller: seller.clone(),
                    count: 1,
                    total: price,
                }),
            }
        }
        totals
    }
}

/// Run context handed to the renderers next to the report.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub languages: LanguageSelector,
    pub original_lines: Vec<String>,
    pub sellers: Vec<String>,
    pub execution_time: Duration,
}

/// Normalized decklist as produced by the extract stage.
#[derive(Debug, Clone, Default)]
pub struct Decklist {
    pub original_lines: Vec<String>,
    pub cards: Vec<CardEntry>,
}

/// Output of the transform stage.
#[derive(Debug, Clone)]
pub struct PricedDecklist {
    pub report: Report,
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(seller: &str, price: Option<f64>) -> SellerOffer {
        SellerOffer {
            seller: seller.to_string(),
            price,
            url: price.map(|_| format!("https://example.com/{}", seller)),
        }
    }

    #[test]
    fn test_from_offers_picks_cheapest_seller() {
        let record = PriceRecord::from_offers(
            CardEntry::new("Sol Ring", 0),
            Language::En,
            vec![
                offer("TEMPEST-STORE", Some(1.20)),
                offer("Itaca", None),
                offer("MagicBarcelona", Some(0.95)),
                offer("Mazvigosl", Some(0.95)),
            ],
        );

        assert_eq!(record.price, Some(0.95));
        assert_eq!(record.seller.as_deref(), Some("MagicBarcelona"));
        assert_eq!(record.offer_for("TEMPEST-STORE"), Some(1.20));
        assert_eq!(record.offer_for("Itaca"), None);
    }

    #[test]
    fn test_from_offers_without_prices_is_not_found() {
        let record = PriceRecord::from_offers(
            CardEntry::new("Sol Ring", 0),
            Language::Es,
            vec![offer("Itaca", None)],
        );
        assert_eq!(record.price, None);
        assert_eq!(record.seller, None);
        assert_eq!(record.failure, None);
    }

    #[test]
    fn test_language_selector_parsing() {
        assert_eq!("en".parse::<LanguageSelector>(), Ok(LanguageSelector::En));
        assert_eq!("ES".parse::<LanguageSelector>(), Ok(LanguageSelector::Es));
        assert_eq!("all".parse::<LanguageSelector>(), Ok(LanguageSelector::Both));
        assert!("de".parse::<LanguageSelector>().is_err());
        assert_eq!(LanguageSelector::Both.label(), "EN+ES");
    }
}
