use crate::domain::model::{CardEntry, Language, PriceRecord, SellerOffer};
use crate::domain::ports::PriceLookup;
use crate::utils::error::{LookupError, PriceCheckError, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.cardmarket.com";

pub const DEFAULT_SELLERS: [&str; 10] = [
    "MagicBarcelona",
    "TEMPEST-STORE",
    "ManaVortex-POOL4YOU",
    "Mazvigosl",
    "Itaca",
    "Metropolis-Center",
    "willybizarre",
    "GENEXCOMICS",
    "Eurekagames",
    "DUAL-GAMES",
];

/// Price cell of a seller's offer table.
const PRICE_SELECTOR: &str = "span.color-primary.small.text-end.text-nowrap.fw-bold";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct CardmarketConfig {
    pub base_url: String,
    pub sellers: Vec<String>,
    /// Pause after every request.
    pub request_delay: Duration,
    pub timeout: Duration,
}

impl Default for CardmarketConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            sellers: DEFAULT_SELLERS.iter().map(|s| s.to_string()).collect(),
            request_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Looks up a card in the singles offers of a fixed list of Cardmarket sellers.
impl CardmarketConfig {
    /// Base URL plus the sorted seller list. Cached prices are only valid for the same scope.
    pub fn cache_scope(&self) -> String {
        let mut sellers: Vec<&str> = self.sellers.iter().map(String::as_str).collect();
        sellers.sort_unstable();
        format!("{}|{}", self.base_url.trim_end_matches('/'), sellers.join(","))
    }
}

pub struct CardmarketLookup {
    config: CardmarketConfig,
    client: Client,
    selector: Selector,
}

impl CardmarketLookup {
    pub fn new(config: CardmarketConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        let selector = Selector::parse(PRICE_SELECTOR).map_err(|e| PriceCheckError::ConfigError {
            message: format!("invalid price selector: {}", e),
        })?;

        Ok(Self {
            config,
            client,
            selector,
        })
    }

    pub fn seller_url(&self, seller: &str, card_name: &str, language: Language) -> String {
        format!(
            "{}/{}/Magic/Users/{}/Offers/Singles?name={}&idLanguage={}&sortBy=price_asc",
            self.config.base_url.trim_end_matches('/'),
            language.code(),
            seller,
            urlencoding::encode(card_name),
            language.cardmarket_id()
        )
    }

    async fn fetch_seller(
        &self,
        seller: &str,
        card_name: &str,
        language: Language,
    ) -> std::result::Result<SellerOffer, LookupError> {
        let url = self.seller_url(seller, card_name, language);
        tracing::debug!("Requesting {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(seller, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Failed(format!(
                "{}: HTTP status {}",
                seller, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| request_error(seller, e))?;

        let price = lowest_price_in(&body, &self.selector);
        Ok(SellerOffer {
            seller: seller.to_string(),
            price,
            url: price.map(|_| url),
        })
    }
}

#[async_trait]
impl PriceLookup for CardmarketLookup {
    async fn lookup(
        &self,
        card: &CardEntry,
        language: Language,
    ) -> std::result::Result<PriceRecord, LookupError> {
        let mut offers = Vec::with_capacity(self.config.sellers.len());
        let mut errors = Vec::new();

        for seller in &self.config.sellers {
            match self.fetch_seller(seller, &card.name, language).await {
                Ok(offer) => {
                    match offer.price {
                        Some(p) => tracing::debug!("  {} ({}): {:.2} €", seller, language, p),
                        None => tracing::debug!("  {} ({}): Not found", seller, language),
                    }
                    offers.push(offer);
                }
                Err(e) => {
                    tracing::debug!("  {} ({}): {}", seller, language, e);
                    errors.push(e);
                }
            }

            if !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }
        }

        if offers.is_empty() && !errors.is_empty() {
            let message = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(if errors.iter().all(LookupError::is_unavailable) {
                LookupError::Unavailable(message)
            } else {
                LookupError::Failed(message)
            });
        }

        Ok(PriceRecord::from_offers(card.clone(), language, offers))
    }

    fn sources(&self) -> Vec<String> {
        self.config.sellers.clone()
    }
}

/// Unreachable hosts and timeouts mean the source is down; anything else is a per-card failure.
fn request_error(seller: &str, e: reqwest::Error) -> LookupError {
    if e.is_connect() || e.is_timeout() {
        LookupError::Unavailable(format!("{}: {}", seller, e))
    } else {
        LookupError::Failed(format!("{}: {}", seller, e))
    }
}

/// Reads `1,50 €`, `0.25 €` or `1.234,56 €`.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .collect();
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };
    normalized
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Lowest parsable price in an offers page, `None` when the page lists nothing.
pub fn lowest_price_in(html: &str, selector: &Selector) -> Option<f64> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .filter_map(|el| parse_price_text(&el.text().collect::<String>()))
        .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.min(p))))
}
