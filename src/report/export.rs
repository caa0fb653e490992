use crate::domain::model::{Bucket, Report, RunSummary};
use crate::utils::error::{PriceCheckError, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    index: usize,
    card: &'a str,
    bucket: &'static str,
    price: Option<String>,
    seller: Option<&'a str>,
    language: &'static str,
    reason: Option<String>,
}

/// One row per card, grouped by bucket and in decklist order within each bucket.
pub fn render_csv(report: &Report) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for bucket in Bucket::ALL {
        for record in report.bucket(bucket) {
            writer.serialize(CsvRow {
                index: record.card.position(),
                card: &record.card.name,
                bucket: bucket.label(),
                price: record.price.map(|p| format!("{:.2}", p)),
                seller: record.seller.as_deref(),
                language: record.language.code(),
                reason: (bucket == Bucket::NotFound)
                    .then(|| report.not_found_reason(record).to_string()),
            })?;
        }
    }

    let data = writer.into_inner().map_err(|e| PriceCheckError::ProcessingError {
        message: format!("could not flush CSV output: {}", e),
    })?;
    String::from_utf8(data).map_err(|e| PriceCheckError::ProcessingError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    languages: String,
    cards_searched: usize,
    cards_not_found: usize,
    total_price: f64,
    execution_time_seconds: f64,
    sellers: &'a [String],
    input_lines: &'a [String],
}

#[derive(Debug, Serialize)]
struct JsonDocument<'a> {
    summary: JsonSummary<'a>,
    report: &'a Report,
}

pub fn render_json(report: &Report, summary: &RunSummary) -> Result<String> {
    let document = JsonDocument {
        summary: JsonSummary {
            languages: summary.languages.label(),
            cards_searched: report.card_count(),
            cards_not_found: report.not_found.len(),
            total_price: report.total_price(),
            execution_time_seconds: summary.execution_time.as_secs_f64(),
            sellers: &summary.sellers,
            input_lines: &summary.original_lines,
        },
        report,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::aggregate;
    use crate::domain::model::{
        CardEntry, Language, LanguageSelector, PriceRecord, PriceThresholds, SellerOffer,
    };
    use std::time::Duration;

    fn report() -> Report {
        let mut expensive = PriceRecord::not_found(CardEntry::new("Mana Crypt", 1), Language::En);
        expensive.price = Some(150.0);
        let cheap = PriceRecord::from_offers(
            CardEntry::new("Sol Ring, Again", 0),
            Language::Es,
            vec![SellerOffer {
                seller: "Itaca".to_string(),
                price: Some(0.5),
                url: None,
            }],
        );
        aggregate(vec![expensive, cheap], PriceThresholds::default())
    }

    #[test]
    fn test_render_csv() {
        let csv = render_csv(&report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "index,card,bucket,price,seller,language,reason");
        assert_eq!(lines[1], "1,\"Sol Ring, Again\",Decklist,0.50,Itaca,es,");
        assert_eq!(
            lines[2],
            "2,Mana Crypt,Not Found,150.00,,en,Price above 10.00 € (150.00 €)"
        );
    }

    #[test]
    fn test_render_json() {
        let summary = RunSummary {
            languages: LanguageSelector::Es,
            original_lines: vec!["1 Sol Ring, Again".to_string()],
            sellers: vec!["Itaca".to_string()],
            execution_time: Duration::from_secs(1),
        };
        let json = render_json(&report(), &summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["cards_searched"], 2);
        assert_eq!(value["summary"]["languages"], "ES");
        assert_eq!(value["report"]["decklist"][0]["card"]["name"], "Sol Ring, Again");
        assert_eq!(value["report"]["not_found"][0]["price"], 150.0);
    }
}
