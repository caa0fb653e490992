use crate::domain::model::{Bucket, PriceRecord, PriceThresholds, Report};
use std::collections::BTreeMap;

pub fn classify(price: Option<f64>, thresholds: &PriceThresholds) -> Bucket {
    match price {
        None => Bucket::NotFound,
        Some(p) if p > thresholds.expansion_max => Bucket::NotFound,
        Some(p) if p <= thresholds.deck_max => Bucket::Decklist,
        Some(_) => Bucket::Expansion,
    }
}

/// Merges the language variants of each card into a single record.
///
/// The cheapest priced variant wins. When no variant has a price, the
/// record keeps the failure message of a failed variant, if there was one.
/// Output is sorted by decklist position.
pub fn resolve_variants(records: Vec<PriceRecord>) -> Vec<PriceRecord> {
    let mut by_card: BTreeMap<usize, Vec<PriceRecord>> = BTreeMap::new();
    for record in records {
        by_card
            .entry(record.card.original_index)
            .or_default()
            .push(record);
    }

    by_card
        .into_values()
        .map(|mut variants| {
            variants.sort_by_key(|r| r.language);
            let cheapest = variants
                .iter()
                .enumerate()
                .filter_map(|(i, r)| r.price.map(|p| (i, p)))
                .fold(None::<(usize, f64)>, |acc, (i, p)| match acc {
                    Some((_, best)) if best <= p => acc,
                    _ => Some((i, p)),
                });

            let i = match cheapest {
                Some((i, _)) => i,
                None => variants
                    .iter()
                    .position(|r| r.failure.is_some())
                    .unwrap_or(0),
            };
            // never empty: every group was created by a push
            variants.swap_remove(i)
        })
        .collect()
}

/// Groups lookup results into the three buckets, keeping decklist order.
///
/// Input order does not matter; records may arrive in completion order and
/// may contain several language variants per card.
pub fn aggregate(records: Vec<PriceRecord>, thresholds: PriceThresholds) -> Report {
    let mut report = Report {
        decklist: Vec::new(),
        expansion: Vec::new(),
        not_found: Vec::new(),
        thresholds,
    };

    for record in resolve_variants(records) {
        match classify(record.price, &thresholds) {
            Bucket::Decklist => report.decklist.push(record),
            Bucket::Expansion => report.expansion.push(record),
            Bucket::NotFound => report.not_found.push(record),
        }
    }

    report
}
