use crate::domain::model::{Bucket, Report, RunSummary};

fn border(widths: &[usize], fill: char) -> String {
    let mut line = String::from("+");
    for w in widths {
        line.extend(std::iter::repeat(fill).take(w + 2));
        line.push('+');
    }
    line.push('\n');
    line
}

fn row_line<'a>(widths: &[usize], mut cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = String::from("|");
    for w in widths {
        let cell = cells.next().unwrap_or("");
        let pad = w.saturating_sub(cell.chars().count());
        line.push(' ');
        line.push_str(cell);
        line.extend(std::iter::repeat(' ').take(pad + 1));
        line.push('|');
    }
    line.push('\n');
    line
}

/// Grid table with `+---+` borders and a `=` line under the header.
pub fn grid_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = border(&widths, '-');
    out.push_str(&row_line(&widths, headers.iter().copied()));
    out.push_str(&border(&widths, '='));
    for row in rows {
        out.push_str(&row_line(&widths, row.iter().map(String::as_str)));
        out.push_str(&border(&widths, '-'));
    }
    out
}

fn section_title(title: &str) -> String {
    format!("\n{} {} {}\n", "-".repeat(20), title, "-".repeat(20))
}

pub fn bucket_title(bucket: Bucket, report: &Report) -> String {
    match bucket {
        Bucket::Decklist => format!("Decklist (≤{:.2}€)", report.thresholds.deck_max),
        Bucket::Expansion => format!("Expansion (>{:.2}€)", report.thresholds.deck_max),
        Bucket::NotFound => "Not Found".to_string(),
    }
}

/// Terminal rendering of a run: summary header, then one table per non-empty bucket.
pub fn render_text(report: &Report, summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Card Search Results ({})\n", summary.languages.label()));
    out.push_str("==================\n");
    out.push_str(&format!("Total cards searched: {}\n", report.card_count()));
    out.push_str(&format!("Cards not found: {}\n", report.not_found.len()));
    out.push_str(&format!("Total price: {:.2} €\n", report.total_price()));
    out.push_str(&format!(
        "Execution time: {:.2} seconds\n",
        summary.execution_time.as_secs_f64()
    ));

    for bucket in [Bucket::Decklist, Bucket::Expansion] {
        let records = report.bucket(bucket);
        if records.is_empty() {
            continue;
        }
        out.push_str(&section_title(&bucket_title(bucket, report)));

        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|r| {
                vec![
                    r.card.position().to_string(),
                    r.card.name.clone(),
                    r.price.map(|p| format!("{:.2} €", p)).unwrap_or_default(),
                    r.seller.clone().unwrap_or_else(|| "N/A".to_string()),
                ]
            })
            .collect();
        out.push_str(&grid_table(&["#", "Card", "Price", "Seller"], &rows));
        out.push_str(&format!(
            "{} total value: {:.2} €\n",
            bucket.label(),
            report.total(bucket)
        ));

        let breakdown = report.seller_breakdown(bucket);
        if !breakdown.is_empty() {
            out.push_str("Breakdown by seller:\n");
            for t in breakdown {
                out.push_str(&format!("  {}: {} cards - {:.2} €\n", t.seller, t.count, t.total));
            }
        }
    }

    if !report.not_found.is_empty() {
        out.push_str(&section_title(&bucket_title(Bucket::NotFound, report)));
        let rows: Vec<Vec<String>> = report
            .not_found
            .iter()
            .map(|r| {
                vec![
                    r.card.position().to_string(),
                    r.card.name.clone(),
                    report.not_found_reason(r).to_string(),
                ]
            })
            .collect();
        out.push_str(&grid_table(&["#", "Card", "Reason"], &rows));
    }

    out
}
