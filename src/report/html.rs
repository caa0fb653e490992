use crate::domain::model::{Bucket, PriceRecord, Report, RunSummary};
use crate::report::text::bucket_title;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 2em; }
h1, h2 { color: #2c3e50; }
table { border-collapse: collapse; width: 100%; margin-bottom: 2em; }
th, td { border: 1px solid #ccc; padding: 8px; text-align: left; }
th { background: #f4f4f4; }
.not-found { color: #c0392b; }
.lowest-price { background-color: #d4edda; font-weight: bold; }
.price-cell { text-align: center; }";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn priced_table(html: &mut Vec<String>, records: &[PriceRecord], sellers: &[String]) {
    html.push("<table>".to_string());
    let mut header = String::from("<tr><th>#</th><th>Card Name</th>");
    for seller in sellers {
        header.push_str(&format!("<th>{}</th>", escape_html(seller)));
    }
    header.push_str("</tr>");
    html.push(header);

    for record in records {
        let mut row = format!(
            "<tr><td>{}</td><td>{}</td>",
            record.card.position(),
            escape_html(&record.card.name)
        );
        for seller in sellers {
            match record.offer_for(seller) {
                Some(price) => {
                    let class = if record.seller.as_deref() == Some(seller.as_str()) {
                        "price-cell lowest-price"
                    } else {
                        "price-cell"
                    };
                    row.push_str(&format!("<td class='{}'>{:.2} €</td>", class, price));
                }
                None => row.push_str("<td class='price-cell not-found'>-</td>"),
            }
        }
        row.push_str("</tr>");
        html.push(row);
    }
    html.push("</table>".to_string());
}

/// Standalone HTML page with the three buckets and the input as it was before cleaning.
pub fn render_html(report: &Report, summary: &RunSummary) -> String {
    let languages = summary.languages.label();
    let mut html = vec![
        "<!DOCTYPE html>".to_string(),
        "<html lang='en'>".to_string(),
        "<head>".to_string(),
        "<meta charset='UTF-8'>".to_string(),
        "<title>CardMarket Results</title>".to_string(),
        format!("<style>\n{}\n</style>", STYLE),
        "</head>".to_string(),
        "<body>".to_string(),
        format!("<h1>CardMarket Results ({})</h1>", languages),
        format!("<p><b>Total cards searched:</b> {}</p>", report.card_count()),
        format!("<p><b>Cards not found:</b> {}</p>", report.not_found.len()),
        format!("<p><b>Total price:</b> {:.2} €</p>", report.total_price()),
        format!(
            "<p><b>Execution time:</b> {:.2} seconds</p>",
            summary.execution_time.as_secs_f64()
        ),
    ];

    for bucket in [Bucket::Decklist, Bucket::Expansion] {
        let records = report.bucket(bucket);
        if records.is_empty() {
            continue;
        }
        html.push(format!("<h2>{}</h2>", escape_html(&bucket_title(bucket, report))));
        priced_table(&mut html, records, &summary.sellers);
        html.push(format!(
            "<p><b>Total cards in {}:</b> {}</p>",
            bucket.label().to_lowercase(),
            records.len()
        ));
        html.push(format!(
            "<p><b>{} total value:</b> {:.2} €</p>",
            bucket.label(),
            report.total(bucket)
        ));
    }

    if !report.not_found.is_empty() {
        html.push("<h2>Cards Not Found</h2>".to_string());
        html.push("<table>".to_string());
        html.push("<tr><th>#</th><th>Card Name</th><th>Reason</th></tr>".to_string());
        for record in &report.not_found {
            html.push(format!(
                "<tr><td>{}</td><td>{}</td><td class='not-found'>{}</td></tr>",
                record.card.position(),
                escape_html(&record.card.name),
                escape_html(&report.not_found_reason(record).to_string())
            ));
        }
        html.push("</table>".to_string());
        html.push(format!(
            "<p><b>Total cards not found:</b> {}</p>",
            report.not_found.len()
        ));
    }

    html.push("<h2>Input Cards List</h2><pre>".to_string());
    for line in &summary.original_lines {
        html.push(escape_html(line));
    }
    html.push("</pre>".to_string());
    html.push("</body></html>".to_string());

    html.join("\n")
}
