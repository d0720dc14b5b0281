//! Server-rendered HTML dashboard.

use std::time::Duration;

use crate::config::{REPORT_FILE, SPREADSHEET_FILE};
use crate::format;
use crate::types::Snapshot;

pub const LOADING_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
<meta http-equiv=\"refresh\" content=\"5\">\n<title>Crypto Market Tracker</title>\n</head>\n\
<body>\n<p>Loading data… please refresh in a moment.</p>\n</body>\n</html>\n";

const STYLE: &str = "body { font-family: Arial, sans-serif; max-width: 1200px; margin: 0 auto; padding: 20px; }\n\
h1 { color: #333; border-bottom: 2px solid #366092; padding-bottom: 10px; }\n\
table { border-collapse: collapse; width: 100%; margin: 20px 0; }\n\
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n\
th { background-color: #366092; color: white; }\n\
tr:nth-child(even) { background-color: #f2f2f2; }\n\
.summary span { display: inline-block; margin-right: 24px; }\n\
.positive { color: green; }\n\
.negative { color: red; }\n";

/// Escape text for use in element content and quoted attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Full dashboard for one snapshot. The page reloads itself after `refresh`.
pub fn render(snapshot: &Snapshot, refresh: Duration) -> String {
    let secs = refresh.as_secs().max(1);
    let stats = &snapshot.stats;
    let mut output = String::new();

    output.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    output.push_str("<meta charset=\"UTF-8\">\n");
    output.push_str(&format!("<meta http-equiv=\"refresh\" content=\"{secs}\">\n"));
    output.push_str("<title>Crypto Market Tracker</title>\n");
    output.push_str(&format!("<style>\n{STYLE}</style>\n</head>\n<body>\n"));

    output.push_str("<h1>Crypto Market Tracker</h1>\n");
    output.push_str(&format!(
        "<p>Last updated: {}</p>\n",
        escape(&snapshot.last_updated)
    ));
    output.push_str(&format!(
        "<p>Next refresh in <span id=\"countdown\">{secs}</span> seconds</p>\n"
    ));
    output.push_str(&format!(
        "<p><a href=\"/{SPREADSHEET_FILE}\">Download spreadsheet</a> | \
         <a href=\"/{REPORT_FILE}\">Download report</a></p>\n"
    ));

    output.push_str("<div class=\"summary\">\n");
    output.push_str(&format!(
        "<span>Average Price: {}</span>\n",
        format::opt_usd(stats.overview.avg_price)
    ));
    output.push_str(&format!(
        "<span>Total Market Cap: {}</span>\n",
        format::usd(stats.overview.total_market_cap)
    ));
    output.push_str(&format!(
        "<span>24h Volume: {}</span>\n",
        format::usd(stats.overview.total_volume_24h)
    ));
    output.push_str(&format!(
        "<span>Market Health: <span class=\"positive\">↑{}</span> <span class=\"negative\">↓{}</span></span>\n",
        stats.health.positive_performers, stats.health.negative_performers
    ));
    output.push_str("</div>\n");

    output.push_str("<table>\n<tr><th>Rank</th><th>Name</th><th>Symbol</th><th>Price</th>");
    output.push_str("<th>Market Cap</th><th>24h Change</th><th>24h Volume</th></tr>\n");
    for (i, row) in snapshot.rows.iter().enumerate() {
        let class = match row.change_24h_percent {
            Some(c) if c > 0.0 => "positive",
            _ => "negative",
        };
        output.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{class}\">{}</td><td>{}</td></tr>\n",
            i + 1,
            escape(&row.name),
            escape(&row.symbol),
            format::opt_usd(row.price),
            format::opt_usd(row.market_cap),
            format::opt_signed_pct(row.change_24h_percent),
            format::opt_usd(row.volume_24h),
        ));
    }
    output.push_str("</table>\n");

    output.push_str(&format!(
        "<script>\nlet left = {secs};\nsetInterval(() => {{\n  left = Math.max(0, left - 1);\n  \
         document.getElementById('countdown').textContent = left;\n}}, 1000);\n</script>\n"
    ));
    output.push_str("</body>\n</html>\n");

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::types::TickerRow;
    use chrono::{Local, TimeZone};

    fn snapshot_with(name: &str, change: f64) -> Snapshot {
        let rows = vec![TickerRow {
            name: name.to_string(),
            symbol: "BAD".to_string(),
            last_price: Some(2.0),
            volume: Some(1000.0),
            quote_volume: Some(2000.0),
            price_change_percent: Some(change),
            weighted_avg_price: Some(2.0),
        }];
        let (table, stats) = aggregate(&rows, Local.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap());
        Snapshot::new(table, stats)
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"A&B\"</b>'"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;&#39;");
    }

    #[test]
    fn coin_names_are_escaped_in_table() {
        let html = render(&snapshot_with("<script>alert(1)</script>", 1.0), Duration::from_secs(300));
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn page_carries_summary_links_and_refresh() {
        let html = render(&snapshot_with("Token", 1.5), Duration::from_secs(300));
        assert!(html.contains("content=\"300\""));
        assert!(html.contains("Last updated: 2024-03-14 12:00"));
        assert!(html.contains("href=\"/crypto_data.xlsx\""));
        assert!(html.contains("href=\"/market_report.docx\""));
        assert!(html.contains("Total Market Cap: $2,000.00"));
        assert!(html.contains("<td class=\"positive\">+1.50%</td>"));
    }

    #[test]
    fn non_positive_change_is_red() {
        let html = render(&snapshot_with("Flat", 0.0), Duration::from_secs(60));
        assert!(html.contains("<td class=\"negative\">+0.00%</td>"));
    }

    #[test]
    fn loading_page_asks_to_refresh() {
        assert!(LOADING_PAGE.contains("Loading data… please refresh in a moment."));
    }
}
