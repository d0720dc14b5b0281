use std::io::Cursor;

use docx_rs::{
    AbstractNumbering, BreakType, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat,
    Numbering, NumberingId, Paragraph, Pic, Run, SpecialIndentType, Start, Style, StyleType,
};

use crate::error::{AppError, Result};
use crate::format;
use crate::publisher::chart::{Bin, CHART_HEIGHT, CHART_WIDTH};
use crate::types::MarketStats;

pub const REPORT_TITLE: &str = "Crypto Market Report";

const TITLE_STYLE: &str = "ReportTitle";
const HEADING_STYLE: &str = "ReportHeading";
const BULLET_NUMBERING: usize = 1;
const EMU_PER_INCH: u32 = 914_400;
const CHART_WIDTH_INCHES: u32 = 6;

/// One piece of the narrative report, independent of the document format.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportBlock {
    Title(String),
    Heading(String),
    Paragraph(String),
    /// Bulleted entry: a bold first line followed by plain lines.
    Bullet { lead: String, lines: Vec<String> },
    Chart { caption: String },
}

/// Sections in fixed order: title, timestamp, overview, top 5, price
/// statistics, 24h changes, market health, chart.
pub fn outline(stats: &MarketStats, bins: &[Bin], charted: usize) -> Vec<ReportBlock> {
    let mut blocks = vec![
        ReportBlock::Title(REPORT_TITLE.to_string()),
        ReportBlock::Paragraph(format!("Generated: {}", stats.timestamp)),
        ReportBlock::Heading("Market Overview".to_string()),
        ReportBlock::Paragraph(format!(
            "Total Market Cap: {}",
            format::usd(stats.overview.total_market_cap)
        )),
        ReportBlock::Paragraph(format!(
            "24h Volume: {}",
            format::usd(stats.overview.total_volume_24h)
        )),
        ReportBlock::Heading("Top 5 Cryptocurrencies by Market Cap".to_string()),
    ];

    for coin in &stats.top_by_market_cap {
        blocks.push(ReportBlock::Bullet {
            lead: format!("{} ({})", coin.name, coin.symbol),
            lines: vec![
                format!("Market Cap: {}", format::usd(coin.market_cap)),
                format!("Price: {}", format::opt_usd(coin.price)),
            ],
        });
    }

    let prices = &stats.price_statistics;
    blocks.extend([
        ReportBlock::Heading("Price Statistics".to_string()),
        ReportBlock::Paragraph(format!("Average Price: {}", format::opt_usd(prices.average))),
        ReportBlock::Paragraph(format!("Median Price: {}", format::opt_usd(prices.median))),
        ReportBlock::Paragraph(format!("Highest Price: {}", format::opt_usd(prices.highest))),
        ReportBlock::Paragraph(format!("Lowest Price: {}", format::opt_usd(prices.lowest))),
    ]);

    let changes = &stats.price_changes;
    let describe = |h: &Option<crate::types::ChangeHighlight>| match h {
        Some(h) => format!(
            "{} ({}) with {}",
            h.name,
            h.symbol,
            format::signed_pct(h.change_24h_percent)
        ),
        None => format::MISSING.to_string(),
    };
    blocks.extend([
        ReportBlock::Heading("24-Hour Price Changes".to_string()),
        ReportBlock::Paragraph(format!("Highest Gainer: {}", describe(&changes.highest))),
        ReportBlock::Paragraph(format!("Biggest Decliner: {}", describe(&changes.lowest))),
        ReportBlock::Paragraph(format!(
            "Average 24h Change: {}",
            format::opt_signed_pct(changes.average)
        )),
        ReportBlock::Heading("Market Health".to_string()),
        ReportBlock::Paragraph(format!("Coins Up: {}", stats.health.positive_performers)),
        ReportBlock::Paragraph(format!("Coins Down: {}", stats.health.negative_performers)),
    ]);

    let caption = match (bins.first(), bins.last()) {
        (Some(first), Some(last)) => format!(
            "Distribution of 24h price changes across {charted} coins ({} bins from {} to {})",
            bins.len(),
            format::signed_pct(first.lower),
            format::signed_pct(last.upper),
        ),
        _ => "Distribution of 24h price changes: no data".to_string(),
    };
    blocks.push(ReportBlock::Chart { caption });

    blocks
}

/// Render the outline as a `.docx`, embedding `chart_png` at the chart block.
pub fn render_docx(blocks: &[ReportBlock], chart_png: &[u8]) -> Result<Vec<u8>> {
    let mut docx = Docx::new()
        .add_style(
            Style::new(TITLE_STYLE, StyleType::Paragraph)
                .name("Report Title")
                .size(52)
                .bold(),
        )
        .add_style(
            Style::new(HEADING_STYLE, StyleType::Paragraph)
                .name("Report Heading")
                .size(32)
                .bold(),
        )
        .add_abstract_numbering(
            AbstractNumbering::new(BULLET_NUMBERING).add_level(
                Level::new(
                    0,
                    Start::new(1),
                    NumberFormat::new("bullet"),
                    LevelText::new("•"),
                    LevelJc::new("left"),
                )
                .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None),
            ),
        )
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING));

    for block in blocks {
        let paragraph = match block {
            ReportBlock::Title(text) => text_paragraph(text).style(TITLE_STYLE),
            ReportBlock::Heading(text) => text_paragraph(text).style(HEADING_STYLE),
            ReportBlock::Paragraph(text) => text_paragraph(text),
            ReportBlock::Bullet { lead, lines } => {
                let mut run = Run::new().add_text(lead.as_str()).bold();
                let mut paragraph = Paragraph::new();
                for line in lines {
                    paragraph = paragraph.add_run(run);
                    run = Run::new()
                        .add_break(BreakType::TextWrapping)
                        .add_text(line.as_str());
                }
                paragraph
                    .add_run(run)
                    .numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0))
            }
            ReportBlock::Chart { caption } => {
                docx = docx.add_paragraph(text_paragraph(caption));
                let width = CHART_WIDTH_INCHES * EMU_PER_INCH;
                let height = width / CHART_WIDTH * CHART_HEIGHT;
                let pic = Pic::new(chart_png).size(width, height);
                Paragraph::new().add_run(Run::new().add_image(pic))
            }
        };
        docx = docx.add_paragraph(paragraph);
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| AppError::Document(e.to_string()))?;
    Ok(buf.into_inner())
}

fn text_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::publisher::chart::{histogram, render_histogram};
    use crate::types::TickerRow;
    use chrono::{Local, TimeZone};
    use std::io::Read;

    fn stats_for(rows: &[TickerRow]) -> MarketStats {
        aggregate(rows, Local.with_ymd_and_hms(2024, 3, 14, 11, 0, 0).unwrap()).1
    }

    fn coin(symbol: &str, name: &str, price: f64, volume: f64, change: f64) -> TickerRow {
        TickerRow {
            name: name.to_string(),
            symbol: symbol.to_string(),
            last_price: Some(price),
            volume: Some(volume),
            quote_volume: Some(price * volume),
            price_change_percent: Some(change),
            weighted_avg_price: Some(price),
        }
    }

    fn headings(blocks: &[ReportBlock]) -> Vec<&str> {
        blocks
            .iter()
            .filter_map(|b| match b {
                ReportBlock::Heading(h) => Some(h.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn sections_come_in_fixed_order() {
        let rows = vec![
            coin("BTC", "Bitcoin", 50000.0, 10.0, 2.5),
            coin("ETH", "Ethereum", 3000.0, 100.0, -1.0),
        ];
        let stats = stats_for(&rows);
        let blocks = outline(&stats, &histogram(&[2.5, -1.0], 20), 2);

        assert_eq!(blocks[0], ReportBlock::Title(REPORT_TITLE.to_string()));
        assert_eq!(blocks[1], ReportBlock::Paragraph("Generated: 2024-03-14 11:00".to_string()));
        assert_eq!(
            headings(&blocks),
            vec![
                "Market Overview",
                "Top 5 Cryptocurrencies by Market Cap",
                "Price Statistics",
                "24-Hour Price Changes",
                "Market Health",
            ]
        );
        assert!(matches!(blocks.last(), Some(ReportBlock::Chart { .. })));
        assert!(blocks.contains(&ReportBlock::Paragraph(
            "Highest Gainer: Bitcoin (BTC) with +2.50%".to_string()
        )));
        assert!(blocks.contains(&ReportBlock::Paragraph(
            "Biggest Decliner: Ethereum (ETH) with -1.00%".to_string()
        )));
        assert!(blocks.contains(&ReportBlock::Paragraph("Total Market Cap: $800,000.00".to_string())));
    }

    #[test]
    fn top_section_lists_only_available_coins() {
        let rows = vec![
            coin("BTC", "Bitcoin", 50000.0, 10.0, 2.5),
            coin("ETH", "Ethereum", 3000.0, 100.0, -1.0),
            coin("SOL", "Solana", 150.0, 1000.0, 0.0),
        ];
        let stats = stats_for(&rows);
        let blocks = outline(&stats, &[], 0);
        let bullets: Vec<&ReportBlock> = blocks
            .iter()
            .filter(|b| matches!(b, ReportBlock::Bullet { .. }))
            .collect();
        assert_eq!(bullets.len(), 3);
        assert_eq!(
            bullets[0],
            &ReportBlock::Bullet {
                lead: "Bitcoin (BTC)".to_string(),
                lines: vec!["Market Cap: $500,000.00".to_string(), "Price: $50,000.00".to_string()],
            }
        );
    }

    #[test]
    fn empty_table_renders_placeholders() {
        let stats = stats_for(&[]);
        let blocks = outline(&stats, &[], 0);
        assert!(blocks.contains(&ReportBlock::Paragraph("Average Price: n/a".to_string())));
        assert!(blocks.contains(&ReportBlock::Paragraph("Highest Gainer: n/a".to_string())));
        assert_eq!(
            blocks.last(),
            Some(&ReportBlock::Chart {
                caption: "Distribution of 24h price changes: no data".to_string()
            })
        );
    }

    #[test]
    fn renders_docx_with_embedded_chart() {
        let dir = tempfile::tempdir().unwrap();
        let chart_path = dir.path().join("chart.png");
        let changes = [2.5, -1.0, 0.3];
        let bins = histogram(&changes, 20);
        render_histogram(&bins, &chart_path).unwrap();
        let png = std::fs::read(&chart_path).unwrap();

        let rows = vec![
            coin("BTC", "Bitcoin", 50000.0, 10.0, 2.5),
            coin("ETH", "Ethereum", 3000.0, 100.0, -1.0),
            coin("SOL", "Solana", 150.0, 1000.0, 0.3),
        ];
        let blocks = outline(&stats_for(&rows), &bins, changes.len());
        let bytes = render_docx(&blocks, &png).unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let media: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with("word/media/"))
            .map(str::to_string)
            .collect();
        assert!(!media.is_empty());
        let mut embedded = Vec::new();
        archive
            .by_name(&media[0])
            .unwrap()
            .read_to_end(&mut embedded)
            .unwrap();
        assert_eq!(&embedded[..4], b"\x89PNG");

        let mut body = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        let overview = body.find("Market Overview").unwrap();
        let health = body.find("Market Health").unwrap();
        assert!(overview < health);
        assert!(body.contains("Bitcoin (BTC)"));
    }
}
