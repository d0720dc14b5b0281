use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};

use crate::format;
use crate::types::{MarketRow, MarketStats};

pub const DATA_SHEET: &str = "Market Data";
pub const ANALYSIS_SHEET: &str = "Analysis";

pub const DATA_COLUMNS: [&str; 7] = [
    "Name",
    "Symbol",
    "Price",
    "Market Cap",
    "Volume (24h)",
    "Change (24h)",
    "Avg Price",
];

const HEADER_FILL: u32 = 0x366092;

/// One line of the analysis sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisCell {
    Text(String),
    Count(usize),
    /// Label-only row that introduces a group.
    Section,
    Blank,
}

/// Label/value pairs for the "Analysis" sheet, in display order.
pub fn analysis_rows(stats: &MarketStats) -> Vec<(&'static str, AnalysisCell)> {
    vec![
        ("Last Updated", AnalysisCell::Text(stats.timestamp.clone())),
        ("Market Overview", AnalysisCell::Section),
        (
            "Total Market Cap",
            AnalysisCell::Text(format::usd(stats.overview.total_market_cap)),
        ),
        (
            "24h Volume",
            AnalysisCell::Text(format::usd(stats.overview.total_volume_24h)),
        ),
        (
            "Average Price",
            AnalysisCell::Text(format::opt_usd(stats.overview.avg_price)),
        ),
        ("", AnalysisCell::Blank),
        ("Market Health", AnalysisCell::Section),
        ("Coins Up", AnalysisCell::Count(stats.health.positive_performers)),
        ("Coins Down", AnalysisCell::Count(stats.health.negative_performers)),
    ]
}

/// Render both sheets to an in-memory `.xlsx`.
pub fn build_workbook(rows: &[MarketRow], stats: &MarketStats) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    write_data_sheet(workbook.add_worksheet(), rows)?;
    write_analysis_sheet(workbook.add_worksheet(), stats)?;

    workbook.save_to_buffer()
}

fn write_data_sheet(sheet: &mut Worksheet, rows: &[MarketRow]) -> Result<(), XlsxError> {
    sheet.set_name(DATA_SHEET)?;

    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL));
    let money = Format::new().set_num_format("#,##0.00");

    for (col, title) in DATA_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, row.name.as_str())?;
        sheet.write_string(r, 1, row.symbol.as_str())?;

        let numbers = [
            row.price,
            row.market_cap,
            row.volume_24h,
            row.change_24h_percent,
            row.avg_price,
        ];
        // Missing values stay as empty cells.
        for (offset, value) in numbers.into_iter().enumerate() {
            if let Some(v) = value {
                sheet.write_number_with_format(r, 2 + offset as u16, v, &money)?;
            }
        }
    }

    sheet.set_column_width(0, 24)?;
    for col in 2..DATA_COLUMNS.len() as u16 {
        sheet.set_column_width(col, 18)?;
    }
    Ok(())
}

fn write_analysis_sheet(sheet: &mut Worksheet, stats: &MarketStats) -> Result<(), XlsxError> {
    sheet.set_name(ANALYSIS_SHEET)?;

    let section = Format::new().set_bold();

    for (i, (label, cell)) in analysis_rows(stats).into_iter().enumerate() {
        let r = i as u32;
        match cell {
            AnalysisCell::Section => {
                sheet.write_string_with_format(r, 0, label, &section)?;
            }
            AnalysisCell::Text(value) => {
                sheet.write_string(r, 0, label)?;
                sheet.write_string(r, 1, value)?;
            }
            AnalysisCell::Count(n) => {
                sheet.write_string(r, 0, label)?;
                sheet.write_number(r, 1, n as f64)?;
            }
            AnalysisCell::Blank => {}
        }
    }

    sheet.set_column_width(0, 20)?;
    sheet.set_column_width(1, 24)?;
    Ok(())
}
