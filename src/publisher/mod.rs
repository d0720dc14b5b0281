pub mod chart;
pub mod report;
pub mod spreadsheet;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{Config, HISTOGRAM_BINS};
use crate::error::{AppError, Result};
use crate::types::{MarketRow, MarketStats};

// ---------------------------------------------------------------------------
// Publish
// ---------------------------------------------------------------------------

/// Durable outputs of a cycle. Called from the scheduler task only.
pub trait Publish: Send + Sync {
    /// Two-sheet workbook, written every cycle.
    fn write_spreadsheet(&self, rows: &[MarketRow], stats: &MarketStats) -> Result<()>;

    /// Narrative document with the 24h-change histogram embedded.
    fn write_report(&self, rows: &[MarketRow], stats: &MarketStats) -> Result<()>;
}

/// Writes artifacts into a directory on local disk.
pub struct FilePublisher {
    spreadsheet_path: PathBuf,
    report_path: PathBuf,
    chart_path: PathBuf,
}

impl FilePublisher {
    pub fn new(cfg: &Config) -> Result<Self> {
        fs::create_dir_all(&cfg.output_dir)?;
        Ok(Self {
            spreadsheet_path: cfg.spreadsheet_path(),
            report_path: cfg.report_path(),
            chart_path: cfg.chart_path(),
        })
    }
}

impl Publish for FilePublisher {
    fn write_spreadsheet(&self, rows: &[MarketRow], stats: &MarketStats) -> Result<()> {
        let bytes = spreadsheet::build_workbook(rows, stats)?;
        write_atomic(&self.spreadsheet_path, &bytes)?;
        debug!(path = %self.spreadsheet_path.display(), rows = rows.len(), "Spreadsheet written");
        Ok(())
    }

    fn write_report(&self, rows: &[MarketRow], stats: &MarketStats) -> Result<()> {
        let changes: Vec<f64> = rows.iter().filter_map(|r| r.change_24h_percent).collect();
        let bins = chart::histogram(&changes, HISTOGRAM_BINS);
        chart::render_histogram(&bins, &self.chart_path)?;
        let png = fs::read(&self.chart_path)?;

        let blocks = report::outline(stats, &bins, changes.len());
        let bytes = report::render_docx(&blocks, &png)?;
        write_atomic(&self.report_path, &bytes)?;

        info!(
            path = %self.report_path.display(),
            chart = %self.chart_path.display(),
            "Market report written"
        );
        Ok(())
    }
}

/// Write `bytes` to a hidden sibling of `path`, then rename over it.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| AppError::Config(format!("not a file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", name.to_string_lossy()));

    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::config::{CHART_FILE, REPORT_FILE, SPREADSHEET_FILE};
    use crate::types::TickerRow;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use chrono::{Local, TimeZone};
    use std::io::Read;

    fn publisher_in(dir: &Path) -> FilePublisher {
        FilePublisher {
            spreadsheet_path: dir.join(SPREADSHEET_FILE),
            report_path: dir.join(REPORT_FILE),
            chart_path: dir.join(CHART_FILE),
        }
    }

    fn sample(n: usize) -> (Vec<MarketRow>, MarketStats) {
        let rows: Vec<TickerRow> = (0..n)
            .map(|i| TickerRow {
                name: format!("Coin {i}"),
                symbol: format!("C{i}"),
                last_price: Some(1.0 + i as f64),
                volume: Some(100.0),
                quote_volume: Some(100.0 * (1.0 + i as f64)),
                price_change_percent: Some(i as f64 - 3.0),
                weighted_avg_price: Some(1.0 + i as f64),
            })
            .collect();
        aggregate(&rows, Local.with_ymd_and_hms(2024, 3, 14, 9, 30, 0).unwrap())
    }

    #[test]
    fn atomic_write_replaces_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.bin")]);
    }

    #[test]
    fn spreadsheet_is_written_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher_in(dir.path());

        let (rows, stats) = sample(3);
        publisher.write_spreadsheet(&rows, &stats).unwrap();
        let first = fs::read(dir.path().join(SPREADSHEET_FILE)).unwrap();

        let (rows, stats) = sample(40);
        publisher.write_spreadsheet(&rows, &stats).unwrap();
        let second = fs::read(dir.path().join(SPREADSHEET_FILE)).unwrap();

        assert_eq!(&second[..2], b"PK");
        assert_ne!(first, second);

        let mut workbook: Xlsx<_> = open_workbook(dir.path().join(SPREADSHEET_FILE)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Market Data", "Analysis"]);
        let data = workbook.worksheet_range("Market Data").unwrap();
        assert_eq!(data.height(), 41);
        assert_eq!(data.get_value((1, 0)), Some(&Data::String("Coin 39".to_string())));
    }

    #[test]
    fn report_writes_document_and_chart() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher_in(dir.path());

        let (rows, stats) = sample(8);
        publisher.write_report(&rows, &stats).unwrap();

        assert_eq!(&fs::read(dir.path().join(CHART_FILE)).unwrap()[..4], b"\x89PNG");

        let file = fs::File::open(dir.path().join(REPORT_FILE)).unwrap();
        let mut docx = zip::ZipArchive::new(file).unwrap();
        assert!(docx.file_names().any(|n| n.starts_with("word/media/")));
        let mut body = String::new();
        docx.by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert!(body.contains("Top 5 Cryptocurrencies by Market Cap"));
        assert!(body.contains("Coin 7 (C7)"));
    }

    #[test]
    fn missing_directory_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher_in(&dir.path().join("gone"));

        let (rows, stats) = sample(2);
        assert!(matches!(
            publisher.write_spreadsheet(&rows, &stats),
            Err(AppError::Io(_))
        ));
    }
}
