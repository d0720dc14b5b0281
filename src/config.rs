use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Ticker endpoints, tried in order until one answers.
pub const TICKER_API_URLS: &[&str] = &[
    "https://data-api.binance.vision",
    "https://api.binance.com",
    "https://api-gcp.binance.com",
    "https://api1.binance.com",
];
pub const COIN_LIST_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Quote currency every tracked pair must end with.
pub const QUOTE_SUFFIX: &str = "USDT";

/// Rows kept per cycle, ranked by quote volume.
pub const TOP_N: usize = 50;

/// Entries in the "top by market cap" list.
pub const TOP_MARKET_CAP_COUNT: usize = 5;

/// Bins in the 24h-change histogram.
pub const HISTOGRAM_BINS: usize = 20;

/// Default refresh interval (seconds).
pub const REFRESH_INTERVAL_SECS: u64 = 300;

pub const SPREADSHEET_FILE: &str = "crypto_data.xlsx";
pub const REPORT_FILE: &str = "market_report.docx";
pub const CHART_FILE: &str = "price_changes.png";

#[derive(Debug, Clone)]
pub struct Config {
    /// Ticker base URLs in failover order (TICKER_API_URLS, comma-separated)
    pub ticker_api_urls: Vec<String>,
    pub coin_list_api_url: String,
    pub refresh_interval: Duration,
    pub http_timeout: Duration,
    /// Directory receiving the spreadsheet, report and chart (OUTPUT_DIR)
    pub output_dir: PathBuf,
    pub api_port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let ticker_api_urls = match std::env::var("TICKER_API_URLS") {
            Ok(raw) => parse_url_list(&raw),
            Err(_) => TICKER_API_URLS.iter().map(|s| s.to_string()).collect(),
        };
        if ticker_api_urls.is_empty() {
            return Err(AppError::Config(
                "TICKER_API_URLS must name at least one endpoint".to_string(),
            ));
        }

        let refresh_secs = parse_env_u64("REFRESH_INTERVAL_SECS", REFRESH_INTERVAL_SECS)?;
        if refresh_secs == 0 {
            return Err(AppError::Config(
                "REFRESH_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            ticker_api_urls,
            coin_list_api_url: std::env::var("COIN_LIST_API_URL")
                .unwrap_or_else(|_| COIN_LIST_API_URL.to_string()),
            refresh_interval: Duration::from_secs(refresh_secs),
            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn spreadsheet_path(&self) -> PathBuf {
        self.output_dir.join(SPREADSHEET_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }

    pub fn chart_path(&self) -> PathBuf {
        self.output_dir.join(CHART_FILE)
    }
}

fn parse_env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| AppError::Config(format!("{key} must be a non-negative integer"))),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated URL list, dropping blanks and trailing slashes.
pub fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
