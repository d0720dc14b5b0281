use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Upstream payloads
// ---------------------------------------------------------------------------

/// One pair from the 24h ticker endpoint. Numeric fields arrive as decimal
/// strings; anything that does not parse to a finite number becomes `None`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTickerRow {
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quote_volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_change_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weighted_avg_price: Option<f64>,
}

/// One entry of the coin listing used for display names.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinListing {
    pub symbol: String,
    pub name: String,
}

/// Uppercase base symbol → display name.
pub type NameMap = HashMap<String, String>;

/// Accepts `"123.4"`, `123.4` or `null`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_number(&v))
}

pub fn parse_number(v: &serde_json::Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .filter(|x| x.is_finite())
}

// ---------------------------------------------------------------------------
// Pipeline rows
// ---------------------------------------------------------------------------

/// A USDT pair after the fetch stage: filtered, named, base symbol derived.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerRow {
    pub name: String,
    /// Base asset, quote suffix stripped.
    pub symbol: String,
    pub last_price: Option<f64>,
    pub volume: Option<f64>,
    pub quote_volume: Option<f64>,
    pub price_change_percent: Option<f64>,
    pub weighted_avg_price: Option<f64>,
}

/// One ranked asset in the published table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRow {
    pub name: String,
    pub symbol: String,
    pub price: Option<f64>,
    /// Price × 24h base volume. A proxy, not circulating-supply market cap.
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub change_24h_percent: Option<f64>,
    pub avg_price: Option<f64>,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStats {
    /// Local time the cycle completed, `%Y-%m-%d %H:%M`.
    pub timestamp: String,
    pub overview: MarketOverview,
    pub health: MarketHealth,
    pub top_by_market_cap: Vec<TopCoin>,
    pub price_statistics: PriceStatistics,
    pub price_changes: PriceChanges,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOverview {
    pub total_market_cap: f64,
    pub total_volume_24h: f64,
    pub avg_price: Option<f64>,
    pub median_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketHealth {
    pub positive_performers: usize,
    pub negative_performers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCoin {
    pub name: String,
    pub symbol: String,
    pub market_cap: f64,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStatistics {
    pub average: Option<f64>,
    pub median: Option<f64>,
    pub highest: Option<f64>,
    pub lowest: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChanges {
    pub highest: Option<ChangeHighlight>,
    pub lowest: Option<ChangeHighlight>,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeHighlight {
    pub name: String,
    pub symbol: String,
    pub change_24h_percent: f64,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The latest published table and its statistics. Replaced whole each cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub rows: Vec<MarketRow>,
    pub stats: MarketStats,
    pub last_updated: String,
}

impl Snapshot {
    pub fn new(rows: Vec<MarketRow>, stats: MarketStats) -> Self {
        let last_updated = stats.timestamp.clone();
        Self { rows, stats, last_updated }
    }
}

// ---------------------------------------------------------------------------
// Scheduler state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Fetching,
    Aggregating,
    Publishing,
    Sleeping,
    Stopped,
}

impl CycleState {
    pub fn as_u8(self) -> u8 {
        match self {
            CycleState::Idle => 0,
            CycleState::Fetching => 1,
            CycleState::Aggregating => 2,
            CycleState::Publishing => 3,
            CycleState::Sleeping => 4,
            CycleState::Stopped => 5,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => CycleState::Fetching,
            2 => CycleState::Aggregating,
            3 => CycleState::Publishing,
            4 => CycleState::Sleeping,
            5 => CycleState::Stopped,
            _ => CycleState::Idle,
        }
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CycleState::Idle => "idle",
            CycleState::Fetching => "fetching",
            CycleState::Aggregating => "aggregating",
            CycleState::Publishing => "publishing",
            CycleState::Sleeping => "sleeping",
            CycleState::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_row_parses_string_fields() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "lastPrice": "50000.00",
            "volume": "10",
            "quoteVolume": "500000",
            "priceChangePercent": "-2.5",
            "weightedAvgPrice": "49000",
            "count": 1234
        }"#;
        let row: RawTickerRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.symbol, "BTCUSDT");
        assert_eq!(row.last_price, Some(50000.0));
        assert_eq!(row.price_change_percent, Some(-2.5));
    }

    #[test]
    fn malformed_or_missing_fields_become_none() {
        let json = r#"{
            "symbol": "XYZUSDT",
            "lastPrice": "not-a-number",
            "volume": null,
            "quoteVolume": 12.5,
            "priceChangePercent": "NaN"
        }"#;
        let row: RawTickerRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.last_price, None);
        assert_eq!(row.volume, None);
        assert_eq!(row.quote_volume, Some(12.5));
        assert_eq!(row.price_change_percent, None);
        assert_eq!(row.weighted_avg_price, None);
    }
}
