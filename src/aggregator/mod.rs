//! Ranking and summary statistics over one cycle's ticker rows.

pub mod ranking;
pub mod stats;

use chrono::{DateTime, Local};

use crate::config::TOP_N;
use crate::types::{MarketRow, MarketStats, TickerRow};

pub use stats::compute_stats;

/// Rank by quote volume, keep the top `TOP_N`, project into the table shape
/// and summarise it. The stats are always computed from the returned table.
pub fn aggregate(rows: &[TickerRow], generated_at: DateTime<Local>) -> (Vec<MarketRow>, MarketStats) {
    let table: Vec<MarketRow> = ranking::rank_by_quote_volume(rows, TOP_N)
        .into_iter()
        .map(ranking::to_market_row)
        .collect();
    let stats = compute_stats(&table, generated_at);
    (table, stats)
}
