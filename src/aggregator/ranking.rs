use std::cmp::Ordering;

use crate::types::{MarketRow, TickerRow};

/// The `limit` rows with the highest quote volume, highest first.
///
/// The sort is stable: equal volumes keep their upstream order. Rows without a
/// quote volume rank after every row that has one.
pub fn rank_by_quote_volume(rows: &[TickerRow], limit: usize) -> Vec<&TickerRow> {
    let mut ranked: Vec<&TickerRow> = rows.iter().collect();
    ranked.sort_by(|a, b| desc_missing_last(a.quote_volume, b.quote_volume));
    ranked.truncate(limit);
    ranked
}

/// Descending order for optional values, `None` last.
pub fn desc_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn to_market_row(row: &TickerRow) -> MarketRow {
    let market_cap = match (row.last_price, row.volume) {
        (Some(price), Some(volume)) => Some(price * volume),
        _ => None,
    };

    MarketRow {
        name: row.name.clone(),
        symbol: row.symbol.clone(),
        price: row.last_price,
        market_cap,
        volume_24h: row.volume,
        change_24h_percent: row.price_change_percent,
        avg_price: row.weighted_avg_price,
    }
}
