use chrono::{DateTime, Local};

use crate::aggregator::ranking::desc_missing_last;
use crate::config::TOP_MARKET_CAP_COUNT;
use crate::types::{
    ChangeHighlight, MarketHealth, MarketOverview, MarketRow, MarketStats, PriceChanges,
    PriceStatistics, TopCoin,
};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Summarise one cycle's table. Missing values are skipped by every
/// reduction; sums of nothing are `0.0`, means/medians/extremes of nothing
/// are `None`.
pub fn compute_stats(rows: &[MarketRow], generated_at: DateTime<Local>) -> MarketStats {
    let prices = defined(rows.iter().map(|r| r.price));
    let caps = defined(rows.iter().map(|r| r.market_cap));
    let volumes = defined(rows.iter().map(|r| r.volume_24h));
    let changes = defined(rows.iter().map(|r| r.change_24h_percent));

    let avg_price = mean(&prices);
    let median_price = median(&prices);

    MarketStats {
        timestamp: generated_at.format(TIMESTAMP_FORMAT).to_string(),
        overview: MarketOverview {
            total_market_cap: caps.iter().sum(),
            total_volume_24h: volumes.iter().sum(),
            avg_price,
            median_price,
        },
        health: MarketHealth {
            positive_performers: changes.iter().filter(|c| **c > 0.0).count(),
            negative_performers: changes.iter().filter(|c| **c < 0.0).count(),
        },
        top_by_market_cap: top_by_market_cap(rows, TOP_MARKET_CAP_COUNT),
        price_statistics: PriceStatistics {
            average: avg_price,
            median: median_price,
            highest: prices.iter().copied().reduce(f64::max),
            lowest: prices.iter().copied().reduce(f64::min),
        },
        price_changes: PriceChanges {
            highest: change_extreme(rows, |candidate, best| candidate > best),
            lowest: change_extreme(rows, |candidate, best| candidate < best),
            average: mean(&changes),
        },
    }
}

fn defined(values: impl Iterator<Item = Option<f64>>) -> Vec<f64> {
    values.flatten().collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Middle value; the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Largest market caps first. Stable: ties keep table order. Rows without a
/// market cap are left out, so fewer than `n` entries may come back.
fn top_by_market_cap(rows: &[MarketRow], n: usize) -> Vec<TopCoin> {
    let mut with_cap: Vec<&MarketRow> = rows.iter().filter(|r| r.market_cap.is_some()).collect();
    with_cap.sort_by(|a, b| desc_missing_last(a.market_cap, b.market_cap));

    with_cap
        .into_iter()
        .take(n)
        .filter_map(|r| {
            Some(TopCoin {
                name: r.name.clone(),
                symbol: r.symbol.clone(),
                market_cap: r.market_cap?,
                price: r.price,
            })
        })
        .collect()
}

/// First row whose change beats every earlier one under `better`.
fn change_extreme(rows: &[MarketRow], better: impl Fn(f64, f64) -> bool) -> Option<ChangeHighlight> {
    let mut best: Option<(&MarketRow, f64)> = None;
    for row in rows {
        let Some(change) = row.change_24h_percent else { continue };
        match best {
            Some((_, current)) if !better(change, current) => {}
            _ => best = Some((row, change)),
        }
    }

    best.map(|(row, change)| ChangeHighlight {
        name: row.name.clone(),
        symbol: row.symbol.clone(),
        change_24h_percent: change,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn mean_of_nothing_is_undefined() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }
}
