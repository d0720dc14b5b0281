use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::{Config, QUOTE_SUFFIX};
use crate::error::{AppError, Result};
use crate::types::{CoinListing, NameMap, RawTickerRow, TickerRow};

/// Anything that can produce one cycle's worth of eligible, named ticker rows.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<TickerRow>>;
}

/// Pulls 24h tickers from Binance-compatible endpoints and display names from
/// a CoinGecko-compatible coin listing.
pub struct BinanceFetcher {
    client: reqwest::Client,
    ticker_urls: Vec<String>,
    coin_list_url: String,
}

impl BinanceFetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        Self::with_endpoints(
            cfg.ticker_api_urls.clone(),
            cfg.coin_list_api_url.clone(),
            cfg.http_timeout,
        )
    }

    pub fn with_endpoints(
        ticker_urls: Vec<String>,
        coin_list_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, ticker_urls, coin_list_url })
    }

    /// Fetch the full 24h ticker list. Endpoints are tried in order and the
    /// first one that answers with a decodable body wins.
    pub async fn fetch_tickers(&self) -> Result<Vec<RawTickerRow>> {
        let mut last_err = None;

        for base in &self.ticker_urls {
            let url = format!("{base}/api/v3/ticker/24hr");
            match self.get_json::<Vec<RawTickerRow>>(&url).await {
                Ok(rows) => {
                    debug!(endpoint = %base, rows = rows.len(), "Ticker fetch ok");
                    return Ok(rows);
                }
                Err(e) => {
                    warn!(endpoint = %base, "Ticker endpoint failed: {e}");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            AppError::Upstream("no ticker endpoints configured".to_string())
        }))
    }

    /// Best-effort symbol → name lookup. Any failure yields an empty map.
    pub async fn fetch_coin_names(&self) -> NameMap {
        let url = format!("{}/coins/list", self.coin_list_url);
        match self.get_json::<Vec<CoinListing>>(&url).await {
            Ok(listings) => build_name_map(listings),
            Err(e) => {
                warn!("Couldn't fetch coin names, falling back to symbols: {e}");
                NameMap::new()
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!("{url} returned {status}")));
        }
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl MarketSource for BinanceFetcher {
    async fn fetch(&self) -> Result<Vec<TickerRow>> {
        let raw = self.fetch_tickers().await?;
        let api_total = raw.len();
        let names = self.fetch_coin_names().await;
        let rows = merge_names(raw, &names);

        info!(
            api_total,
            eligible = rows.len(),
            names = names.len(),
            "Fetched {} {QUOTE_SUFFIX} pairs from {} tickers",
            rows.len(),
            api_total,
        );
        Ok(rows)
    }
}

/// Build the lookup from a coin listing. Symbols are uppercased; when a symbol
/// repeats, the later entry wins.
pub fn build_name_map(listings: Vec<CoinListing>) -> NameMap {
    listings
        .into_iter()
        .map(|c| (c.symbol.to_uppercase(), c.name))
        .collect()
}

/// `BTCUSDT` → `BTC`. None when the pair is not quoted in USDT.
pub fn base_symbol(pair: &str) -> Option<String> {
    pair.strip_suffix(QUOTE_SUFFIX).map(|base| base.to_uppercase())
}

/// Keep USDT pairs only and attach a display name (the base symbol when the
/// name is unknown).
pub fn merge_names(raw: Vec<RawTickerRow>, names: &NameMap) -> Vec<TickerRow> {
    raw.into_iter()
        .filter_map(|r| {
            let symbol = base_symbol(&r.symbol)?;
            let name = names.get(&symbol).cloned().unwrap_or_else(|| symbol.clone());
            Some(TickerRow {
                name,
                symbol,
                last_price: r.last_price,
                volume: r.volume,
                quote_volume: r.quote_volume,
                price_change_percent: r.price_change_percent,
                weighted_avg_price: r.weighted_avg_price,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn ticker_payload() -> serde_json::Value {
        json!([
            {"symbol": "BTCUSDT", "lastPrice": "50000", "volume": "10", "quoteVolume": "500000",
             "priceChangePercent": "2.5", "weightedAvgPrice": "49000"},
            {"symbol": "ETHBTC", "lastPrice": "0.05", "volume": "1", "quoteVolume": "0.05",
             "priceChangePercent": "0", "weightedAvgPrice": "0.05"},
            {"symbol": "NEWUSDT", "lastPrice": "1", "volume": "2", "quoteVolume": "2",
             "priceChangePercent": "-1", "weightedAvgPrice": "1"}
        ])
    }

    fn healthy_router() -> Router {
        Router::new()
            .route("/api/v3/ticker/24hr", get(|| async { Json(ticker_payload()) }))
            .route(
                "/coins/list",
                get(|| async {
                    Json(json!([
                        {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"},
                        {"id": "ethereum", "symbol": "eth", "name": "Ethereum"}
                    ]))
                }),
            )
    }

    fn down_router() -> Router {
        Router::new()
            .route(
                "/api/v3/ticker/24hr",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
            )
            .route(
                "/coins/list",
                get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
            )
    }

    fn fetcher(ticker_urls: Vec<String>, coin_url: String) -> BinanceFetcher {
        BinanceFetcher::with_endpoints(ticker_urls, coin_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn base_symbol_strips_quote_suffix() {
        assert_eq!(base_symbol("BTCUSDT").as_deref(), Some("BTC"));
        assert_eq!(base_symbol("1000satsUSDT").as_deref(), Some("1000SATS"));
        assert_eq!(base_symbol("ETHBTC"), None);
    }

    #[test]
    fn later_listing_wins_on_duplicate_symbol() {
        let names = build_name_map(vec![
            CoinListing { symbol: "uni".to_string(), name: "Universe".to_string() },
            CoinListing { symbol: "uni".to_string(), name: "Uniswap".to_string() },
        ]);
        assert_eq!(names.get("UNI").map(String::as_str), Some("Uniswap"));
    }

    #[tokio::test]
    async fn fetch_keeps_usdt_pairs_and_attaches_names() {
        let base = serve(healthy_router()).await;
        let rows = fetcher(vec![base.clone()], base).fetch().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "BTC");
        assert_eq!(rows[0].name, "Bitcoin");
        assert_eq!(rows[0].quote_volume, Some(500000.0));
        // Unknown to the listing: falls back to the base symbol.
        assert_eq!(rows[1].symbol, "NEW");
        assert_eq!(rows[1].name, "NEW");
    }

    #[tokio::test]
    async fn fails_over_to_next_ticker_endpoint() {
        let down = serve(down_router()).await;
        let up = serve(healthy_router()).await;
        let rows = fetcher(vec![down, up.clone()], up).fetch().await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn all_endpoints_down_is_upstream_error() {
        let down = serve(down_router()).await;
        let err = fetcher(vec![down.clone(), down.clone()], down)
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn name_lookup_failure_falls_back_to_symbols() {
        let up = serve(healthy_router()).await;
        let down = serve(down_router()).await;
        let rows = fetcher(vec![up], down).fetch().await.unwrap();
        assert_eq!(rows[0].name, "BTC");
        assert_eq!(rows[1].name, "NEW");
    }
}
