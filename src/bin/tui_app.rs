use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror the tracker's JSON shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    pub rows: Vec<RowResponse>,
    pub stats: StatsResponse,
    pub last_updated: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RowResponse {
    pub name: String,
    pub symbol: String,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub change_24h_percent: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    pub overview: OverviewResponse,
    pub health: MarketHealthResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverviewResponse {
    pub total_market_cap: f64,
    pub total_volume_24h: f64,
    pub avg_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketHealthResponse {
    pub positive_performers: u64,
    pub negative_performers: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HealthResponse {
    pub state: Option<String>,
    pub cycles_completed: Option<u64>,
    pub cycles_failed: Option<u64>,
    pub write_failures: Option<u64>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    /// Tracker is up but has not published its first snapshot.
    Loading,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub snapshot: Option<SnapshotResponse>,
    pub health: HealthResponse,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            snapshot: None,
            health: HealthResponse::default(),
            base_url,
        }
    }

    pub fn rows(&self) -> &[RowResponse] {
        self.snapshot
            .as_ref()
            .map(|s| s.rows.as_slice())
            .unwrap_or_default()
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let snapshot_url = format!("{}/api/snapshot", self.base_url);
        let health_url = format!("{}/health", self.base_url);

        let (snapshot_res, health_res) = tokio::join!(
            client.get(&snapshot_url).send(),
            client.get(&health_url).send(),
        );

        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }

        let resp = match snapshot_res {
            Ok(r) => r,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        if resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            self.status = ConnectionStatus::Loading;
            return;
        }

        match resp.json::<SnapshotResponse>().await {
            Ok(s) => {
                self.snapshot = Some(s);
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Compact dollar amount: `$1.23B`, `$45.6M`, `$7.89K`, `$0.4200`.
pub fn format_compact_usd(v: Option<f64>) -> String {
    let Some(v) = v else {
        return "—".to_string();
    };
    let abs = v.abs();
    if abs >= 1e12 {
        format!("${:.2}T", v / 1e12)
    } else if abs >= 1e9 {
        format!("${:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("${:.2}K", v / 1e3)
    } else if abs >= 1.0 {
        format!("${v:.2}")
    } else {
        format!("${v:.4}")
    }
}

pub fn format_change(v: Option<f64>) -> String {
    v.map_or("—".to_string(), |c| format!("{c:+.2}%"))
}

/// Base-asset volume, whole units.
pub fn format_volume(v: Option<f64>) -> String {
    v.map_or("—".to_string(), |v| format!("{v:.0}"))
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
