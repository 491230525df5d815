use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::charts::bar_charts;
use crate::config::AppConfig;
use crate::fetch::{fetch_json, FetchError};
use crate::metrics::{aggregate, METRIC_SPECS};
use crate::models::{DashboardReport, MinerType, SourceEntry};
use crate::normalize::{normalize, NormalizeError, Normalized, TableSchema, BLOCKS, LEADERBOARD};

const TITLE: &str = "WESO mining Leaderboard";

/// Shared, read-only per process. The miner type is not stored here; every
/// request brings its own.
pub struct AppState {
    pub config: AppConfig,
    pub client: Client,
}

/// Anything that stops a render pass. Nothing is shown after one of these.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("error fetching data from {url}: {error}")]
    Fetch { url: String, error: FetchError },
    #[error("error processing data from {url}: {error}")]
    Normalize { url: String, error: NormalizeError },
}

impl PassError {
    fn url(&self) -> &str {
        match self {
            PassError::Fetch { url, .. } | PassError::Normalize { url, .. } => url,
        }
    }

    fn detail(&self) -> Value {
        let detail = match self {
            PassError::Fetch { error, .. } => serde_json::to_value(error),
            PassError::Normalize { error, .. } => serde_json::to_value(error),
        };
        detail.unwrap_or(Value::Null)
    }
}

impl IntoResponse for PassError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.to_string(),
            "url": self.url(),
            "detail": self.detail(),
        });
        (StatusCode::BAD_GATEWAY, Json(body)).into_response()
    }
}

async fn fetch_table(
    state: &AppState,
    url: &str,
    schema: &TableSchema,
) -> Result<Normalized, PassError> {
    let raw = fetch_json(&state.client, url, state.config.fetch.timeout())
        .await
        .map_err(|error| PassError::Fetch {
            url: url.to_string(),
            error,
        })?;

    normalize(raw, schema).map_err(|error| PassError::Normalize {
        url: url.to_string(),
        error,
    })
}

/// Fetch, normalize and summarise one source. Fetches run one after another.
pub async fn run_pass(state: &AppState, miner_type: MinerType) -> Result<DashboardReport, PassError> {
    let pass_id = Uuid::new_v4().to_string();
    let source = state.config.sources.get(miner_type);
    let start = Instant::now();
    log::info!("[{}] render pass for {}", pass_id, miner_type.label());

    let leaderboard = fetch_table(state, &source.leaderboard_url, &LEADERBOARD).await?;
    let mut notices = leaderboard.notices;
    let metrics = aggregate(&leaderboard.table, &METRIC_SPECS);
    let (charts, chart_notices) = bar_charts(&leaderboard.table);
    notices.extend(chart_notices);

    let blocks = fetch_table(state, &source.blocks_url, &BLOCKS).await?;
    notices.extend(blocks.notices);
    let blocks = blocks.table;

    log::info!(
        "[{}] {} miners, {} blocks in {}ms",
        pass_id,
        leaderboard.table.rows.len(),
        blocks.rows.len(),
        start.elapsed().as_millis()
    );

    Ok(DashboardReport {
        pass_id,
        miner_type,
        title: TITLE.to_string(),
        caption: format!("Displaying data for: {}", miner_type.label()),
        leaderboard: leaderboard.table,
        metrics,
        charts,
        blocks,
        notices,
        fetched_at: Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    miner_type: Option<MinerType>,
}

pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardReport>, PassError> {
    let miner_type = query
        .miner_type
        .unwrap_or(state.config.dashboard.default_miner_type);

    run_pass(&state, miner_type).await.map(Json).map_err(|e| {
        log::error!("{}", e);
        e
    })
}

pub async fn get_sources(State(state): State<Arc<AppState>>) -> Json<Vec<SourceEntry>> {
    let default = state.config.dashboard.default_miner_type;
    let sources = MinerType::ALL
        .iter()
        .map(|&miner_type| SourceEntry {
            miner_type,
            label: miner_type.label(),
            default: miner_type == default,
        })
        .collect();
    Json(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::fetch::build_client;
    use crate::fetch::tests::serve;
    use crate::metrics::MetricValue;
    use axum::body::HttpBody;
    use axum::{routing::get, Router};

    async fn body_json(response: Response) -> Value {
        let mut body = response.into_body();
        let mut bytes = Vec::new();
        while let Some(chunk) = body.data().await {
            bytes.extend_from_slice(&chunk.unwrap());
        }
        serde_json::from_slice(&bytes).unwrap()
    }

    fn state_for(leaderboard_url: String, blocks_url: String) -> AppState {
        let mut config = AppConfig::default();
        config.sources.proof_of_work = SourceConfig {
            leaderboard_url,
            blocks_url,
        };
        let client = build_client(&config.fetch).unwrap();
        AppState { config, client }
    }

    #[tokio::test]
    async fn full_pass_builds_report() {
        let app = Router::new()
            .route(
                "/leaderboard",
                get(|| async {
                    r#"[{"wallet_addr":"W1","blocks_won":2,"crypto_paid":1.5,"crypto_pending":0.5,"hashes_submitted":100}]"#
                }),
            )
            .route(
                "/blocks",
                get(|| async {
                    r#"[{"block_number":7,"winner_wallet_addr":"W1","block_hash":"ff","active_miners":3,"exact":false}]"#
                }),
            );
        let addr = serve(app).await;
        let state = state_for(
            format!("http://{}/leaderboard", addr),
            format!("http://{}/blocks?limit=20", addr),
        );

        let report = run_pass(&state, MinerType::ProofOfWork).await.unwrap();
        assert_eq!(report.caption, "Displaying data for: Proof of Work");
        assert_eq!(report.leaderboard.columns.len(), 6);
        assert_eq!(report.leaderboard.rows[0][2], json!(2.0));
        let values: Vec<MetricValue> = report.metrics.iter().map(|m| m.value).collect();
        assert_eq!(
            values,
            vec![
                MetricValue::Count(2),
                MetricValue::Amount(2.0),
                MetricValue::Count(100)
            ]
        );
        assert_eq!(report.charts.len(), 3);
        let blocks = report.blocks;
        assert_eq!(
            blocks.columns,
            vec!["Block Number", "Winner", "Block Hash", "Active Miners"]
        );
        assert!(report.notices.is_empty());
    }

    #[tokio::test]
    async fn object_payload_halts_pass_with_raw_data() {
        let app = Router::new().route(
            "/leaderboard",
            get(|| async { r#"{"detail":"not ready"}"# }),
        );
        let addr = serve(app).await;
        let url = format!("http://{}/leaderboard", addr);
        let state = state_for(url.clone(), format!("http://{}/blocks", addr));

        match run_pass(&state, MinerType::ProofOfWork).await {
            Err(PassError::Normalize {
                url: failed,
                error: NormalizeError::MalformedShape { raw_data, .. },
            }) => {
                assert_eq!(failed, url);
                assert_eq!(raw_data, json!({"detail": "not ready"}));
            }
            other => panic!("unexpected: {:?}", other.map(|r| r.pass_id)),
        }
    }

    #[tokio::test]
    async fn blocks_failure_fails_whole_pass() {
        let app = Router::new()
            .route("/leaderboard", get(|| async { "[]" }))
            .route(
                "/blocks",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
            );
        let addr = serve(app).await;
        let state = state_for(
            format!("http://{}/leaderboard", addr),
            format!("http://{}/blocks", addr),
        );

        let err = run_pass(&state, MinerType::ProofOfWork).await.unwrap_err();
        let detail = err.detail();
        assert_eq!(detail["kind"], "http");
        assert_eq!(detail["status"], 503);
        assert_eq!(detail["body_prefix"], "down");
        assert!(err.url().ends_with("/blocks"));
    }

    #[tokio::test]
    async fn upstream_503_is_reported_as_bad_gateway() {
        let app = Router::new().route(
            "/leaderboard",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance window") }),
        );
        let addr = serve(app).await;
        let url = format!("http://{}/leaderboard", addr);
        let state = Arc::new(state_for(url.clone(), format!("http://{}/blocks", addr)));

        let response = get_dashboard(
            State(state),
            Query(DashboardQuery {
                miner_type: Some(MinerType::ProofOfWork),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_json(response).await;
        assert_eq!(body["url"], url.as_str());
        assert_eq!(body["detail"]["kind"], "http");
        assert_eq!(body["detail"]["status"], 503);
        assert_eq!(body["detail"]["body_prefix"], "maintenance window");
        assert!(body["error"].as_str().unwrap().contains("HTTP status 503"));
    }

    #[tokio::test]
    async fn sources_mark_configured_default() {
        let state = Arc::new(state_for(
            "http://unused/leaderboard".to_string(),
            "http://unused/blocks".to_string(),
        ));
        let Json(sources) = get_sources(State(state)).await;
        assert_eq!(sources.len(), 2);
        assert!(sources[0].default);
        assert_eq!(sources[1].label, "Proof of Work");
    }
}
