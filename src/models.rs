use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::metrics::Metric;
use crate::charts::BarChart;
use crate::table::Table;

/// Which miner network the dashboard is showing. Picked per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MinerType {
    #[default]
    TapToEarn,
    ProofOfWork,
}

impl MinerType {
    pub const ALL: [MinerType; 2] = [MinerType::TapToEarn, MinerType::ProofOfWork];

    pub fn label(self) -> &'static str {
        match self {
            MinerType::TapToEarn => "Tap to Earn",
            MinerType::ProofOfWork => "Proof of Work",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Warning,
    Info,
}

/// A non-fatal diagnostic shown next to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("{}", message);
        Notice {
            level: NoticeLevel::Warning,
            message,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        let message = message.into();
        log::info!("{}", message);
        Notice {
            level: NoticeLevel::Info,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SourceEntry {
    pub miner_type: MinerType,
    pub label: &'static str,
    pub default: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardReport {
    pub pass_id: String,
    pub miner_type: MinerType,
    pub title: String,
    pub caption: String,
    pub leaderboard: Table,
    pub metrics: Vec<Metric>,
    pub charts: Vec<BarChart>,
    pub blocks: Table,
    pub notices: Vec<Notice>,
    pub fetched_at: String,
}
