use crate::models::MinerType;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_ip: Option<String>,
    pub port: Option<u16>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    /// Off unless explicitly enabled; the known upstreams use self-signed certs.
    pub accept_invalid_certs: bool,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            accept_invalid_certs: false,
        }
    }
}

/// The (leaderboard, blocks) URL pair behind one miner type.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub leaderboard_url: String,
    pub blocks_url: String,
}

impl SourceConfig {
    fn from_base(base: &str) -> Self {
        Self {
            leaderboard_url: format!("{}/leaderboard", base),
            blocks_url: format!("{}/blocks?limit=20", base),
        }
    }

    fn merged(self, file: SourceFile) -> Self {
        Self {
            leaderboard_url: file.leaderboard_url.unwrap_or(self.leaderboard_url),
            blocks_url: file.blocks_url.unwrap_or(self.blocks_url),
        }
    }
}

/// A `[sources.*]` table as written; unset URLs fall back to the built-in pair.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct SourceFile {
    leaderboard_url: Option<String>,
    blocks_url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct SourcesFile {
    tap_to_earn: SourceFile,
    proof_of_work: SourceFile,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(from = "SourcesFile")]
pub struct SourcesConfig {
    pub tap_to_earn: SourceConfig,
    pub proof_of_work: SourceConfig,
}

impl SourcesConfig {
    pub fn get(&self, miner_type: MinerType) -> &SourceConfig {
        match miner_type {
            MinerType::TapToEarn => &self.tap_to_earn,
            MinerType::ProofOfWork => &self.proof_of_work,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            tap_to_earn: SourceConfig::from_base("https://159.89.162.245:8185"),
            proof_of_work: SourceConfig::from_base("https://147.182.214.238:9191"),
        }
    }
}

impl From<SourcesFile> for SourcesConfig {
    fn from(file: SourcesFile) -> Self {
        let defaults = SourcesConfig::default();
        Self {
            tap_to_earn: defaults.tap_to_earn.merged(file.tap_to_earn),
            proof_of_work: defaults.proof_of_work.merged(file.proof_of_work),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub default_miner_type: MinerType,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub sources: SourcesConfig,
    pub dashboard: DashboardConfig,
}

/// Reads `path`, or `config.toml` if it exists. Without either, the
/// compiled-in defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                log::info!("no {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
                return Ok(AppConfig::default());
            }
            default
        }
    };

    let config_str = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    parse_config(&config_str).map_err(|source| ConfigError::Parse { path, source })
}

fn parse_config(config_str: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(config_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_known_upstreams() {
        let config = AppConfig::default();
        assert_eq!(config.fetch.timeout(), Duration::from_secs(15));
        assert!(!config.fetch.accept_invalid_certs);
        assert_eq!(
            config.sources.get(MinerType::TapToEarn).leaderboard_url,
            "https://159.89.162.245:8185/leaderboard"
        );
        assert_eq!(
            config.sources.get(MinerType::ProofOfWork).blocks_url,
            "https://147.182.214.238:9191/blocks?limit=20"
        );
        assert_eq!(config.dashboard.default_miner_type, MinerType::TapToEarn);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = parse_config(
            r#"
            [server]
            port = 8080

            [fetch]
            accept_invalid_certs = true

            [sources.proof_of_work]
            leaderboard_url = "http://localhost:9191/leaderboard?window=all_time&limit=100"

            [dashboard]
            default_miner_type = "proof_of_work"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, Some(8080));
        assert_eq!(config.server.listen_ip, None);
        assert!(config.fetch.accept_invalid_certs);
        assert_eq!(config.fetch.timeout_secs, 15);
        let pow = config.sources.get(MinerType::ProofOfWork);
        assert!(pow.leaderboard_url.ends_with("limit=100"));
        assert_eq!(pow.blocks_url, "https://147.182.214.238:9191/blocks?limit=20");
        assert_eq!(
            config.sources.get(MinerType::TapToEarn).leaderboard_url,
            "https://159.89.162.245:8185/leaderboard"
        );
        assert_eq!(config.dashboard.default_miner_type, MinerType::ProofOfWork);
    }

    #[test]
    fn blocks_url_can_be_overridden_alone() {
        let config = parse_config(
            r#"
            [sources.tap_to_earn]
            blocks_url = "http://localhost:8185/blocks?limit=5"
            "#,
        )
        .unwrap();

        let tap = config.sources.get(MinerType::TapToEarn);
        assert_eq!(tap.leaderboard_url, "https://159.89.162.245:8185/leaderboard");
        assert_eq!(tap.blocks_url, "http://localhost:8185/blocks?limit=5");
    }

    #[test]
    fn unknown_miner_type_is_rejected() {
        assert!(parse_config("[dashboard]\ndefault_miner_type = \"staking\"").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/weso.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
