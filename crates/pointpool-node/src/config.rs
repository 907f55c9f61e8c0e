use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pointpool_engine::CampaignParams;
use pointpool_types::Amount;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node: NodeSettings,
    pub campaign: CampaignConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Start of the first campaign week, RFC 3339.
    pub start_time: DateTime<Utc>,
    pub weeks: u32,
    pub onboarding_threshold: f64,
    pub onboarding_reward: f64,
    pub pool_reward: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node: NodeSettings {
                name: "pointpool-node".to_string(),
            },
            campaign: CampaignConfig {
                start_time: Utc::now(),
                weeks: 4,
                onboarding_threshold: 1000.0,
                onboarding_reward: 100.0,
                pool_reward: 10000.0,
            },
            api: ApiConfig {
                enabled: true,
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self =
            toml::from_str(&content).context("Failed to parse config file")?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(name) = env::var("NODE_ID") {
            if !name.is_empty() {
                self.node.name = name;
            }
        }
        if let Ok(api_host) = env::var("API_HOST") {
            self.api.host = api_host;
        }
        if let Ok(api_port) = env::var("API_PORT") {
            if let Ok(port) = api_port.parse() {
                self.api.port = port;
            }
        }
        if let Ok(start) = env::var("CAMPAIGN_START") {
            if let Ok(ts) = start.parse::<DateTime<Utc>>() {
                self.campaign.start_time = ts;
            }
        }
        if let Ok(weeks) = env::var("CAMPAIGN_WEEKS") {
            if let Ok(weeks) = weeks.parse() {
                self.campaign.weeks = weeks;
            }
        }
    }

    pub fn campaign_params(&self) -> CampaignParams {
        CampaignParams {
            onboarding_threshold: Amount::from_value(self.campaign.onboarding_threshold),
            onboarding_reward: Amount::from_value(self.campaign.onboarding_reward),
            pool_reward: Amount::from_value(self.campaign.pool_reward),
        }
    }
}
