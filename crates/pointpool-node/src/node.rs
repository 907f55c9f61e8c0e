use crate::config::NodeConfig;
use pointpool_engine::{MemoryStore, PointsEngine};
use std::sync::Arc;
use tracing::info;

/// Process-level wiring: one engine over one store, built from config at
/// startup and shared by the API server and the epoch scheduler.
#[derive(Clone)]
pub struct CampaignNode {
    pub config: NodeConfig,
    pub engine: Arc<PointsEngine>,
}

impl CampaignNode {
    pub fn new(config: NodeConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(PointsEngine::new(store, config.campaign_params()));

        info!(
            node_name = %config.node.name,
            campaign_start = %config.campaign.start_time,
            campaign_weeks = config.campaign.weeks,
            "Campaign node wired"
        );
        Self { config, engine }
    }
}
