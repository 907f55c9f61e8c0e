pub mod balance;
pub mod campaign;
pub mod rewards;
pub mod store;
pub mod tasks;

pub use balance::BalanceService;
pub use campaign::{CampaignEngine, CampaignParams};
pub use rewards::{RewardService, MAX_REWARD_HISTORY_DAYS};
pub use store::{CampaignStore, MemoryStore};
pub use tasks::TaskService;

use std::sync::Arc;

/// The wired engine: the four services composed over one shared store.
/// Constructed once at process start and handed around by `Arc`; there is
/// no ambient global state.
pub struct PointsEngine {
    pub balances: Arc<BalanceService>,
    pub tasks: Arc<TaskService>,
    pub rewards: Arc<RewardService>,
    pub campaign: Arc<CampaignEngine>,
}

impl PointsEngine {
    pub fn new(store: Arc<dyn CampaignStore>, params: CampaignParams) -> Self {
        let balances = Arc::new(BalanceService::new(store.clone()));
        let tasks = Arc::new(TaskService::new(store.clone()));
        let rewards = Arc::new(RewardService::new(store.clone(), balances.clone()));
        let campaign = Arc::new(CampaignEngine::new(
            store,
            tasks.clone(),
            rewards.clone(),
            params,
        ));

        Self {
            balances,
            tasks,
            rewards,
            campaign,
        }
    }

    pub fn in_memory(params: CampaignParams) -> Self {
        Self::new(Arc::new(MemoryStore::new()), params)
    }
}
