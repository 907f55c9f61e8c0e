use crate::balance::BalanceService;
use crate::store::CampaignStore;
use chrono::{DateTime, Duration, Utc};
use pointpool_types::{
    Amount, CampaignError, NewRewardRecord, Result, RewardFilter, RewardRecord,
};
use std::sync::Arc;
use tracing::{error, info};

/// Longest window a reward-history query may span.
pub const MAX_REWARD_HISTORY_DAYS: i64 = 30;

/// The only component allowed to grant points: one balance mutation plus
/// one ledger write per grant.
pub struct RewardService {
    store: Arc<dyn CampaignStore>,
    balances: Arc<BalanceService>,
}

impl RewardService {
    pub fn new(store: Arc<dyn CampaignStore>, balances: Arc<BalanceService>) -> Self {
        Self { store, balances }
    }

    /// Grant `points` to the user against `task_id` and append the audit
    /// record. If the ledger write fails after the balance mutation has
    /// committed, the mutation is NOT rolled back; the error is surfaced
    /// and the ledger must be reconciled out-of-band.
    pub async fn reward_user(&self, user_id: &str, task_id: i64, points: Amount) -> Result<()> {
        if points.is_zero() {
            return Err(CampaignError::InvalidPoints(
                "points should be greater than 0".to_string(),
            ));
        }

        let (origin, updated) = self.balances.grant(user_id, points).await?;

        let record = NewRewardRecord {
            user_id: user_id.to_string(),
            task_id,
            points,
            origin_points: origin,
            updated_points: updated,
            created_at: Utc::now(),
        };

        match self.store.insert_reward_record(record).await {
            Ok(record) => {
                info!(
                    user_id = %user_id,
                    task_id = task_id,
                    record_id = record.id,
                    points = points.to_value(),
                    "Reward granted"
                );
                Ok(())
            }
            Err(e) => {
                // Balance already moved; only the audit trail is missing.
                error!(
                    user_id = %user_id,
                    task_id = task_id,
                    points = points.to_value(),
                    error = %e,
                    "Ledger write failed after balance mutation, reconciliation required"
                );
                Err(e)
            }
        }
    }

    /// Reward history for a user over `[start, start + days)`. The span is
    /// capped at 30 days; a window starting in the future is an empty
    /// result, not an error.
    pub async fn reward_history(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        days: i64,
    ) -> Result<Vec<RewardRecord>> {
        if days <= 0 {
            return Err(CampaignError::InvalidRange(
                "duration should be greater than 0".to_string(),
            ));
        }
        if days > MAX_REWARD_HISTORY_DAYS {
            return Err(CampaignError::InvalidRange(format!(
                "duration should be at most {} days",
                MAX_REWARD_HISTORY_DAYS
            )));
        }
        if start > Utc::now() {
            return Ok(Vec::new());
        }

        self.store
            .search_reward_records(&RewardFilter {
                user_id: Some(user_id.to_string()),
                window: Some((start, start + Duration::days(days))),
                ..Default::default()
            })
            .await
    }

    /// The grant recorded against one task, if any.
    pub async fn reward_for_task(&self, task_id: i64) -> Result<Option<RewardRecord>> {
        let records = self
            .store
            .search_reward_records(&RewardFilter {
                task_id: Some(task_id),
                ..Default::default()
            })
            .await?;
        Ok(records.into_iter().next())
    }
}
