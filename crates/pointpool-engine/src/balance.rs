use crate::store::CampaignStore;
use pointpool_types::{Amount, CampaignError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Owns the additive balance update. Grants to the same user serialize on a
/// per-user mutex so the read-modify-write cannot lose an update; grants to
/// different users do not contend.
///
/// The lock registry only grows: entries are never evicted, so its size is
/// bounded by the number of campaign participants (users are never deleted).
pub struct BalanceService {
    store: Arc<dyn CampaignStore>,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl BalanceService {
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self {
            store,
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Atomically add `amount` to the user's balance. Returns the balance
    /// before and after the grant so callers can write accurate ledger
    /// snapshots. Fails with `InvalidAmount` for a zero amount and
    /// `UserNotFound` if the row does not exist.
    pub async fn grant(&self, user_id: &str, amount: Amount) -> Result<(Amount, Amount)> {
        if amount.is_zero() {
            return Err(CampaignError::InvalidAmount(
                "grant amount must be greater than 0".to_string(),
            ));
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| CampaignError::UserNotFound(user_id.to_string()))?;

        let origin = user.points;
        let updated = origin.checked_add(amount).ok_or_else(|| {
            CampaignError::InvalidAmount(format!("balance overflow for {}", user_id))
        })?;

        self.store.set_user_points(user_id, updated).await?;

        info!(
            user_id = %user_id,
            amount = amount.to_value(),
            balance_before = origin.to_value(),
            balance_after = updated.to_value(),
            "Balance credited"
        );
        Ok((origin, updated))
    }

    pub async fn balance_of(&self, user_id: &str) -> Result<Amount> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| CampaignError::UserNotFound(user_id.to_string()))?;
        Ok(user.points)
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(user_id) {
                return lock.clone();
            }
        }

        let mut locks = self.locks.write().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
