use crate::rewards::RewardService;
use crate::store::CampaignStore;
use crate::tasks::TaskService;
use chrono::{DateTime, Utc};
use pointpool_types::{
    Amount, CampaignError, Result, Task, TaskFilter, TaskStatus, TaskType,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Campaign policy constants. Defaults match the production campaign:
/// swaps of at least 1000 units qualify for a one-time 100 point bonus,
/// and 10000 points are split per epoch among onboarded contributors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignParams {
    pub onboarding_threshold: Amount,
    pub onboarding_reward: Amount,
    pub pool_reward: Amount,
}

impl Default for CampaignParams {
    fn default() -> Self {
        Self {
            onboarding_threshold: Amount::from_value(1000.0),
            onboarding_reward: Amount::from_value(100.0),
            pool_reward: Amount::from_value(10000.0),
        }
    }
}

/// Orchestrates the two campaign programs over the task and reward
/// services. One entry point per trigger: `process_swap` for normalized
/// swap events, `settle_epoch` for the weekly shared-pool distribution.
pub struct CampaignEngine {
    store: Arc<dyn CampaignStore>,
    tasks: Arc<TaskService>,
    rewards: Arc<RewardService>,
    params: CampaignParams,
}

impl CampaignEngine {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        tasks: Arc<TaskService>,
        rewards: Arc<RewardService>,
        params: CampaignParams,
    ) -> Self {
        Self {
            store,
            tasks,
            rewards,
            params,
        }
    }

    pub fn params(&self) -> &CampaignParams {
        &self.params
    }

    /// Handle one normalized swap event. Creates the user row on first
    /// contact, runs onboarding qualification, and always records a
    /// pending shared-pool contribution. Safe under at-least-once
    /// delivery: the onboarding bonus is guarded by the store's
    /// uniqueness constraint.
    pub async fn process_swap(&self, sender_id: &str, swap_amount: Amount) -> Result<()> {
        if swap_amount.is_zero() {
            return Err(CampaignError::InvalidAmount(
                "swap amount must be greater than 0".to_string(),
            ));
        }

        self.store.insert_user(sender_id).await?;

        if !self.tasks.has_completed_onboarding(sender_id).await {
            self.process_onboarding(sender_id, swap_amount).await?;
        }

        // Every swap contributes to the shared pool, onboarded or not;
        // the reward decision is deferred to epoch settlement.
        self.tasks
            .create_task(sender_id, TaskType::SharedPool, swap_amount)
            .await?;

        info!(
            sender_id = %sender_id,
            swap_amount = swap_amount.to_value(),
            "Swap added to shared pool"
        );
        Ok(())
    }

    /// Settle one campaign week: split `pool_reward` among the pending
    /// shared-pool contributions of onboarded users, proportionally to
    /// swap volume, and mark those tasks done. Contributions of users who
    /// never onboarded are left pending and unrewarded. Best-effort: a
    /// failing grant is logged and skipped, not retried, and does not
    /// abort the rest of the batch. Returns the number of settled tasks.
    pub async fn settle_epoch(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<usize> {
        if from >= to {
            return Err(CampaignError::InvalidRange(
                "epoch start must be before epoch end".to_string(),
            ));
        }

        let candidates = self
            .tasks
            .search_tasks(&TaskFilter {
                kind: Some(TaskType::SharedPool),
                status: Some(TaskStatus::Pending),
                window: Some((from, to)),
                ..Default::default()
            })
            .await?;

        let mut qualifying: Vec<Task> = Vec::new();
        for task in candidates {
            if self.tasks.has_completed_onboarding(&task.user_id).await {
                qualifying.push(task);
            } else {
                debug!(
                    task_id = task.id,
                    user_id = %task.user_id,
                    "Contribution excluded: user not onboarded"
                );
            }
        }

        let total: Amount = qualifying.iter().map(|t| t.swap_amount).sum();
        if qualifying.is_empty() || total.is_zero() {
            info!(
                epoch_start = %from,
                epoch_end = %to,
                "No qualifying shared-pool contributions, settlement is a no-op"
            );
            return Ok(0);
        }

        info!(
            epoch_start = %from,
            epoch_end = %to,
            task_count = qualifying.len(),
            total_swap_amount = total.to_value(),
            pool_reward = self.params.pool_reward.to_value(),
            "Settling shared-pool epoch"
        );

        let mut settled = 0;
        for task in &qualifying {
            let share = task
                .swap_amount
                .proportional_share(self.params.pool_reward, total)
                .unwrap_or(Amount::ZERO);

            if !share.is_zero() {
                if let Err(e) = self.rewards.reward_user(&task.user_id, task.id, share).await {
                    warn!(
                        task_id = task.id,
                        user_id = %task.user_id,
                        share = share.to_value(),
                        error = %e,
                        "Shared-pool grant failed, continuing with remaining tasks"
                    );
                    continue;
                }
            }

            if let Err(e) = self.tasks.complete_task(task.id).await {
                warn!(task_id = task.id, error = %e, "Failed to mark settled task done");
                continue;
            }
            settled += 1;
        }

        info!(
            epoch_start = %from,
            epoch_end = %to,
            settled = settled,
            "Epoch settlement finished"
        );
        Ok(settled)
    }

    /// Onboarding qualification for one swap. Below the threshold nothing
    /// happens; at or above it the bonus is granted exactly once, guarded
    /// by the atomic onboarding-task insert. A failure between grant and
    /// completion leaves a pending onboarding task, which still blocks a
    /// second bonus and is surfaced for reconciliation.
    async fn process_onboarding(&self, user_id: &str, swap_amount: Amount) -> Result<()> {
        if swap_amount < self.params.onboarding_threshold {
            debug!(
                user_id = %user_id,
                swap_amount = swap_amount.to_value(),
                threshold = self.params.onboarding_threshold.to_value(),
                "Swap below onboarding threshold"
            );
            return Ok(());
        }

        let task = match self
            .tasks
            .try_create_onboarding_task(user_id, swap_amount)
            .await?
        {
            Some(task) => task,
            // Lost a race with a concurrent event; the winner grants the bonus.
            None => {
                debug!(user_id = %user_id, "Onboarding already claimed by a concurrent event");
                return Ok(());
            }
        };

        self.rewards
            .reward_user(user_id, task.id, self.params.onboarding_reward)
            .await?;
        self.tasks.complete_task(task.id).await?;

        info!(
            user_id = %user_id,
            task_id = task.id,
            reward = self.params.onboarding_reward.to_value(),
            "Onboarding bonus granted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::BalanceService;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use pointpool_types::RewardFilter;

    struct Fixture {
        store: Arc<MemoryStore>,
        tasks: Arc<TaskService>,
        engine: CampaignEngine,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let balances = Arc::new(BalanceService::new(store.clone()));
        let tasks = Arc::new(TaskService::new(store.clone()));
        let rewards = Arc::new(RewardService::new(store.clone(), balances));
        let engine = CampaignEngine::new(
            store.clone(),
            tasks.clone(),
            rewards,
            CampaignParams::default(),
        );
        Fixture {
            store,
            tasks,
            engine,
        }
    }

    fn week() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now - Duration::days(3), now + Duration::days(4))
    }

    async fn points_of(store: &MemoryStore, user_id: &str) -> Amount {
        store.get_user(user_id).await.unwrap().unwrap().points
    }

    #[tokio::test]
    async fn test_first_qualifying_swap_onboards_once() {
        let f = fixture();

        f.engine
            .process_swap("0xu1", Amount::from_value(1000.0))
            .await
            .unwrap();

        // One completed onboarding task, one pending shared-pool task
        let tasks = f.tasks.tasks_of_user("0xu1").await.unwrap();
        let onboarding: Vec<_> = tasks
            .iter()
            .filter(|t| t.kind == TaskType::Onboarding)
            .collect();
        assert_eq!(onboarding.len(), 1);
        assert_eq!(onboarding[0].status, TaskStatus::Done);
        assert_eq!(
            tasks
                .iter()
                .filter(|t| t.kind == TaskType::SharedPool
                    && t.status == TaskStatus::Pending)
                .count(),
            1
        );

        assert_eq!(points_of(&f.store, "0xu1").await, Amount::from_value(100.0));

        let records = f
            .store
            .search_reward_records(&RewardFilter {
                user_id: Some("0xu1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].origin_points, Amount::ZERO);
        assert_eq!(records[0].updated_points, Amount::from_value(100.0));

        // A second swap of any size must not grant a second bonus
        f.engine
            .process_swap("0xu1", Amount::from_value(50000.0))
            .await
            .unwrap();
        assert_eq!(points_of(&f.store, "0xu1").await, Amount::from_value(100.0));

        let tasks = f.tasks.tasks_of_user("0xu1").await.unwrap();
        assert_eq!(
            tasks
                .iter()
                .filter(|t| t.kind == TaskType::Onboarding)
                .count(),
            1
        );
        assert_eq!(
            tasks
                .iter()
                .filter(|t| t.kind == TaskType::SharedPool)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_swap_below_threshold_skips_onboarding() {
        let f = fixture();

        f.engine
            .process_swap("0xu1", Amount::from_value(999.0))
            .await
            .unwrap();

        let tasks = f.tasks.tasks_of_user("0xu1").await.unwrap();
        assert!(tasks.iter().all(|t| t.kind == TaskType::SharedPool));
        assert_eq!(tasks.len(), 1);
        assert_eq!(points_of(&f.store, "0xu1").await, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_zero_swap_rejected() {
        let f = fixture();
        let err = f
            .engine
            .process_swap("0xu1", Amount::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_events_grant_one_bonus() {
        let f = fixture();
        let engine = Arc::new(f.engine);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.process_swap("0xu1", Amount::from_value(2000.0)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(points_of(&f.store, "0xu1").await, Amount::from_value(100.0));
        let onboarding = f
            .tasks
            .search_tasks(&TaskFilter {
                user_id: Some("0xu1".to_string()),
                kind: Some(TaskType::Onboarding),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(onboarding.len(), 1);
    }

    #[tokio::test]
    async fn test_settlement_splits_pool_proportionally() {
        let f = fixture();
        let (from, to) = week();

        // Two onboarded users with contributions 10, 10 and 20
        f.engine
            .process_swap("0xu1", Amount::from_value(1000.0))
            .await
            .unwrap();
        f.engine
            .process_swap("0xu2", Amount::from_value(1000.0))
            .await
            .unwrap();

        let u1_onboarded = points_of(&f.store, "0xu1").await;
        let u2_onboarded = points_of(&f.store, "0xu2").await;

        f.engine
            .process_swap("0xu1", Amount::from_value(10.0))
            .await
            .unwrap();
        f.engine
            .process_swap("0xu1", Amount::from_value(10.0))
            .await
            .unwrap();
        f.engine
            .process_swap("0xu2", Amount::from_value(20.0))
            .await
            .unwrap();

        let settled = f.engine.settle_epoch(from, to).await.unwrap();
        // The two 1000-unit qualifying swaps are also pending shared-pool
        // contributions in this window, so five tasks settle in total.
        assert_eq!(settled, 5);

        // Pool splits over total volume 2040; each task's share floors
        // individually, so expectations sum per task.
        let pool = Amount::from_value(10000.0);
        let total = Amount::from_value(2040.0);
        let share = |v: f64| {
            Amount::from_value(v)
                .proportional_share(pool, total)
                .unwrap()
        };
        let expected_u1 = u1_onboarded
            .saturating_add(share(1000.0))
            .saturating_add(share(10.0))
            .saturating_add(share(10.0));
        assert_eq!(points_of(&f.store, "0xu1").await, expected_u1);

        let expected_u2 = u2_onboarded
            .saturating_add(share(1000.0))
            .saturating_add(share(20.0));
        assert_eq!(points_of(&f.store, "0xu2").await, expected_u2);

        // Nothing left pending
        let pending = f
            .tasks
            .search_tasks(&TaskFilter {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_settlement_exact_split_for_equal_weights() {
        let f = fixture();
        let (from, to) = week();

        // Onboard both users and settle their qualifying swaps away first,
        // so only the three small contributions are pending afterwards.
        f.engine
            .process_swap("0xu1", Amount::from_value(1000.0))
            .await
            .unwrap();
        f.engine
            .process_swap("0xu2", Amount::from_value(1000.0))
            .await
            .unwrap();
        f.engine.settle_epoch(from, to).await.unwrap();

        let base_u1 = points_of(&f.store, "0xu1").await;
        let base_u2 = points_of(&f.store, "0xu2").await;

        f.engine
            .process_swap("0xu1", Amount::from_value(10.0))
            .await
            .unwrap();
        f.engine
            .process_swap("0xu1", Amount::from_value(10.0))
            .await
            .unwrap();
        f.engine
            .process_swap("0xu2", Amount::from_value(20.0))
            .await
            .unwrap();

        let settled = f.engine.settle_epoch(from, to).await.unwrap();
        assert_eq!(settled, 3);

        // 10000 * 10/40 = 2500 twice, 10000 * 20/40 = 5000
        assert_eq!(
            points_of(&f.store, "0xu1").await,
            base_u1.saturating_add(Amount::from_value(5000.0))
        );
        assert_eq!(
            points_of(&f.store, "0xu2").await,
            base_u2.saturating_add(Amount::from_value(5000.0))
        );
    }

    #[tokio::test]
    async fn test_settlement_excludes_non_onboarded_users() {
        let f = fixture();
        let (from, to) = week();

        f.engine
            .process_swap("0xonboarded", Amount::from_value(1000.0))
            .await
            .unwrap();
        f.engine
            .process_swap("0xvisitor", Amount::from_value(500.0))
            .await
            .unwrap();

        let visitor_before = points_of(&f.store, "0xvisitor").await;
        f.engine.settle_epoch(from, to).await.unwrap();

        // The visitor's contribution stays pending and unrewarded
        assert_eq!(points_of(&f.store, "0xvisitor").await, visitor_before);
        let visitor_tasks = f.tasks.tasks_of_user("0xvisitor").await.unwrap();
        assert_eq!(visitor_tasks.len(), 1);
        assert_eq!(visitor_tasks[0].status, TaskStatus::Pending);

        // The onboarded user's contribution is rewarded with the whole pool
        let onboarded_tasks = f.tasks.tasks_of_user("0xonboarded").await.unwrap();
        assert!(onboarded_tasks
            .iter()
            .all(|t| t.status == TaskStatus::Done));
        assert_eq!(
            points_of(&f.store, "0xonboarded").await,
            Amount::from_value(100.0).saturating_add(Amount::from_value(10000.0))
        );
    }

    #[tokio::test]
    async fn test_settlement_with_no_contributions_is_noop() {
        let f = fixture();
        let (from, to) = week();

        let settled = f.engine.settle_epoch(from, to).await.unwrap();
        assert_eq!(settled, 0);
    }

    #[tokio::test]
    async fn test_settlement_ignores_tasks_outside_window() {
        let f = fixture();

        f.engine
            .process_swap("0xu1", Amount::from_value(1000.0))
            .await
            .unwrap();

        let now = Utc::now();
        let settled = f
            .engine
            .settle_epoch(now + Duration::days(1), now + Duration::days(8))
            .await
            .unwrap();
        assert_eq!(settled, 0);

        let pending = f
            .tasks
            .search_tasks(&TaskFilter {
                kind: Some(TaskType::SharedPool),
                status: Some(TaskStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_settlement_is_safe_to_rerun() {
        let f = fixture();
        let (from, to) = week();

        f.engine
            .process_swap("0xu1", Amount::from_value(1000.0))
            .await
            .unwrap();

        let first = f.engine.settle_epoch(from, to).await.unwrap();
        assert_eq!(first, 1);
        let after_first = points_of(&f.store, "0xu1").await;

        // At-least-once delivery of the epoch trigger: the rerun finds no
        // pending tasks and grants nothing.
        let second = f.engine.settle_epoch(from, to).await.unwrap();
        assert_eq!(second, 0);
        assert_eq!(points_of(&f.store, "0xu1").await, after_first);
    }

    #[tokio::test]
    async fn test_settlement_continues_past_failing_grant() {
        let store = Arc::new(crate::store::test_support::FaultyLedgerStore::new());
        let balances = Arc::new(BalanceService::new(store.clone()));
        let tasks = Arc::new(TaskService::new(store.clone()));
        let rewards = Arc::new(RewardService::new(store.clone(), balances.clone()));
        let engine = CampaignEngine::new(
            store.clone(),
            tasks.clone(),
            rewards.clone(),
            CampaignParams::default(),
        );
        let (from, to) = week();

        for user in ["0xu1", "0xu2", "0xu3"] {
            engine
                .process_swap(user, Amount::from_value(1000.0))
                .await
                .unwrap();
        }

        // From here on every ledger write for u2 fails
        store.fail_ledger_for("0xu2").await;

        let settled = engine.settle_epoch(from, to).await.unwrap();
        assert_eq!(settled, 2);

        // u2's grant failed, so their task stays pending; the other two
        // still settled.
        for (user, expected) in [
            ("0xu1", TaskStatus::Done),
            ("0xu2", TaskStatus::Pending),
            ("0xu3", TaskStatus::Done),
        ] {
            let user_tasks = tasks
                .search_tasks(&TaskFilter {
                    user_id: Some(user.to_string()),
                    kind: Some(TaskType::SharedPool),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(user_tasks.len(), 1);
            assert_eq!(user_tasks[0].status, expected, "user {}", user);
        }

        // Balances moved before the ledger write, so all three carry the
        // onboarding bonus plus an equal pool share; only u2 is missing
        // the audit record and needs reconciliation.
        let share = Amount::from_value(1000.0)
            .proportional_share(Amount::from_value(10000.0), Amount::from_value(3000.0))
            .unwrap();
        let expected_balance = Amount::from_value(100.0).saturating_add(share);
        for user in ["0xu1", "0xu2", "0xu3"] {
            assert_eq!(
                balances.balance_of(user).await.unwrap(),
                expected_balance,
                "user {}",
                user
            );
        }

        let u2_task = tasks
            .search_tasks(&TaskFilter {
                user_id: Some("0xu2".to_string()),
                kind: Some(TaskType::SharedPool),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(rewards
            .reward_for_task(u2_task[0].id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_settlement_rejects_inverted_window() {
        let f = fixture();
        let now = Utc::now();
        let err = f.engine.settle_epoch(now, now).await.unwrap_err();
        assert!(matches!(err, CampaignError::InvalidRange(_)));
    }
}
