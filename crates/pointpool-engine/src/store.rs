use async_trait::async_trait;
use chrono::Utc;
use pointpool_types::{
    Amount, CampaignError, NewRewardRecord, NewTask, Result, RewardFilter, RewardRecord, Task,
    TaskFilter, TaskStatus, TaskType, User,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persistence seam for the campaign engine. Implementations are expected
/// to make `try_insert_onboarding_task` an atomic check-and-insert: at most
/// one onboarding task may ever exist per user, and a losing concurrent
/// insert observes `None` rather than an error.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Insert a zero-point user row. Racing a concurrent insert for the
    /// same id is benign: the existing row is returned unchanged.
    async fn insert_user(&self, user_id: &str) -> Result<User>;

    /// Overwrite a user's point balance. Callers serialize this with the
    /// preceding read; the store only guarantees the row exists.
    async fn set_user_points(&self, user_id: &str, points: Amount) -> Result<()>;

    async fn insert_task(&self, task: NewTask) -> Result<Task>;

    /// Atomic uniqueness guard for the onboarding bonus: inserts a pending
    /// onboarding task unless the user already has one (any status), in
    /// which case `None` is returned and nothing is written.
    async fn try_insert_onboarding_task(
        &self,
        user_id: &str,
        swap_amount: Amount,
    ) -> Result<Option<Task>>;

    async fn get_task(&self, task_id: i64) -> Result<Option<Task>>;
    async fn update_task(&self, task: &Task) -> Result<()>;
    async fn search_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    async fn insert_reward_record(&self, record: NewRewardRecord) -> Result<RewardRecord>;
    async fn search_reward_records(&self, filter: &RewardFilter) -> Result<Vec<RewardRecord>>;
}

/// In-memory store used by tests and as the default node backend.
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    tasks: Arc<RwLock<TaskTable>>,
    rewards: Arc<RwLock<RewardTable>>,
}

#[derive(Default)]
struct TaskTable {
    next_id: i64,
    rows: Vec<Task>,
}

#[derive(Default)]
struct RewardTable {
    next_id: i64,
    rows: Vec<RewardRecord>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            tasks: Arc::new(RwLock::new(TaskTable::default())),
            rewards: Arc::new(RwLock::new(RewardTable::default())),
        }
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn insert_user(&self, user_id: &str) -> Result<User> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.get(user_id) {
            debug!(user_id = %user_id, "User already exists, insert is a no-op");
            return Ok(existing.clone());
        }

        let user = User::new(user_id);
        users.insert(user_id.to_string(), user.clone());
        info!(user_id = %user_id, "New campaign participant stored");
        Ok(user)
    }

    async fn set_user_points(&self, user_id: &str, points: Amount) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| CampaignError::UserNotFound(user_id.to_string()))?;

        let before = user.points;
        user.points = points;

        info!(
            user_id = %user_id,
            points_before = before.to_value(),
            points_after = points.to_value(),
            "Balance stored"
        );
        Ok(())
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        tasks.next_id += 1;

        let row = Task {
            id: tasks.next_id,
            user_id: task.user_id,
            kind: task.kind,
            status: TaskStatus::Pending,
            swap_amount: task.swap_amount,
            created_at: task.created_at,
            completed_at: None,
        };
        tasks.rows.push(row.clone());

        debug!(
            task_id = row.id,
            user_id = %row.user_id,
            kind = ?row.kind,
            swap_amount = row.swap_amount.to_value(),
            "Task stored"
        );
        Ok(row)
    }

    async fn try_insert_onboarding_task(
        &self,
        user_id: &str,
        swap_amount: Amount,
    ) -> Result<Option<Task>> {
        // Check and insert under one write lock so two racing onboarding
        // attempts cannot both succeed.
        let mut tasks = self.tasks.write().await;
        let already_exists = tasks
            .rows
            .iter()
            .any(|t| t.user_id == user_id && t.kind == TaskType::Onboarding);

        if already_exists {
            debug!(user_id = %user_id, "Onboarding task already exists, skipping insert");
            return Ok(None);
        }

        tasks.next_id += 1;
        let row = Task {
            id: tasks.next_id,
            user_id: user_id.to_string(),
            kind: TaskType::Onboarding,
            status: TaskStatus::Pending,
            swap_amount,
            created_at: Utc::now(),
            completed_at: None,
        };
        tasks.rows.push(row.clone());

        info!(
            task_id = row.id,
            user_id = %user_id,
            swap_amount = swap_amount.to_value(),
            "Onboarding task stored"
        );
        Ok(Some(row))
    }

    async fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.rows.iter().find(|t| t.id == task_id).cloned())
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let row = tasks
            .rows
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or(CampaignError::TaskNotFound(task.id))?;

        row.status = task.status;
        row.completed_at = task.completed_at;
        Ok(())
    }

    async fn search_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .rows
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn insert_reward_record(&self, record: NewRewardRecord) -> Result<RewardRecord> {
        let mut rewards = self.rewards.write().await;
        rewards.next_id += 1;

        let row = RewardRecord {
            id: rewards.next_id,
            user_id: record.user_id,
            task_id: record.task_id,
            points: record.points,
            origin_points: record.origin_points,
            updated_points: record.updated_points,
            created_at: record.created_at,
        };
        rewards.rows.push(row.clone());

        info!(
            record_id = row.id,
            user_id = %row.user_id,
            task_id = row.task_id,
            points = row.points.to_value(),
            points_before = row.origin_points.to_value(),
            points_after = row.updated_points.to_value(),
            "Reward record stored"
        );
        Ok(row)
    }

    async fn search_reward_records(&self, filter: &RewardFilter) -> Result<Vec<RewardRecord>> {
        let rewards = self.rewards.read().await;
        Ok(rewards
            .rows
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}
