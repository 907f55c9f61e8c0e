use crate::store::CampaignStore;
use chrono::{DateTime, Utc};
use pointpool_types::{
    Amount, CampaignError, NewTask, Result, Task, TaskFilter, TaskStatus, TaskType,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Creates tasks, drives the Pending -> Done transition and answers
/// qualification queries. Done is terminal; no task ever reverts.
pub struct TaskService {
    store: Arc<dyn CampaignStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self { store }
    }

    pub async fn create_task(
        &self,
        user_id: &str,
        kind: TaskType,
        swap_amount: Amount,
    ) -> Result<Task> {
        self.store
            .insert_task(NewTask::new(user_id, kind, swap_amount))
            .await
    }

    /// Atomic onboarding insert; `None` means the user already has an
    /// onboarding task and the caller should treat the attempt as a benign
    /// duplicate.
    pub async fn try_create_onboarding_task(
        &self,
        user_id: &str,
        swap_amount: Amount,
    ) -> Result<Option<Task>> {
        self.store
            .try_insert_onboarding_task(user_id, swap_amount)
            .await
    }

    pub async fn complete_task(&self, task_id: i64) -> Result<Task> {
        let mut task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(CampaignError::TaskNotFound(task_id))?;

        task.status = TaskStatus::Done;
        task.completed_at = Some(Utc::now());
        self.store.update_task(&task).await?;

        debug!(task_id = task.id, user_id = %task.user_id, "Task completed");
        Ok(task)
    }

    /// True iff the user has any onboarding task, regardless of status. A
    /// pending task left behind by a partial failure still counts, so the
    /// bonus is never granted twice. Storage failures are reported as
    /// "not onboarded": failing toward no reward, never toward a double one.
    pub async fn has_completed_onboarding(&self, user_id: &str) -> bool {
        let filter = TaskFilter {
            user_id: Some(user_id.to_string()),
            kind: Some(TaskType::Onboarding),
            ..Default::default()
        };

        match self.store.search_tasks(&filter).await {
            Ok(tasks) => !tasks.is_empty(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Onboarding check failed, treating as not onboarded");
                false
            }
        }
    }

    pub async fn tasks_of_user(&self, user_id: &str) -> Result<Vec<Task>> {
        self.store
            .search_tasks(&TaskFilter {
                user_id: Some(user_id.to_string()),
                ..Default::default()
            })
            .await
    }

    /// Tasks created in `[from, to)`.
    pub async fn tasks_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Task>> {
        if from >= to {
            return Err(CampaignError::InvalidRange(
                "window start must be before window end".to_string(),
            ));
        }
        self.store
            .search_tasks(&TaskFilter {
                window: Some((from, to)),
                ..Default::default()
            })
            .await
    }

    pub async fn search_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.store.search_tasks(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> TaskService {
        TaskService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_and_complete_task() {
        let service = service();

        let task = service
            .create_task("0xalice", TaskType::SharedPool, Amount::from_value(10.0))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.completed_at.is_none());

        let done = service.complete_task(task.id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Done);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_complete_unknown_task() {
        let service = service();
        let err = service.complete_task(404).await.unwrap_err();
        assert!(matches!(err, CampaignError::TaskNotFound(404)));
    }

    #[tokio::test]
    async fn test_complete_twice_is_harmless() {
        let service = service();
        let task = service
            .create_task("0xalice", TaskType::SharedPool, Amount::from_value(10.0))
            .await
            .unwrap();

        service.complete_task(task.id).await.unwrap();
        let again = service.complete_task(task.id).await.unwrap();
        assert_eq!(again.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_onboarding_predicate_counts_any_status() {
        let service = service();
        assert!(!service.has_completed_onboarding("0xalice").await);

        // A pending onboarding task counts; completion is not required
        let task = service
            .try_create_onboarding_task("0xalice", Amount::from_value(1500.0))
            .await
            .unwrap()
            .unwrap();
        assert!(service.has_completed_onboarding("0xalice").await);

        service.complete_task(task.id).await.unwrap();
        assert!(service.has_completed_onboarding("0xalice").await);
    }

    #[tokio::test]
    async fn test_shared_pool_tasks_do_not_count_as_onboarding() {
        let service = service();
        service
            .create_task("0xalice", TaskType::SharedPool, Amount::from_value(5000.0))
            .await
            .unwrap();
        assert!(!service.has_completed_onboarding("0xalice").await);
    }

    #[tokio::test]
    async fn test_window_rejects_inverted_range() {
        let service = service();
        let now = Utc::now();
        let err = service
            .tasks_in_window(now, now)
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::InvalidRange(_)));
    }
}
