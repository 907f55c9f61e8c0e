use crate::amount::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Onboarding,
    SharedPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Done,
}

/// One qualifying activity unit. Onboarding tasks are unique per user;
/// shared-pool tasks accumulate one per observed swap. `Done` is terminal
/// and `completed_at` is set exactly when the status is `Done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: String,
    pub kind: TaskType,
    pub status: TaskStatus,
    pub swap_amount: Amount,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

/// Row to insert; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: String,
    pub kind: TaskType,
    pub swap_amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    pub fn new(user_id: impl Into<String>, kind: TaskType, swap_amount: Amount) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            swap_amount,
            created_at: Utc::now(),
        }
    }
}

/// Search condition for task queries. Unset fields match everything; the
/// window, when present, is inclusive of `from` and exclusive of `to`,
/// applied to `created_at`.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub user_id: Option<String>,
    pub kind: Option<TaskType>,
    pub status: Option<TaskStatus>,
    pub window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(user_id) = &self.user_id {
            if &task.user_id != user_id {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if task.kind != kind {
                return false;
            }
        }
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some((from, to)) = self.window {
            if task.created_at < from || task.created_at >= to {
                return false;
            }
        }
        true
    }
}
