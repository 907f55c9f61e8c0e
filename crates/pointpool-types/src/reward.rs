use crate::amount::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only audit entry for a single point grant. Immutable once
/// written; `updated_points - origin_points == points` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub id: i64,
    pub user_id: String,
    pub task_id: i64,
    pub points: Amount,
    pub origin_points: Amount,
    pub updated_points: Amount,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRewardRecord {
    pub user_id: String,
    pub task_id: i64,
    pub points: Amount,
    pub origin_points: Amount,
    pub updated_points: Amount,
    pub created_at: DateTime<Utc>,
}

/// Search condition for ledger queries; the window is `[from, to)` on
/// `created_at`, matching task queries.
#[derive(Debug, Clone, Default)]
pub struct RewardFilter {
    pub user_id: Option<String>,
    pub task_id: Option<i64>,
    pub window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl RewardFilter {
    pub fn matches(&self, record: &RewardRecord) -> bool {
        if let Some(user_id) = &self.user_id {
            if &record.user_id != user_id {
                return false;
            }
        }
        if let Some(task_id) = self.task_id {
            if record.task_id != task_id {
                return false;
            }
        }
        if let Some((from, to)) = self.window {
            if record.created_at < from || record.created_at >= to {
                return false;
            }
        }
        true
    }
}
