pub mod amount;
pub mod error;
pub mod reward;
pub mod task;
pub mod user;

pub use amount::{Amount, POINT_BASE_UNIT, POINT_DECIMALS};
pub use error::{CampaignError, Result};
pub use reward::{NewRewardRecord, RewardFilter, RewardRecord};
pub use task::{NewTask, Task, TaskFilter, TaskStatus, TaskType};
pub use user::User;
