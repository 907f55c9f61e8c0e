use thiserror::Error;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid points: {0}")]
    InvalidPoints(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, CampaignError>;
