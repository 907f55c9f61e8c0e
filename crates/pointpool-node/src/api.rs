use crate::node::CampaignNode;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use pointpool_types::{Amount, CampaignError, RewardRecord, Task, TaskFilter, TaskStatus, TaskType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Clone)]
struct AppState {
    node: CampaignNode,
}

#[derive(Serialize, Deserialize)]
struct SubmitSwapRequest {
    sender_id: String,
    swap_amount: f64,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct TasksQuery {
    user_id: Option<String>,
    kind: Option<TaskType>,
    status: Option<TaskStatus>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RewardsQuery {
    start: DateTime<Utc>,
    days: i64,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn start_api_server(node: CampaignNode, host: String, port: u16) -> JoinHandle<()> {
    let state = AppState { node };

    let app = Router::new()
        .route("/health", get(health))
        .route("/v1/swaps", post(submit_swap))
        .route("/v1/tasks", get(search_tasks))
        .route("/v1/users/:id/tasks", get(user_tasks))
        .route("/v1/users/:id/rewards", get(user_rewards))
        .with_state(Arc::new(state));

    let addr = format!("{}:{}", host, port);
    info!("Starting API server on {}", addr);

    tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind API server");
        axum::serve(listener, app)
            .await
            .expect("API server failed");
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn submit_swap(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitSwapRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .node
        .engine
        .campaign
        .process_swap(&req.sender_id, Amount::from_value(req.swap_amount))
        .await
        .map_err(into_api_error)?;

    Ok(Json(serde_json::json!({ "accepted": true })))
}

async fn search_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TasksQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let window = match (query.from, query.to) {
        (Some(from), Some(to)) => Some((from, to)),
        (None, None) => None,
        _ => {
            return Err(into_api_error(CampaignError::InvalidRange(
                "both from and to must be provided".to_string(),
            )))
        }
    };

    let tasks = state
        .node
        .engine
        .tasks
        .search_tasks(&TaskFilter {
            user_id: query.user_id,
            kind: query.kind,
            status: query.status,
            window,
        })
        .await
        .map_err(into_api_error)?;
    Ok(Json(tasks))
}

async fn user_tasks(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state
        .node
        .engine
        .tasks
        .tasks_of_user(&user_id)
        .await
        .map_err(into_api_error)?;
    Ok(Json(tasks))
}

async fn user_rewards(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<RewardsQuery>,
) -> Result<Json<Vec<RewardRecord>>, ApiError> {
    let records = state
        .node
        .engine
        .rewards
        .reward_history(&user_id, query.start, query.days)
        .await
        .map_err(into_api_error)?;
    Ok(Json(records))
}

fn into_api_error(err: CampaignError) -> ApiError {
    let status = match &err {
        CampaignError::InvalidAmount(_)
        | CampaignError::InvalidPoints(_)
        | CampaignError::InvalidRange(_) => StatusCode::BAD_REQUEST,
        CampaignError::UserNotFound(_) | CampaignError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        CampaignError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
