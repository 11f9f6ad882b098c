use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use models::task::{self, Task, TaskChanges, TaskStatus};
use service::pagination::Pagination;

use crate::errors::JsonApiError;
use crate::routes::auth::{CurrentUser, ServerState};

#[derive(Debug, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    pub due_date: Option<ChronoDateTime<Utc>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<ChronoDateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<ChronoDateTime<Utc>>,
    pub created_at: ChronoDateTime<Utc>,
    pub updated_at: ChronoDateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(t: Task) -> Self {
        Self {
            id: t.id.to_hex(),
            title: t.title,
            description: t.description,
            status: t.status,
            due_date: t.due_date.map(|d| d.to_chrono()),
            created_at: t.created_at.to_chrono(),
            updated_at: t.updated_at.to_chrono(),
        }
    }
}

#[derive(Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

fn parse_task_id(raw: &str) -> Result<ObjectId, JsonApiError> {
    ObjectId::parse_str(raw).map_err(|_| JsonApiError::bad_request(format!("malformed task id: {}", raw)))
}

pub async fn list_tasks(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<TaskListResponse>, JsonApiError> {
    let defaults = Pagination::default();
    let page = params.page.unwrap_or(defaults.page).max(1);
    let per_page = params
        .per_page
        .unwrap_or(defaults.per_page)
        .clamp(1, Pagination::MAX_PER_PAGE);
    let (skip, limit) = Pagination { page, per_page }.to_skip_limit();

    let tasks = task::list_by_owner(&state.db, user.id, skip, limit).await?;
    let total = task::count_by_owner(&state.db, user.id).await?;
    Ok(Json(TaskListResponse {
        tasks: tasks.into_iter().map(Into::into).collect(),
        page,
        per_page,
        total,
    }))
}

pub async fn create_task(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<TaskResponse>), JsonApiError> {
    let created = task::create(
        &state.db,
        user.id,
        &input.title,
        &input.description,
        input.status,
        input.due_date.map(DateTime::from_chrono),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn get_task(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, JsonApiError> {
    let id = parse_task_id(&id)?;
    let found = task::find_for_owner(&state.db, user.id, id)
        .await?
        .ok_or_else(|| JsonApiError::not_found("task"))?;
    Ok(Json(found.into()))
}

pub async fn update_task(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<Json<TaskResponse>, JsonApiError> {
    let id = parse_task_id(&id)?;
    let changes = TaskChanges {
        title: input.title,
        description: input.description,
        status: input.status,
        due_date: input.due_date.map(DateTime::from_chrono),
    };
    let updated = task::update_for_owner(&state.db, user.id, id, changes)
        .await?
        .ok_or_else(|| JsonApiError::not_found("task"))?;
    Ok(Json(updated.into()))
}

pub async fn delete_task(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, JsonApiError> {
    let id = parse_task_id(&id)?;
    if task::delete_for_owner(&state.db, user.id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(JsonApiError::not_found("task"))
    }
}
