use futures::stream::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, DateTime},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Database,
};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

pub const COLLECTION: &str = "tasks";
pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

/// Task document. Every task belongs to exactly one owner and all queries are
/// scoped by `owner_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub owner_id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Field-wise update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime>,
}

pub fn validate_title(title: &str) -> Result<(), ModelError> {
    let t = title.trim();
    if t.is_empty() {
        return Err(ModelError::Validation("title required".into()));
    }
    if t.chars().count() > MAX_TITLE_LEN {
        return Err(ModelError::Validation(format!(
            "title longer than {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

fn collection(db: &Database) -> mongodb::Collection<Task> {
    db.collection(COLLECTION)
}

pub async fn create(
    db: &Database,
    owner_id: ObjectId,
    title: &str,
    description: &str,
    status: TaskStatus,
    due_date: Option<DateTime>,
) -> Result<Task, ModelError> {
    validate_title(title)?;
    let now = DateTime::now();
    let task = Task {
        id: ObjectId::new(),
        owner_id,
        title: title.trim().to_string(),
        description: description.trim().to_string(),
        status,
        due_date,
        created_at: now,
        updated_at: now,
    };
    collection(db).insert_one(&task, None).await?;
    Ok(task)
}

/// Newest first.
pub async fn list_by_owner(
    db: &Database,
    owner_id: ObjectId,
    skip: u64,
    limit: i64,
) -> Result<Vec<Task>, ModelError> {
    let opts = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .skip(skip)
        .limit(limit)
        .build();
    let cursor = collection(db).find(doc! { "owner_id": owner_id }, opts).await?;
    Ok(cursor.try_collect().await?)
}

pub async fn count_by_owner(db: &Database, owner_id: ObjectId) -> Result<u64, ModelError> {
    Ok(collection(db).count_documents(doc! { "owner_id": owner_id }, None).await?)
}

pub async fn find_for_owner(
    db: &Database,
    owner_id: ObjectId,
    id: ObjectId,
) -> Result<Option<Task>, ModelError> {
    Ok(collection(db).find_one(doc! { "_id": id, "owner_id": owner_id }, None).await?)
}

/// Returns the updated document, or `None` when the task does not exist or
/// belongs to someone else.
pub async fn update_for_owner(
    db: &Database,
    owner_id: ObjectId,
    id: ObjectId,
    changes: TaskChanges,
) -> Result<Option<Task>, ModelError> {
    if let Some(title) = &changes.title {
        validate_title(title)?;
    }
    let mut set = doc! { "updated_at": DateTime::now() };
    if let Some(title) = changes.title {
        set.insert("title", title.trim());
    }
    if let Some(description) = changes.description {
        set.insert("description", description.trim());
    }
    if let Some(status) = changes.status {
        let status = bson::to_bson(&status).map_err(|e| ModelError::Db(e.to_string()))?;
        set.insert("status", status);
    }
    if let Some(due) = changes.due_date {
        set.insert("due_date", due);
    }
    let opts = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    Ok(collection(db)
        .find_one_and_update(doc! { "_id": id, "owner_id": owner_id }, doc! { "$set": set }, opts)
        .await?)
}

pub async fn delete_for_owner(db: &Database, owner_id: ObjectId, id: ObjectId) -> Result<bool, ModelError> {
    let res = collection(db)
        .delete_one(doc! { "_id": id, "owner_id": owner_id }, None)
        .await?;
    Ok(res.deleted_count == 1)
}
