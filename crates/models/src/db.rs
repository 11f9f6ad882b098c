use std::time::Duration;

use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions},
    Client, Database, IndexModel,
};

use configs::DatabaseConfig;

/// Fixed database name for the application.
pub const DB_NAME: &str = "task_manager";

/// Build a lazily-connecting handle to the task database.
///
/// Only a malformed URI fails here; reachability is probed separately via
/// [`ping`] so the caller can decide what an offline store means.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<Database> {
    let mut opts = ClientOptions::parse(&cfg.uri).await?;
    opts.app_name.get_or_insert_with(|| "task-manager".to_string());
    opts.server_selection_timeout = Some(Duration::from_secs(cfg.server_selection_timeout_secs));
    let client = Client::with_options(opts)?;
    Ok(client.database(DB_NAME))
}

/// Round-trip a `ping` command so startup can tell whether the store is
/// actually reachable.
pub async fn ping(db: &Database) -> anyhow::Result<()> {
    db.run_command(doc! { "ping": 1 }, None).await?;
    Ok(())
}

/// Create the indexes the collections rely on. Safe to run repeatedly.
pub async fn ensure_indexes(db: &Database) -> anyhow::Result<()> {
    let users = db.collection::<crate::user::User>(crate::user::COLLECTION);
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            None,
        )
        .await?;

    let tasks = db.collection::<crate::task::Task>(crate::task::COLLECTION);
    tasks
        .create_index(
            IndexModel::builder()
                .keys(doc! { "owner_id": 1, "created_at": -1 })
                .build(),
            None,
        )
        .await?;
    Ok(())
}
