use chrono::Utc;
use sqlx::Row;

use serqet_core::domain::records::{NewTask, TaskId, TaskRecord, TASK_STATUS_PENDING};

use super::{
    decode_err, decode_timestamp, encode_timestamp, new_record_id, RepositoryError,
    TaskRepository,
};
use crate::DbPool;

pub struct SqlTaskRepository {
    pool: DbPool,
}

impl SqlTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<TaskRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let title: String = row.try_get("title").map_err(decode_err)?;
    let status: String = row.try_get("status").map_err(decode_err)?;
    let due_date: Option<String> = row.try_get("due_date").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(TaskRecord {
        id: TaskId(id),
        title,
        status,
        due_date,
        created_at: decode_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl TaskRepository for SqlTaskRepository {
    async fn create(&self, task: NewTask) -> Result<TaskRecord, RepositoryError> {
        let record = TaskRecord {
            id: TaskId(new_record_id()),
            title: task.title,
            status: TASK_STATUS_PENDING.to_string(),
            due_date: task.due_date,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO task_record (id, title, status, due_date, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.title)
        .bind(&record.status)
        .bind(&record.due_date)
        .bind(encode_timestamp(&record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list(&self) -> Result<Vec<TaskRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, title, status, due_date, created_at
             FROM task_record
             ORDER BY status DESC, created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_task).collect()
    }
}
