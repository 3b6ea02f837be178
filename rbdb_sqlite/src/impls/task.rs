use async_trait::async_trait;
use rbcore::{
    command::SerializedCommand,
    error::{
        BackendError,
        ValueError,
    },
    task::{
        Task,
        TaskState,
        traits::TaskBackend,
    },
};
use sqlx::{
    Row,
    sqlite::SqliteRow,
};
use uuid::Uuid;

use crate::{
    SqliteBackend,
    impls::{
        parse_optional_uuid,
        parse_uuid,
    },
};

fn task_from_row(row: &SqliteRow) -> Result<Task, BackendError> {
    let command: &str = row.try_get("command")?;
    Ok(Task {
        id: parse_uuid(row.try_get("id")?)?,
        job_id: parse_optional_uuid(row.try_get("job_id")?)?,
        priority: row.try_get("priority")?,
        command: serde_json::from_str::<SerializedCommand>(command)
            .map_err(|e| ValueError::InvalidCommand(e.to_string()))?,
        state: row.try_get::<&str, _>("state")?.parse::<TaskState>()?,
        timestamp: row.try_get("timestamp")?,
    })
}

fn command_to_text(command: &SerializedCommand) -> Result<String, BackendError> {
    Ok(serde_json::to_string(command)
        .map_err(|e| ValueError::InvalidCommand(e.to_string()))?)
}

async fn insert_task_sqlite(
    sqlite: &SqliteBackend,
    task: &Task,
) -> Result<(), BackendError> {
    sqlx::query(
        "
INSERT INTO task (
    id,
    job_id,
    priority,
    command,
    state,
    timestamp
)
VALUES ( ?1, ?2, ?3, ?4, ?5, ?6 )
        ",
    )
        .bind(task.id.to_string())
        .bind(task.job_id.map(|id| id.to_string()))
        .bind(task.priority)
        .bind(command_to_text(&task.command)?)
        .bind(task.state.as_str())
        .bind(task.timestamp)
        .execute(&*sqlite.pool)
        .await?;
    Ok(())
}

async fn update_task_sqlite(
    sqlite: &SqliteBackend,
    task: &Task,
) -> Result<bool, BackendError> {
    let rows_affected = sqlx::query(
        "
UPDATE
    task
SET
    job_id = ?2,
    priority = ?3,
    command = ?4,
    state = ?5,
    timestamp = ?6
WHERE
    id = ?1
        ",
    )
        .bind(task.id.to_string())
        .bind(task.job_id.map(|id| id.to_string()))
        .bind(task.priority)
        .bind(command_to_text(&task.command)?)
        .bind(task.state.as_str())
        .bind(task.timestamp)
        .execute(&*sqlite.pool)
        .await?
        .rows_affected();
    Ok(rows_affected > 0)
}

async fn select_task_sqlite(
    sqlite: &SqliteBackend,
    id: Uuid,
) -> Result<Option<Task>, BackendError> {
    sqlx::query(
        "
SELECT
    id,
    job_id,
    priority,
    command,
    state,
    timestamp
FROM
    task
WHERE
    id = ?1
        ",
    )
        .bind(id.to_string())
        .fetch_optional(&*sqlite.pool)
        .await?
        .as_ref()
        .map(task_from_row)
        .transpose()
}

async fn select_all_tasks_sqlite(
    sqlite: &SqliteBackend,
    job_id: Uuid,
) -> Result<Vec<Task>, BackendError> {
    sqlx::query(
        "
SELECT
    id,
    job_id,
    priority,
    command,
    state,
    timestamp
FROM
    task
WHERE
    job_id = ?1
ORDER BY
    timestamp,
    rowid
        ",
    )
        .bind(job_id.to_string())
        .fetch_all(&*sqlite.pool)
        .await?
        .iter()
        .map(task_from_row)
        .collect()
}

async fn claim_next_waiting_task_sqlite(
    sqlite: &SqliteBackend,
) -> Result<Option<Task>, BackendError> {
    // A single statement selects and transitions the task, so the write
    // lock held by the statement makes the claim exclusive.  The outer
    // state check guards against the subquery having been satisfied by
    // a row another connection has claimed in the meantime.
    let result = sqlx::query(
        "
UPDATE
    task
SET
    state = 'progress'
WHERE id = (
    SELECT
        id
    FROM
        task
    WHERE
        state = 'waiting'
    ORDER BY
        priority DESC,
        timestamp ASC,
        rowid ASC
    LIMIT 1
)
    AND state = 'waiting'
RETURNING
    id,
    job_id,
    priority,
    command,
    state,
    timestamp
        ",
    )
        .fetch_optional(&*sqlite.pool)
        .await?
        .as_ref()
        .map(task_from_row)
        .transpose()?;
    if let Some(task) = result.as_ref() {
        log::trace!("claimed {task}");
    }
    Ok(result)
}

async fn count_incomplete_tasks_sqlite(
    sqlite: &SqliteBackend,
    job_id: Uuid,
) -> Result<i64, BackendError> {
    Ok(sqlx::query_scalar::<_, i64>(
        "
SELECT
    COUNT(*)
FROM
    task
WHERE
    job_id = ?1
    AND state != 'completed'
        ",
    )
        .bind(job_id.to_string())
        .fetch_one(&*sqlite.pool)
        .await?)
}

async fn count_tasks_in_state_sqlite(
    sqlite: &SqliteBackend,
    job_id: Uuid,
    state: TaskState,
) -> Result<i64, BackendError> {
    Ok(sqlx::query_scalar::<_, i64>(
        "
SELECT
    COUNT(*)
FROM
    task
WHERE
    job_id = ?1
    AND state = ?2
        ",
    )
        .bind(job_id.to_string())
        .bind(state.as_str())
        .fetch_one(&*sqlite.pool)
        .await?)
}

#[async_trait]
impl TaskBackend for SqliteBackend {
    async fn insert_task(
        &self,
        task: &Task,
    ) -> Result<(), BackendError> {
        insert_task_sqlite(self, task).await
    }

    async fn update_task(
        &self,
        task: &Task,
    ) -> Result<bool, BackendError> {
        update_task_sqlite(self, task).await
    }

    async fn select_task(
        &self,
        id: Uuid,
    ) -> Result<Option<Task>, BackendError> {
        select_task_sqlite(self, id).await
    }

    async fn select_all_tasks(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<Task>, BackendError> {
        select_all_tasks_sqlite(self, job_id).await
    }

    async fn claim_next_waiting_task(
        &self,
    ) -> Result<Option<Task>, BackendError> {
        claim_next_waiting_task_sqlite(self).await
    }

    async fn count_incomplete_tasks(
        &self,
        job_id: Uuid,
    ) -> Result<i64, BackendError> {
        count_incomplete_tasks_sqlite(self, job_id).await
    }

    async fn count_tasks_in_state(
        &self,
        job_id: Uuid,
        state: TaskState,
    ) -> Result<i64, BackendError> {
        count_tasks_in_state_sqlite(self, job_id, state).await
    }
}
