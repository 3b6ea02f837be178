use async_trait::async_trait;
use rbcore::{
    error::BackendError,
    worker::{
        Worker,
        WorkerState,
        traits::WorkerBackend,
    },
};
use sqlx::{
    Row,
    sqlite::SqliteRow,
};

use crate::{
    SqliteBackend,
    impls::parse_optional_uuid,
};

fn worker_from_row(row: &SqliteRow) -> Result<Worker, BackendError> {
    Ok(Worker {
        id: Some(row.try_get("id")?),
        name: row.try_get("name")?,
        state: row.try_get::<&str, _>("state")?.parse::<WorkerState>()?,
        timestamp: row.try_get("timestamp")?,
        task_id: parse_optional_uuid(row.try_get("task_id")?)?,
    })
}

async fn insert_worker_sqlite(
    sqlite: &SqliteBackend,
    worker: &Worker,
) -> Result<i64, BackendError> {
    let id = sqlx::query(
        "
INSERT INTO worker (
    name,
    state,
    timestamp,
    task_id
)
VALUES ( ?1, ?2, ?3, ?4 )
        ",
    )
        .bind(&worker.name)
        .bind(worker.state.as_str())
        .bind(worker.timestamp)
        .bind(worker.task_id.map(|id| id.to_string()))
        .execute(&*sqlite.pool)
        .await?
        .last_insert_rowid();
    Ok(id)
}

// workers are keyed by their unique name
async fn update_worker_sqlite(
    sqlite: &SqliteBackend,
    worker: &Worker,
) -> Result<bool, BackendError> {
    let rows_affected = sqlx::query(
        "
UPDATE
    worker
SET
    state = ?2,
    timestamp = ?3,
    task_id = ?4
WHERE
    name = ?1
        ",
    )
        .bind(&worker.name)
        .bind(worker.state.as_str())
        .bind(worker.timestamp)
        .bind(worker.task_id.map(|id| id.to_string()))
        .execute(&*sqlite.pool)
        .await?
        .rows_affected();
    Ok(rows_affected > 0)
}

async fn select_worker_by_name_sqlite(
    sqlite: &SqliteBackend,
    name: &str,
) -> Result<Option<Worker>, BackendError> {
    sqlx::query(
        "
SELECT
    id,
    name,
    state,
    timestamp,
    task_id
FROM
    worker
WHERE
    name = ?1
        ",
    )
        .bind(name)
        .fetch_optional(&*sqlite.pool)
        .await?
        .as_ref()
        .map(worker_from_row)
        .transpose()
}

async fn select_all_workers_sqlite(
    sqlite: &SqliteBackend,
) -> Result<Vec<Worker>, BackendError> {
    sqlx::query(
        "
SELECT
    id,
    name,
    state,
    timestamp,
    task_id
FROM
    worker
ORDER BY
    id
        ",
    )
        .fetch_all(&*sqlite.pool)
        .await?
        .iter()
        .map(worker_from_row)
        .collect()
}

#[async_trait]
impl WorkerBackend for SqliteBackend {
    async fn insert_worker(
        &self,
        worker: &Worker,
    ) -> Result<i64, BackendError> {
        insert_worker_sqlite(self, worker).await
    }

    async fn update_worker(
        &self,
        worker: &Worker,
    ) -> Result<bool, BackendError> {
        update_worker_sqlite(self, worker).await
    }

    async fn select_worker_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Worker>, BackendError> {
        select_worker_by_name_sqlite(self, name).await
    }

    async fn select_all_workers(
        &self,
    ) -> Result<Vec<Worker>, BackendError> {
        select_all_workers_sqlite(self).await
    }
}

#[cfg(test)]
mod tests {
    use rbcore::{
        error::BackendError,
        worker::{
            Worker,
            WorkerState,
            traits::WorkerBackend,
        },
    };
    use uuid::Uuid;
    use crate::impls::testing::create_sqlite_backend;

    #[tokio::test]
    async fn test_worker_insert_select() -> anyhow::Result<()> {
        let backend = create_sqlite_backend().await?;
        let worker = Worker {
            timestamp: 10.0,
            ..Worker::new("host-a")
        };
        let id = backend.insert_worker(&worker).await?;
        assert_eq!(
            backend.select_worker_by_name("host-a").await?,
            Some(worker.with_id(Some(id))),
        );
        assert_eq!(backend.select_worker_by_name("host-b").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_worker_name_unique() -> anyhow::Result<()> {
        let backend = create_sqlite_backend().await?;
        backend.insert_worker(&Worker::new("host-a")).await?;
        assert!(matches!(
            backend.insert_worker(&Worker::new("host-a")).await,
            Err(BackendError::Sqlx(_)),
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_worker_update() -> anyhow::Result<()> {
        let backend = create_sqlite_backend().await?;
        let worker = Worker::new("host-a");
        let id = backend.insert_worker(&worker).await?;
        let task_id = Uuid::new_v4();
        let worker = worker
            .with_id(Some(id))
            .with_state(WorkerState::Working)
            .with_task_id(Some(task_id));
        assert!(backend.update_worker(&worker).await?);

        let stored = backend.select_worker_by_name("host-a").await?
            .expect("worker was inserted");
        assert_eq!(stored.state, WorkerState::Working);
        assert_eq!(stored.task_id, Some(task_id));
        assert_eq!(stored.id, Some(id));

        assert!(!backend.update_worker(&Worker::new("host-z")).await?);
        assert_eq!(backend.select_all_workers().await?.len(), 1);
        Ok(())
    }
}
