use async_trait::async_trait;
use rbcore::{
    error::BackendError,
    job::{
        Job,
        JobState,
        traits::JobBackend,
    },
};
use sqlx::{
    Row,
    sqlite::SqliteRow,
};
use uuid::Uuid;

use crate::{
    SqliteBackend,
    impls::parse_uuid,
};

fn job_from_row(row: &SqliteRow) -> Result<Job, BackendError> {
    Ok(Job {
        id: parse_uuid(row.try_get("id")?)?,
        name: row.try_get("name")?,
        priority: row.try_get("priority")?,
        state: row.try_get::<&str, _>("state")?.parse::<JobState>()?,
        timestamp: row.try_get("timestamp")?,
        tasks: Vec::new(),
    })
}

async fn insert_job_sqlite(
    sqlite: &SqliteBackend,
    job: &Job,
) -> Result<(), BackendError> {
    sqlx::query(
        "
INSERT INTO job (
    id,
    name,
    priority,
    state,
    timestamp
)
VALUES ( ?1, ?2, ?3, ?4, ?5 )
        ",
    )
        .bind(job.id.to_string())
        .bind(&job.name)
        .bind(job.priority)
        .bind(job.state.as_str())
        .bind(job.timestamp)
        .execute(&*sqlite.pool)
        .await?;
    Ok(())
}

async fn update_job_sqlite(
    sqlite: &SqliteBackend,
    job: &Job,
) -> Result<bool, BackendError> {
    let rows_affected = sqlx::query(
        "
UPDATE
    job
SET
    name = ?2,
    priority = ?3,
    state = ?4,
    timestamp = ?5
WHERE
    id = ?1
        ",
    )
        .bind(job.id.to_string())
        .bind(&job.name)
        .bind(job.priority)
        .bind(job.state.as_str())
        .bind(job.timestamp)
        .execute(&*sqlite.pool)
        .await?
        .rows_affected();
    Ok(rows_affected > 0)
}

async fn select_job_sqlite(
    sqlite: &SqliteBackend,
    id: Uuid,
) -> Result<Option<Job>, BackendError> {
    sqlx::query(
        "
SELECT
    id,
    name,
    priority,
    state,
    timestamp
FROM
    job
WHERE
    id = ?1
        ",
    )
        .bind(id.to_string())
        .fetch_optional(&*sqlite.pool)
        .await?
        .as_ref()
        .map(job_from_row)
        .transpose()
}

async fn select_all_jobs_sqlite(
    sqlite: &SqliteBackend,
) -> Result<Vec<Job>, BackendError> {
    sqlx::query(
        "
SELECT
    id,
    name,
    priority,
    state,
    timestamp
FROM
    job
ORDER BY
    timestamp,
    rowid
        ",
    )
        .fetch_all(&*sqlite.pool)
        .await?
        .iter()
        .map(job_from_row)
        .collect()
}

#[async_trait]
impl JobBackend for SqliteBackend {
    async fn insert_job(
        &self,
        job: &Job,
    ) -> Result<(), BackendError> {
        insert_job_sqlite(self, job).await
    }

    async fn update_job(
        &self,
        job: &Job,
    ) -> Result<bool, BackendError> {
        update_job_sqlite(self, job).await
    }

    async fn select_job(
        &self,
        id: Uuid,
    ) -> Result<Option<Job>, BackendError> {
        select_job_sqlite(self, id).await
    }

    async fn select_all_jobs(
        &self,
    ) -> Result<Vec<Job>, BackendError> {
        select_all_jobs_sqlite(self).await
    }
}

#[cfg(test)]
mod tests {
    use rbcore::job::{
        Job,
        JobState,
        traits::JobBackend,
    };
    use crate::impls::testing::create_sqlite_backend;

    #[tokio::test]
    async fn test_job_lifecycle() -> anyhow::Result<()> {
        let backend = create_sqlite_backend().await?;
        let job = Job::new("frames")
            .with_priority(70)
            .with_timestamp(1.5);
        backend.insert_job(&job).await?;
        assert_eq!(backend.select_job(job.id).await?, Some(job.clone()));

        let job = job.with_state(JobState::Completed);
        assert!(backend.update_job(&job).await?);
        let stored = backend.select_job(job.id).await?
            .expect("job was inserted");
        assert_eq!(stored.state, JobState::Completed);

        assert!(!backend.update_job(&Job::new("missing")).await?);
        assert_eq!(backend.select_job(uuid::Uuid::new_v4()).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_select_all_jobs() -> anyhow::Result<()> {
        let backend = create_sqlite_backend().await?;
        assert!(backend.select_all_jobs().await?.is_empty());
        let first = Job::new("first").with_timestamp(10.0);
        let second = Job::new("second").with_timestamp(20.0);
        backend.insert_job(&second).await?;
        backend.insert_job(&first).await?;
        let names = backend.select_all_jobs().await?
            .into_iter()
            .map(|job| job.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["first", "second"]);
        Ok(())
    }
}
