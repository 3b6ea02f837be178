use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::BackendError,
    job::Job,
};

#[async_trait]
pub trait JobBackend {
    // only the job row; the tasks carried by the job are inserted through
    // the TaskBackend
    async fn insert_job(
        &self,
        job: &Job,
    ) -> Result<(), BackendError>;
    async fn update_job(
        &self,
        job: &Job,
    ) -> Result<bool, BackendError>;
    async fn select_job(
        &self,
        id: Uuid,
    ) -> Result<Option<Job>, BackendError>;
    async fn select_all_jobs(
        &self,
    ) -> Result<Vec<Job>, BackendError>;
}
