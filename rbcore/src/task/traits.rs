use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::BackendError,
    task::{
        Task,
        TaskState,
    },
};

#[async_trait]
pub trait TaskBackend {
    async fn insert_task(
        &self,
        task: &Task,
    ) -> Result<(), BackendError>;
    // returns whether a row was updated
    async fn update_task(
        &self,
        task: &Task,
    ) -> Result<bool, BackendError>;
    async fn select_task(
        &self,
        id: Uuid,
    ) -> Result<Option<Task>, BackendError>;
    async fn select_all_tasks(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<Task>, BackendError>;
    /// Select the next waiting task and mark it in progress as a single
    /// indivisible operation; no two callers may ever receive the same
    /// task.
    async fn claim_next_waiting_task(
        &self,
    ) -> Result<Option<Task>, BackendError>;
    async fn count_incomplete_tasks(
        &self,
        job_id: Uuid,
    ) -> Result<i64, BackendError>;
    async fn count_tasks_in_state(
        &self,
        job_id: Uuid,
        state: TaskState,
    ) -> Result<i64, BackendError>;
}
