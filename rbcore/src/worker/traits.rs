use async_trait::async_trait;

use crate::{
    error::BackendError,
    worker::Worker,
};

#[async_trait]
pub trait WorkerBackend {
    // returns the newly assigned id; names are unique
    async fn insert_worker(
        &self,
        worker: &Worker,
    ) -> Result<i64, BackendError>;
    async fn update_worker(
        &self,
        worker: &Worker,
    ) -> Result<bool, BackendError>;
    async fn select_worker_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Worker>, BackendError>;
    async fn select_all_workers(
        &self,
    ) -> Result<Vec<Worker>, BackendError>;
}
