use async_trait::async_trait;
use mockall::mock;
use rbcore::{
    error::BackendError,
    job::{
        Job,
        traits::JobBackend,
    },
    platform::{
        DefaultQueuePlatform,
        PlatformUrl,
    },
    task::{
        Task,
        TaskState,
        traits::TaskBackend,
    },
    worker::{
        Worker,
        traits::WorkerBackend,
    },
};
use uuid::Uuid;

mock! {
    pub Platform {}

    #[async_trait]
    impl JobBackend for Platform {
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

    #[async_trait]
    impl TaskBackend for Platform {
        async fn insert_task(
            &self,
            task: &Task,
        ) -> Result<(), BackendError>;
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

    #[async_trait]
    impl WorkerBackend for Platform {
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

    impl PlatformUrl for Platform {
        fn url(&self) -> &str;
    }
}

impl DefaultQueuePlatform for MockPlatform {}
