use rbcore::{
    command::{
        CommandRegistry,
        SerializedCommand,
    },
    error::BackendError,
    job::{
        Job,
        JobState,
    },
    platform::QueuePlatform,
    task::{
        Task,
        TaskState,
    },
    worker::{
        Worker,
        WorkerState,
    },
};
use std::sync::Arc;
use uuid::Uuid;

/// A claimed task along with the job it belongs to, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct Claim {
    pub task: Task,
    pub job: Option<Job>,
}

/// Every change to persisted jobs, tasks and workers goes through here.
pub struct JobManager {
    platform: Arc<dyn QueuePlatform>,
    registry: Arc<dyn CommandRegistry>,
}

impl JobManager {
    pub fn new(
        platform: Arc<dyn QueuePlatform>,
        registry: Arc<dyn CommandRegistry>,
    ) -> Self {
        Self { platform, registry }
    }

    pub fn platform(&self) -> &dyn QueuePlatform {
        self.platform.as_ref()
    }

    fn is_runnable(&self, command: &SerializedCommand) -> bool {
        match self.registry.deserialize(command) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("rejecting command `{}`: {e}", command.name);
                false
            }
        }
    }

    /// Persist the job and then each of its tasks.
    ///
    /// Returns `None` without writing anything should any of the task
    /// commands fail to resolve through the registry.
    pub async fn submit_job(
        &self,
        mut job: Job,
    ) -> Result<Option<Job>, BackendError> {
        if !job.tasks.iter().all(|task| self.is_runnable(&task.command)) {
            return Ok(None);
        }
        let tasks = std::mem::take(&mut job.tasks);
        self.platform.insert_job(&job).await?;
        for task in tasks.into_iter() {
            let task = task.with_job_id(Some(job.id));
            if let Err(e) = self.platform.insert_task(&task).await {
                log::error!(
                    "job {} written with {} of its tasks: {e}",
                    job.id,
                    job.tasks.len(),
                );
                return Err(e);
            }
            job.tasks.push(task);
        }
        log::info!("submitted job {} with {} task(s)", job.id, job.tasks.len());
        Ok(Some(job))
    }

    pub async fn submit_task(
        &self,
        task: Task,
    ) -> Result<Option<Task>, BackendError> {
        if !self.is_runnable(&task.command) {
            return Ok(None);
        }
        self.platform.insert_task(&task).await?;
        log::info!("submitted {task}");
        Ok(Some(task))
    }

    /// Claim the next waiting task and resolve its job.
    ///
    /// Should the job lookup fail the claimed task is put back on the
    /// queue before the error is returned.
    pub async fn claim_next_task(&self) -> Result<Option<Claim>, BackendError> {
        let task = match self.platform.claim_next_waiting_task().await? {
            Some(task) => task,
            None => return Ok(None),
        };
        let job = match task.job_id {
            Some(job_id) => match self.platform.select_job(job_id).await {
                Ok(None) => {
                    log::warn!("{task} references missing job {job_id}");
                    None
                }
                Ok(job) => job,
                Err(err) => {
                    let task = task.with_state(TaskState::Waiting);
                    match self.platform.update_task(&task).await {
                        Ok(_) => log::warn!("requeued {task} as its job could not be read"),
                        Err(e) => log::error!("failed to requeue {task}: {e}"),
                    }
                    return Err(err);
                }
            },
            None => None,
        };
        log::debug!("claimed {task}");
        Ok(Some(Claim { task, job }))
    }

    /// Mark the task completed, then complete its job if nothing else in
    /// it remains; the job is returned as it stands afterwards.
    ///
    /// The task passed in is only updated to completed once the store has
    /// accepted the change.
    pub async fn complete_task(
        &self,
        task: &mut Task,
    ) -> Result<Option<Job>, BackendError> {
        let completed = task.clone().with_state(TaskState::Completed);
        if !self.platform.update_task(&completed).await? {
            return Err(BackendError::NotFound(format!("task {}", completed.id)));
        }
        *task = completed;
        log::debug!("completed {task}");
        self.cleanup_job(task).await
    }

    pub async fn cleanup_job(
        &self,
        task: &Task,
    ) -> Result<Option<Job>, BackendError> {
        let Some(job_id) = task.job_id else {
            return Ok(None);
        };
        let Some(job) = self.platform.select_job(job_id).await? else {
            log::warn!("{task} references missing job {job_id}");
            return Ok(None);
        };
        if job.is_completed() {
            return Ok(Some(job));
        }
        if self.platform.count_incomplete_tasks(job_id).await? > 0 {
            return Ok(Some(job));
        }
        let job = job.with_state(JobState::Completed);
        self.platform.update_job(&job).await?;
        log::info!("completed {job}");
        Ok(Some(job))
    }

    /// Bring a job back in line with its tasks after one of them was
    /// returned to the queue.
    ///
    /// The job goes back to waiting unless any of its other tasks are in
    /// progress or have completed; a completed job is left as is.
    pub async fn release_job(
        &self,
        job: &Job,
    ) -> Result<Option<Job>, BackendError> {
        let Some(job) = self.platform.select_job(job.id).await? else {
            return Ok(None);
        };
        if job.is_completed() {
            return Ok(Some(job));
        }
        let active = self.platform.count_tasks_in_state(job.id, TaskState::Progress).await?
            + self.platform.count_tasks_in_state(job.id, TaskState::Completed).await?;
        let state = if active > 0 {
            JobState::Progress
        } else {
            JobState::Waiting
        };
        if job.state == state {
            return Ok(Some(job));
        }
        let job = job.with_state(state);
        self.platform.update_job(&job).await?;
        log::debug!("released {job}");
        Ok(Some(job))
    }

    /// Registration is keyed by name; a returning worker keeps its id and
    /// starts over as idle without a task.
    pub async fn register_worker(
        &self,
        worker: Worker,
    ) -> Result<Worker, BackendError> {
        match self.platform.select_worker_by_name(&worker.name).await? {
            Some(existing) => {
                let worker = existing
                    .with_state(WorkerState::Idle)
                    .with_task_id(None);
                self.platform.update_worker(&worker).await?;
                log::info!("re-registered {worker}");
                Ok(worker)
            }
            None => {
                let worker = worker
                    .with_state(WorkerState::Idle)
                    .with_task_id(None);
                let id = self.platform.insert_worker(&worker).await?;
                let worker = worker.with_id(Some(id));
                log::info!("registered {worker}");
                Ok(worker)
            }
        }
    }

    pub async fn update_worker(&self, worker: &Worker) -> Result<bool, BackendError> {
        self.platform.update_worker(worker).await
    }

    pub async fn update_task(&self, task: &Task) -> Result<bool, BackendError> {
        self.platform.update_task(task).await
    }

    pub async fn update_job(&self, job: &Job) -> Result<bool, BackendError> {
        self.platform.update_job(job).await
    }

    pub async fn list_tasks(&self, job_id: Uuid) -> Result<Vec<Task>, BackendError> {
        self.platform.select_all_tasks(job_id).await
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>, BackendError> {
        self.platform.select_all_jobs().await
    }

    pub async fn list_workers(&self) -> Result<Vec<Worker>, BackendError> {
        self.platform.select_all_workers().await
    }
}
