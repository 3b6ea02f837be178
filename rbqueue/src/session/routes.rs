use futures::future::BoxFuture;
use rbcore::{
    job::{
        Job,
        JobState,
    },
    task::{
        Task,
        TaskState,
    },
    worker::{
        Worker,
        WorkerState,
    },
};
use uuid::Uuid;

use crate::{
    error::SessionError,
    protocol::{
        Message,
        names,
    },
    router::{
        MessageRouter,
        Responder,
    },
    session::{
        Session,
        SessionState,
    },
};

type Response<'a> = BoxFuture<'a, Result<(), SessionError>>;

/// The full set of routes served to every connection.
pub fn router() -> MessageRouter<Session> {
    MessageRouter::new()
        .include(MessageRouter::with_prefix("workers")
            .register("register", register_worker)
            .register("all", all_workers)
        )
        .include(MessageRouter::with_prefix("tasks")
            .register("next", next_task)
            .register("complete", complete_task)
            .register("create", create_task)
            .register("all", all_tasks)
        )
        .include(MessageRouter::with_prefix("jobs")
            .register("create", create_job)
            .register("all", all_jobs)
        )
        .include(MessageRouter::with_prefix("connection")
            .register("close", close)
            .register("docs", docs)
        )
}

// a payload that fails to decode is reported back as a failure
fn payload<T: serde::de::DeserializeOwned>(
    session: &mut Session,
    message: &Message,
) -> Option<T> {
    match message.data_as::<T>() {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            session.respond(Message::failure(
                format!("`{}` requires data", message.message)
            ));
            None
        }
        Err(e) => {
            log::debug!("session {} sent malformed `{}`: {e}", session.peer, message.message);
            session.respond(Message::failure(e));
            None
        }
    }
}

// the id of the task this session is still working on, if any
fn held_task(session: &Session) -> Option<Uuid> {
    session.task.as_ref()
        .filter(|task| task.state == TaskState::Progress)
        .map(|task| task.id)
}

fn register_worker<'a>(
    session: &'a mut Session,
    message: &'a Message,
) -> Response<'a> {
    Box::pin(async move {
        if let Some(task_id) = held_task(session) {
            session.respond(Message::failure(format!("task {task_id} still in progress")));
            return Ok(());
        }
        let Some(worker) = payload::<Worker>(session, message) else {
            return Ok(());
        };
        let worker = session.manager.register_worker(worker).await?;
        session.respond(Message::with_data(names::SUCCESS, &worker)?);
        log::info!("session {} registered as {worker}", session.peer);
        session.worker = Some(worker);
        session.state = SessionState::Registered;
        Ok(())
    })
}

fn next_task<'a>(
    session: &'a mut Session,
    _: &'a Message,
) -> Response<'a> {
    Box::pin(async move {
        let Some(worker) = session.worker.clone() else {
            session.respond(Message::failure("worker not registered"));
            return Ok(());
        };
        if let Some(task_id) = held_task(session) {
            session.respond(Message::failure(format!("task {task_id} already in progress")));
            return Ok(());
        }
        let Some(claim) = session.manager.claim_next_task().await? else {
            session.respond(Message::new(names::TASKS));
            return Ok(());
        };
        // held from here on so that cleanup requeues it should anything fail
        session.task = Some(claim.task.clone());
        session.job = claim.job.clone();

        let worker = worker
            .with_state(WorkerState::Working)
            .with_task_id(Some(claim.task.id));
        session.manager.update_worker(&worker).await?;
        session.worker = Some(worker);

        if let Some(job) = claim.job.filter(|job| job.state == JobState::Waiting) {
            let job = job.with_state(JobState::Progress);
            session.manager.update_job(&job).await?;
            session.job = Some(job);
        }
        log::info!("session {} took {}", session.peer, claim.task);
        session.respond(Message::with_data(names::TASKS, &claim.task)?);
        Ok(())
    })
}

fn complete_task<'a>(
    session: &'a mut Session,
    _: &'a Message,
) -> Response<'a> {
    Box::pin(async move {
        if session.task.is_none() {
            session.respond(Message::failure("no task held"));
            return Ok(());
        }
        let manager = session.manager.clone();
        // the held copy only turns completed once the store has it so
        let job = match session.task.as_mut() {
            Some(task) => manager.complete_task(task).await?,
            None => None,
        };
        session.task = None;
        session.job = None;
        if let Some(job) = job.as_ref() {
            log::debug!("session {} finished work on {job}", session.peer);
        }
        if let Some(worker) = session.worker.clone() {
            let worker = worker
                .with_state(WorkerState::Idle)
                .with_task_id(None);
            session.manager.update_worker(&worker).await?;
            session.worker = Some(worker);
        }
        session.respond(Message::new(names::OK));
        Ok(())
    })
}

fn create_job<'a>(
    session: &'a mut Session,
    message: &'a Message,
) -> Response<'a> {
    Box::pin(async move {
        let Some(job) = payload::<Job>(session, message) else {
            return Ok(());
        };
        match session.manager.submit_job(job).await? {
            Some(job) => session.respond(Message::with_data(names::JOB_CREATED, &job)?),
            None => session.respond(Message::failure("job contains an unknown or malformed command")),
        }
        Ok(())
    })
}

fn create_task<'a>(
    session: &'a mut Session,
    message: &'a Message,
) -> Response<'a> {
    Box::pin(async move {
        let Some(task) = payload::<Task>(session, message) else {
            return Ok(());
        };
        match session.manager.submit_task(task).await? {
            Some(task) => session.respond(Message::with_data(names::TASK_CREATED, &task)?),
            None => session.respond(Message::failure("unknown or malformed command")),
        }
        Ok(())
    })
}

fn all_jobs<'a>(
    session: &'a mut Session,
    _: &'a Message,
) -> Response<'a> {
    Box::pin(async move {
        let jobs = session.manager.list_jobs().await?;
        session.respond(Message::with_data(names::ALL_JOBS, &jobs)?);
        Ok(())
    })
}

fn all_tasks<'a>(
    session: &'a mut Session,
    message: &'a Message,
) -> Response<'a> {
    Box::pin(async move {
        let Some(job_id) = payload::<Uuid>(session, message) else {
            return Ok(());
        };
        let tasks = session.manager.list_tasks(job_id).await?;
        session.respond(Message::with_data(names::ALL_TASKS, &tasks)?);
        Ok(())
    })
}

fn all_workers<'a>(
    session: &'a mut Session,
    _: &'a Message,
) -> Response<'a> {
    Box::pin(async move {
        let workers = session.manager.list_workers().await?;
        session.respond(Message::with_data(names::ALL_WORKERS, &workers)?);
        Ok(())
    })
}

fn close<'a>(
    session: &'a mut Session,
    _: &'a Message,
) -> Response<'a> {
    Box::pin(async move {
        log::debug!("session {} asked to close", session.peer);
        session.state = SessionState::Closed;
        Ok(())
    })
}

fn docs<'a>(
    session: &'a mut Session,
    _: &'a Message,
) -> Response<'a> {
    Box::pin(async move {
        let routes = session.routes.clone();
        session.respond(Message::with_data(names::DOCS, routes.as_slice())?);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use mockall::predicate::*;
    use rbcore::{
        command::{
            PreparedCommandRegistry,
            SerializedCommand,
        },
        job::{
            Job,
            JobState,
        },
        task::{
            Task,
            TaskState,
        },
        worker::{
            Worker,
            WorkerState,
        },
    };
    use serde_json::json;
    use std::sync::Arc;
    use test_rb::core::MockPlatform;
    use crate::{
        manager::JobManager,
        protocol::{
            Message,
            names,
        },
        session::{
            Session,
            SessionState,
        },
    };
    use super::router;

    fn session(platform: MockPlatform) -> Session {
        let manager = JobManager::new(
            Arc::new(platform),
            Arc::new(PreparedCommandRegistry::with_defaults()),
        );
        Session::new("test", Arc::new(manager), Arc::new(router().routes()))
    }

    fn sleep_task() -> Task {
        Task::new(SerializedCommand::new(
            "SleepCommand",
            json!({ "duration": 1 }),
        ).expect("object payload"))
    }

    #[tokio::test]
    async fn test_next_requires_registration() -> anyhow::Result<()> {
        let mut session = session(MockPlatform::new());
        router().serve(&mut session, &Message::new(names::TASKS_NEXT)).await?;
        assert_eq!(
            session.take_responses(),
            vec![Message::failure("worker not registered")],
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_requires_task() -> anyhow::Result<()> {
        let mut session = session(MockPlatform::new());
        router().serve(&mut session, &Message::new(names::TASKS_COMPLETE)).await?;
        assert_eq!(
            session.take_responses(),
            vec![Message::failure("no task held")],
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_register_missing_data() -> anyhow::Result<()> {
        let mut session = session(MockPlatform::new());
        router().serve(&mut session, &Message::new(names::WORKERS_REGISTER)).await?;
        let responses = session.take_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].message, names::FAILURE);
        assert_eq!(session.state(), SessionState::Connected);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_then_claim() -> anyhow::Result<()> {
        let job = Job::new("job");
        let task = sleep_task()
            .with_job_id(Some(job.id))
            .with_state(TaskState::Progress);

        let mut platform = MockPlatform::new();
        platform.expect_select_worker_by_name()
            .returning(|_| Ok(None));
        platform.expect_insert_worker()
            .returning(|_| Ok(1));
        let claimed = task.clone();
        platform.expect_claim_next_waiting_task()
            .times(1)
            .returning(move || Ok(Some(claimed.clone())));
        let stored = job.clone();
        platform.expect_select_job()
            .with(eq(job.id))
            .returning(move |_| Ok(Some(stored.clone())));
        let task_id = task.id;
        platform.expect_update_worker()
            .times(1)
            .withf(move |worker| worker.state == WorkerState::Working
                && worker.task_id == Some(task_id))
            .returning(|_| Ok(true));
        platform.expect_update_job()
            .times(1)
            .withf(|job| job.state == JobState::Progress)
            .returning(|_| Ok(true));

        let router = router();
        let mut session = session(platform);
        let register = Message::with_data(names::WORKERS_REGISTER, &Worker::new("host-a"))?;
        router.serve(&mut session, &register).await?;
        assert_eq!(session.state(), SessionState::Registered);
        assert_eq!(session.take_responses()[0].message, names::SUCCESS);

        router.serve(&mut session, &Message::new(names::TASKS_NEXT)).await?;
        assert_eq!(
            session.take_responses(),
            vec![Message::with_data(names::TASKS, &task)?],
        );
        assert_eq!(session.task(), Some(&task));
        assert_eq!(session.job().map(|job| job.state), Some(JobState::Progress));

        // a second request while the first is still held is refused
        router.serve(&mut session, &Message::new(names::TASKS_NEXT)).await?;
        assert_eq!(session.take_responses()[0].message, names::FAILURE);
        assert_eq!(session.task(), Some(&task));
        Ok(())
    }

    #[tokio::test]
    async fn test_claim_held_through_store_failure() -> anyhow::Result<()> {
        let job = Job::new("job");
        let task = sleep_task()
            .with_job_id(Some(job.id))
            .with_state(TaskState::Progress);
        let task_id = task.id;

        let mut platform = MockPlatform::new();
        let claimed = task.clone();
        platform.expect_claim_next_waiting_task()
            .times(1)
            .returning(move || Ok(Some(claimed.clone())));
        let stored = job.clone();
        platform.expect_select_job()
            .returning(move |_| Ok(Some(stored.clone())));
        platform.expect_update_worker()
            .times(1)
            .withf(|worker| worker.state == WorkerState::Working)
            .returning(|_| Err(rbcore::error::BackendError::Unknown));
        platform.expect_update_worker()
            .times(1)
            .withf(|worker| worker.state == WorkerState::Offline)
            .returning(|_| Ok(true));
        platform.expect_update_task()
            .times(1)
            .withf(move |task| task.id == task_id && task.state == TaskState::Waiting)
            .returning(|_| Ok(true));
        platform.expect_count_tasks_in_state()
            .returning(|_, _| Ok(0));

        let mut session = session(platform);
        session.worker = Some(Worker::new("host-a").with_id(Some(1)));
        let result = router().serve(&mut session, &Message::new(names::TASKS_NEXT)).await;
        assert!(result.is_err());
        assert_eq!(session.task(), Some(&task));
        session.cleanup().await;
        assert!(session.task().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_register_while_holding_task() -> anyhow::Result<()> {
        let task = sleep_task().with_state(TaskState::Progress);
        let mut session = session(MockPlatform::new());
        session.worker = Some(Worker::new("host-a")
            .with_id(Some(1))
            .with_state(WorkerState::Working)
            .with_task_id(Some(task.id)));
        session.task = Some(task.clone());
        let register = Message::with_data(names::WORKERS_REGISTER, &Worker::new("host-a"))?;
        router().serve(&mut session, &register).await?;
        assert_eq!(
            session.take_responses(),
            vec![Message::failure(format!("task {} still in progress", task.id))],
        );
        assert_eq!(session.task(), Some(&task));
        assert_eq!(session.worker().map(|worker| worker.state), Some(WorkerState::Working));
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_failure_requeues() -> anyhow::Result<()> {
        let task = sleep_task().with_state(TaskState::Progress);
        let task_id = task.id;

        let mut platform = MockPlatform::new();
        platform.expect_update_task()
            .times(1)
            .withf(|task| task.state == TaskState::Completed)
            .returning(|_| Err(rbcore::error::BackendError::Unknown));
        platform.expect_update_task()
            .times(1)
            .withf(move |task| task.id == task_id && task.state == TaskState::Waiting)
            .returning(|_| Ok(true));
        platform.expect_update_worker()
            .times(1)
            .withf(|worker| worker.state == WorkerState::Offline)
            .returning(|_| Ok(true));

        let mut session = session(platform);
        session.worker = Some(Worker::new("host-a")
            .with_id(Some(1))
            .with_state(WorkerState::Working)
            .with_task_id(Some(task_id)));
        session.task = Some(task.clone());
        let result = router().serve(&mut session, &Message::new(names::TASKS_COMPLETE)).await;
        assert!(result.is_err());
        assert_eq!(session.task(), Some(&task));
        session.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_completed_task_not_requeued() -> anyhow::Result<()> {
        let job = Job::new("job").with_state(JobState::Progress);
        let task = sleep_task()
            .with_job_id(Some(job.id))
            .with_state(TaskState::Progress);

        let mut platform = MockPlatform::new();
        platform.expect_update_task()
            .times(1)
            .withf(|task| task.state == TaskState::Completed)
            .returning(|_| Ok(true));
        // job bookkeeping fails after the task itself was completed
        platform.expect_select_job()
            .returning(|_| Err(rbcore::error::BackendError::Unknown));
        platform.expect_update_worker()
            .times(1)
            .withf(|worker| worker.state == WorkerState::Offline)
            .returning(|_| Ok(true));

        let mut session = session(platform);
        session.worker = Some(Worker::new("host-a")
            .with_id(Some(1))
            .with_state(WorkerState::Working)
            .with_task_id(Some(task.id)));
        session.task = Some(task);
        session.job = Some(job);
        let result = router().serve(&mut session, &Message::new(names::TASKS_COMPLETE)).await;
        assert!(result.is_err());
        assert_eq!(session.task().map(|task| task.state), Some(TaskState::Completed));
        // the mock allows a single update_task, so a requeue would panic
        session.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_next_without_tasks() -> anyhow::Result<()> {
        let mut platform = MockPlatform::new();
        platform.expect_select_worker_by_name()
            .returning(|_| Ok(Some(Worker::new("host-a").with_id(Some(2)))));
        platform.expect_update_worker()
            .times(1)
            .returning(|_| Ok(true));
        platform.expect_claim_next_waiting_task()
            .returning(|| Ok(None));

        let router = router();
        let mut session = session(platform);
        let register = Message::with_data(names::WORKERS_REGISTER, &json!({"name": "host-a"}))?;
        router.serve(&mut session, &register).await?;
        session.take_responses();
        router.serve(&mut session, &Message::new(names::TASKS_NEXT)).await?;
        assert_eq!(session.take_responses(), vec![Message::new(names::TASKS)]);
        assert_eq!(session.worker().map(|worker| worker.state), Some(WorkerState::Idle));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_job_unknown_command() -> anyhow::Result<()> {
        let mut session = session(MockPlatform::new());
        let job = Job::new("job")
            .with_task(Task::new(SerializedCommand::new("RenderCommand", json!({}))?));
        router().serve(&mut session, &Message::with_data(names::JOBS_CREATE, &job)?).await?;
        assert_eq!(session.take_responses()[0].message, names::FAILURE);
        Ok(())
    }

    #[tokio::test]
    async fn test_all_tasks_malformed_id() -> anyhow::Result<()> {
        let mut session = session(MockPlatform::new());
        let message = Message::with_data(names::TASKS_ALL, "not-a-uuid")?;
        router().serve(&mut session, &message).await?;
        assert_eq!(session.take_responses()[0].message, names::FAILURE);
        Ok(())
    }

    #[tokio::test]
    async fn test_docs_and_close() -> anyhow::Result<()> {
        let router = router();
        let mut session = session(MockPlatform::new());
        router.serve(&mut session, &Message::new(names::CONNECTION_DOCS)).await?;
        let responses = session.take_responses();
        let routes: Vec<String> = responses[0].data_as()?
            .expect("docs carry data");
        assert_eq!(routes, router.routes());
        assert!(routes.contains(&names::TASKS_NEXT.to_string()));

        router.serve(&mut session, &Message::new(names::CONNECTION_CLOSE)).await?;
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.take_responses().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cleanup_requeues() -> anyhow::Result<()> {
        let job = Job::new("job").with_state(JobState::Progress);
        let task = sleep_task()
            .with_job_id(Some(job.id))
            .with_state(TaskState::Progress);
        let task_id = task.id;

        let mut platform = MockPlatform::new();
        platform.expect_update_worker()
            .times(1)
            .withf(|worker| worker.state == WorkerState::Offline && worker.task_id.is_none())
            .returning(|_| Ok(true));
        platform.expect_update_task()
            .times(1)
            .withf(move |task| task.id == task_id && task.state == TaskState::Waiting)
            .returning(|_| Ok(true));
        let stored = job.clone();
        platform.expect_select_job()
            .returning(move |_| Ok(Some(stored.clone())));
        platform.expect_count_tasks_in_state()
            .returning(|_, _| Ok(0));
        platform.expect_update_job()
            .times(1)
            .withf(|job| job.state == JobState::Waiting)
            .returning(|_| Ok(true));

        let mut session = session(platform);
        session.worker = Some(Worker::new("host-a")
            .with_id(Some(1))
            .with_state(WorkerState::Working)
            .with_task_id(Some(task_id)));
        session.task = Some(task);
        session.job = Some(job);
        session.cleanup().await;
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.worker().is_none());
        assert!(session.task().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_cleanup_is_best_effort() -> anyhow::Result<()> {
        let task = sleep_task().with_state(TaskState::Progress);
        let mut platform = MockPlatform::new();
        platform.expect_update_worker()
            .times(1)
            .returning(|_| Err(rbcore::error::BackendError::Unknown));
        // the task is still put back despite the worker update failing
        platform.expect_update_task()
            .times(1)
            .withf(|task| task.state == TaskState::Waiting)
            .returning(|_| Ok(true));

        let mut session = session(platform);
        session.worker = Some(Worker::new("host-a").with_id(Some(1)));
        session.task = Some(task);
        session.cleanup().await;
        Ok(())
    }
}
