use futures::{
    SinkExt,
    StreamExt,
};
use rbcore::{
    job::Job,
    task::{
        Task,
        TaskState,
    },
    worker::{
        Worker,
        WorkerState,
    },
};
use std::{
    fmt,
    sync::Arc,
};
use tokio::io::{
    AsyncRead,
    AsyncWrite,
};
use tokio_util::{
    codec::Framed,
    sync::CancellationToken,
};

use crate::{
    error::SessionError,
    manager::JobManager,
    protocol::{
        Message,
        MessageCodec,
    },
    router::{
        MessageRouter,
        Responder,
    },
};

mod routes;
pub use routes::router;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Registered,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connected => "connected",
            Self::Registered => "registered",
            Self::Closed => "closed",
        })
    }
}

/// The server side of one connection.
///
/// The worker, task and job held here are copies of what this session
/// has acted on, kept only so that they can be put right should the
/// connection go away; the backend remains the authority.
pub struct Session {
    peer: String,
    state: SessionState,
    manager: Arc<JobManager>,
    routes: Arc<Vec<String>>,
    worker: Option<Worker>,
    task: Option<Task>,
    job: Option<Job>,
    outbox: Vec<Message>,
}

impl Responder for Session {
    fn respond(&mut self, message: Message) {
        self.outbox.push(message);
    }
}

impl Session {
    pub fn new(
        peer: impl Into<String>,
        manager: Arc<JobManager>,
        routes: Arc<Vec<String>>,
    ) -> Self {
        Self {
            peer: peer.into(),
            state: SessionState::Connected,
            manager,
            routes,
            worker: None,
            task: None,
            job: None,
            outbox: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn worker(&self) -> Option<&Worker> {
        self.worker.as_ref()
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    /// Take the responses queued by the handlers so far.
    pub fn take_responses(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    /// Serve the connection until the peer goes away, asks to close, an
    /// error occurs, or the token is cancelled; cleanup always follows.
    pub async fn run<T>(
        mut self,
        stream: T,
        codec: MessageCodec,
        router: &MessageRouter<Session>,
        token: CancellationToken,
    )
    where
        T: AsyncRead + AsyncWrite + Unpin + Send,
    {
        log::info!("session {} connected", self.peer);
        let mut framed = Framed::new(stream, codec);
        if let Err(e) = self.serve(&mut framed, router, &token).await {
            log::warn!("session {} ended with error: {e}", self.peer);
        }
        self.cleanup().await;
        log::info!("session {} closed", self.peer);
    }

    // Cancellation is only observed while waiting on the next frame, so a
    // handler always runs to completion and what it claimed is recorded.
    async fn serve<T>(
        &mut self,
        framed: &mut Framed<T, MessageCodec>,
        router: &MessageRouter<Session>,
        token: &CancellationToken,
    ) -> Result<(), SessionError>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send,
    {
        loop {
            let frame = tokio::select! {
                frame = framed.next() => frame,
                _ = token.cancelled() => {
                    log::info!("session {} interrupted by shutdown", self.peer);
                    break;
                }
            };
            let Some(frame) = frame else {
                break;
            };
            let message = frame?;
            log::trace!("session {} received {message}", self.peer);
            router.serve(self, &message).await?;
            for response in self.take_responses().into_iter() {
                framed.feed(response).await?;
            }
            framed.flush().await?;
            if self.state == SessionState::Closed {
                break;
            }
        }
        Ok(())
    }

    /// Put back whatever this session held: the worker goes offline, a
    /// task still in progress returns to the queue and its job is
    /// released.  Every step is attempted regardless of earlier failures.
    pub async fn cleanup(&mut self) {
        self.state = SessionState::Closed;
        if let Some(worker) = self.worker.take() {
            let worker = worker
                .with_state(WorkerState::Offline)
                .with_task_id(None);
            match self.manager.update_worker(&worker).await {
                Ok(_) => log::debug!("{worker} went offline"),
                Err(e) => log::error!("failed to set {worker} offline: {e}"),
            }
        }
        if let Some(task) = self.task.take() {
            if task.state == TaskState::Progress {
                let task = task.with_state(TaskState::Waiting);
                match self.manager.update_task(&task).await {
                    Ok(_) => log::info!("requeued {task}"),
                    Err(e) => log::error!("failed to requeue {task}: {e}"),
                }
            }
        }
        if let Some(job) = self.job.take() {
            if !job.is_completed() {
                if let Err(e) = self.manager.release_job(&job).await {
                    log::error!("failed to release {job}: {e}");
                }
            }
        }
    }
}
