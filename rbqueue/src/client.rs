use futures::{
    SinkExt,
    StreamExt,
};
use rbcore::{
    job::Job,
    task::Task,
    worker::Worker,
};
use serde::de::DeserializeOwned;
use tokio::net::{
    TcpStream,
    ToSocketAddrs,
};
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::{
    error::ClientError,
    protocol::{
        Message,
        MessageCodec,
        names,
    },
};

mod worker;
pub use worker::WorkerRunner;

/// A connection to the server, issuing one request at a time.
pub struct Client {
    framed: Framed<TcpStream, MessageCodec>,
}

impl Client {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            framed: Framed::new(stream, MessageCodec::new()),
        })
    }

    pub async fn send(&mut self, message: Message) -> Result<(), ClientError> {
        Ok(self.framed.send(message).await?)
    }

    pub async fn receive(&mut self) -> Result<Message, ClientError> {
        match self.framed.next().await {
            Some(message) => Ok(message?),
            None => Err(ClientError::Closed),
        }
    }

    /// Send the message and wait for the one response it produces.
    pub async fn request(&mut self, message: Message) -> Result<Message, ClientError> {
        self.send(message).await?;
        self.receive().await
    }

    async fn expect_reply<T: DeserializeOwned>(
        &mut self,
        message: Message,
        response: &'static str,
    ) -> Result<Option<T>, ClientError> {
        let reply = self.request(message).await?;
        if reply.message == response {
            return Ok(reply.data_as()?);
        }
        if reply.message == names::FAILURE {
            let reason = reply.data_as::<String>()?
                .unwrap_or_default();
            return Err(ClientError::Failure(reason));
        }
        Err(ClientError::UnexpectedResponse(response, reply.message))
    }

    async fn expect_data<T: DeserializeOwned>(
        &mut self,
        message: Message,
        response: &'static str,
    ) -> Result<T, ClientError> {
        self.expect_reply(message, response).await?
            .ok_or(ClientError::UnexpectedResponse(response, "empty response".to_string()))
    }

    pub async fn register(&mut self, worker: &Worker) -> Result<Worker, ClientError> {
        let message = Message::with_data(names::WORKERS_REGISTER, worker)?;
        self.expect_data(message, names::SUCCESS).await
    }

    /// Ask for the next task; `None` when nothing is waiting.
    pub async fn next_task(&mut self) -> Result<Option<Task>, ClientError> {
        self.expect_reply(Message::new(names::TASKS_NEXT), names::TASKS).await
    }

    pub async fn complete_task(&mut self) -> Result<(), ClientError> {
        self.expect_reply::<serde_json::Value>(Message::new(names::TASKS_COMPLETE), names::OK).await?;
        Ok(())
    }

    pub async fn create_job(&mut self, job: &Job) -> Result<Job, ClientError> {
        let message = Message::with_data(names::JOBS_CREATE, job)?;
        self.expect_data(message, names::JOB_CREATED).await
    }

    pub async fn create_task(&mut self, task: &Task) -> Result<Task, ClientError> {
        let message = Message::with_data(names::TASKS_CREATE, task)?;
        self.expect_data(message, names::TASK_CREATED).await
    }

    pub async fn all_jobs(&mut self) -> Result<Vec<Job>, ClientError> {
        self.expect_data(Message::new(names::JOBS_ALL), names::ALL_JOBS).await
    }

    pub async fn all_tasks(&mut self, job_id: Uuid) -> Result<Vec<Task>, ClientError> {
        let message = Message::with_data(names::TASKS_ALL, &job_id)?;
        self.expect_data(message, names::ALL_TASKS).await
    }

    pub async fn all_workers(&mut self) -> Result<Vec<Worker>, ClientError> {
        self.expect_data(Message::new(names::WORKERS_ALL), names::ALL_WORKERS).await
    }

    pub async fn docs(&mut self) -> Result<Vec<String>, ClientError> {
        self.expect_data(Message::new(names::CONNECTION_DOCS), names::DOCS).await
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.send(Message::new(names::CONNECTION_CLOSE)).await?;
        // the server drops the connection in response
        while let Some(message) = self.framed.next().await {
            log::debug!("ignoring {} while closing", message?);
        }
        Ok(())
    }
}
