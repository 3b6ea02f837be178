use rbcore::{
    command::CommandRegistry,
    error::CommandError,
    task::Task,
    worker::Worker,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{
    client::Client,
    config::WorkerConfig,
    error::ClientError,
};

/// Runs tasks handed out by the server: take one, run it, report it
/// complete, repeat.
pub struct WorkerRunner {
    config: WorkerConfig,
    registry: Arc<dyn CommandRegistry>,
}

impl WorkerRunner {
    pub fn new(
        config: WorkerConfig,
        registry: Arc<dyn CommandRegistry>,
    ) -> Self {
        Self { config, registry }
    }

    pub async fn connect(&self) -> Result<(Client, Worker), ClientError> {
        let mut client = Client::connect(&self.config.addr).await?;
        let worker = client.register(&Worker::new(&self.config.name)).await?;
        log::info!("registered as {worker}");
        Ok((client, worker))
    }

    /// Work until the token is cancelled, polling at the configured
    /// interval whenever the queue is empty.
    pub async fn run(&self, token: CancellationToken) -> Result<(), ClientError> {
        let (mut client, _) = self.connect().await?;
        while !token.is_cancelled() {
            if self.work_once(&mut client).await? {
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => (),
                _ = token.cancelled() => break,
            }
        }
        log::info!("worker {} stopping", self.config.name);
        client.close().await
    }

    /// Take and run at most one task; returns whether one was run.
    pub async fn work_once(&self, client: &mut Client) -> Result<bool, ClientError> {
        let Some(task) = client.next_task().await? else {
            log::trace!("no tasks available");
            return Ok(false);
        };
        log::info!("running {task}");
        // a failed command is not retried; it is reported complete
        if let Err(e) = self.execute(&task).await {
            log::error!("{task} failed: {e}");
        }
        client.complete_task().await?;
        log::debug!("completed {task}");
        Ok(true)
    }

    /// Run the task's command on its own tokio task so that a command
    /// that panics surfaces as an execution error.
    pub async fn execute(&self, task: &Task) -> Result<(), CommandError> {
        let command = self.registry.deserialize(&task.command)?;
        let name = command.name().to_string();
        tokio::spawn(async move { command.run().await })
            .await
            .map_err(|e| CommandError::Execution(name, e.to_string()))?
    }
}
