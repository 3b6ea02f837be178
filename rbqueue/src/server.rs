use std::{
    io,
    net::SocketAddr,
    sync::Arc,
};
use tokio::{
    net::TcpListener,
    time,
};
use tokio_util::{
    sync::CancellationToken,
    task::TaskTracker,
};

use crate::{
    config::ServerConfig,
    manager::JobManager,
    protocol::MessageCodec,
    router::MessageRouter,
    session::{
        self,
        Session,
    },
};

/// Accepts connections and serves each on its own task until shut down.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    manager: Arc<JobManager>,
    router: Arc<MessageRouter<Session>>,
    routes: Arc<Vec<String>>,
    tracker: TaskTracker,
    token: CancellationToken,
}

impl Server {
    pub async fn bind(
        config: ServerConfig,
        manager: Arc<JobManager>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.addr).await?;
        let router = session::router();
        let routes = Arc::new(router.routes());
        log::info!("listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            config,
            manager,
            router: Arc::new(router),
            routes,
            tracker: TaskTracker::new(),
            token: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Cancelling this token stops the accept loop and interrupts every
    /// open session.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub async fn run(self) {
        while !self.token.is_cancelled() {
            let (stream, peer) = match time::timeout(
                self.config.accept_timeout,
                self.listener.accept(),
            ).await {
                Err(_) => continue,
                Ok(Err(e)) => {
                    log::error!("failed to accept connection: {e}");
                    continue;
                }
                Ok(Ok(accepted)) => accepted,
            };
            log::debug!("accepted connection from {peer}");
            let session = Session::new(
                peer.to_string(),
                self.manager.clone(),
                self.routes.clone(),
            );
            let codec = MessageCodec::with_max_frame_length(self.config.max_frame_length);
            let router = self.router.clone();
            let token = self.token.clone();
            self.tracker.spawn(async move {
                session.run(stream, codec, &router, token).await
            });
        }

        log::info!("shutting down; waiting on {} session(s)", self.tracker.len());
        self.tracker.close();
        if time::timeout(self.config.shutdown_grace, self.tracker.wait()).await.is_err() {
            log::warn!("sessions did not finish within the grace period");
        }
        log::info!("server stopped");
    }
}
