use async_trait::async_trait;

use crate::{
    error::BackendError,
    platform::QueuePlatform,
};

#[derive(Clone, Debug, Default)]
pub struct ConnectorOption {
    pub auto_create_db: bool,
    pub url: String,
}

impl ConnectorOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_create_db(mut self, auto_create_db: bool) -> Self {
        self.auto_create_db = auto_create_db;
        self
    }

    pub fn url(mut self, url: String) -> Self {
        self.url = url;
        self
    }
}

impl<T> From<T> for ConnectorOption
where
    T: ToString
{
    fn from(v: T) -> Self {
        Self::new().url(v.to_string())
    }
}

#[async_trait]
pub trait PlatformConnector {
    type Platform: QueuePlatform + 'static;

    async fn connect_queue(opts: ConnectorOption) -> Result<Self::Platform, BackendError>;
}
