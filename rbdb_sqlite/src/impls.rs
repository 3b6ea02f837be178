use async_trait::async_trait;
use rbcore::{
    error::{
        BackendError,
        ValueError,
    },
    platform::{
        ConnectorOption,
        PlatformConnector,
        PlatformUrl,
    },
};
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{
        SqliteConnectOptions,
        SqliteJournalMode,
        SqlitePoolOptions,
    },
    Sqlite,
};
use std::{
    str::FromStr,
    sync::Arc,
    time::Duration,
};
use uuid::Uuid;

use crate::SqliteBackend;

// concurrent claims queue up on the write lock for this long before
// reporting the database as busy
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

impl PlatformUrl for SqliteBackend {
    fn url(&self) -> &str {
        self.url.as_ref()
    }
}

impl SqliteBackend {
    pub async fn connect(opts: ConnectorOption) -> Result<SqliteBackend, sqlx::Error> {
        if opts.auto_create_db && !Sqlite::database_exists(&opts.url).await.unwrap_or(false) {
            log::warn!("sqlite database {} does not exist; creating...", &opts.url);
            Sqlite::create_database(&opts.url).await?
        }

        let options = SqliteConnectOptions::from_str(&opts.url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await?;
        log::debug!("connected to {}", &opts.url);
        Ok(SqliteBackend {
            pool: Arc::new(pool),
            url: opts.url,
        })
    }

    pub async fn migrate(self) -> Result<Self, sqlx::Error> {
        sqlx::migrate!("./migrations").run(&*self.pool).await?;
        Ok(self)
    }
}

#[async_trait]
impl PlatformConnector for SqliteBackend {
    type Platform = SqliteBackend;

    async fn connect_queue(opts: ConnectorOption) -> Result<SqliteBackend, BackendError> {
        Ok(SqliteBackend::connect(opts).await?
            .migrate()
            .await?)
    }
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, ValueError> {
    Uuid::parse_str(value)
        .map_err(|_| ValueError::InvalidUuid(value.to_string()))
}

pub(crate) fn parse_optional_uuid(value: Option<String>) -> Result<Option<Uuid>, ValueError> {
    value.as_deref()
        .map(parse_uuid)
        .transpose()
}

mod job;
mod task;
mod worker;

mod default_impl {
    use rbcore::platform::DefaultQueuePlatform;
    use crate::SqliteBackend;

    impl DefaultQueuePlatform for SqliteBackend {}
}
