use sqlx::SqlitePool;
use std::sync::Arc;

/// The SQLite store for jobs, tasks and workers.
pub struct SqliteBackend {
    pub(crate) pool: Arc<SqlitePool>,
    pub(crate) url: String,
}

mod impls;
