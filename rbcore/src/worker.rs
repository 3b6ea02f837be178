use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    #[default]
    Idle,
    Working,
    Offline,
}

/// A process that executes tasks, identified by its (host) name.
///
/// The `id` is assigned by the backend on first registration; a worker
/// registering again under the same name is given back the same id.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Worker {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub state: WorkerState,
    #[serde(default = "crate::timestamp")]
    pub timestamp: f64,
    #[serde(default)]
    pub task_id: Option<Uuid>,
}

mod impls;
pub mod traits;
